use nalgebra::{Point3, Vector3};
use std::collections::HashMap;

/// A single site within a configuration: an origin and the molecule it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    /// The site origin in Angstroms.
    pub origin: Point3<f64>,
    /// Index of the parent molecule.
    pub molecule: usize,
}

impl Site {
    pub fn new(origin: Point3<f64>, molecule: usize) -> Self {
        Self { origin, molecule }
    }
}

/// The mutable system a procedure runs against.
///
/// Sites are grouped into named stacks, mirroring how species sites are evaluated over a
/// configuration. The simulation box is cubic and periodic.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    box_length: f64,
    /// Temperature of the configuration in Kelvin.
    pub temperature: f64,
    site_stacks: HashMap<String, Vec<Site>>,
}

impl Configuration {
    pub fn new(box_length: f64) -> Self {
        Self {
            box_length,
            temperature: 300.0,
            site_stacks: HashMap::new(),
        }
    }

    pub fn box_length(&self) -> f64 {
        self.box_length
    }

    pub fn add_site(&mut self, stack: &str, site: Site) {
        self.site_stacks
            .entry(stack.to_string())
            .or_default()
            .push(site);
    }

    pub fn site_stack(&self, name: &str) -> Option<&[Site]> {
        self.site_stacks.get(name).map(Vec::as_slice)
    }

    pub fn site_stack_names(&self) -> impl Iterator<Item = &str> {
        self.site_stacks.keys().map(String::as_str)
    }

    /// Returns the minimum-image vector from `a` to `b`.
    pub fn minimum_image(&self, a: &Point3<f64>, b: &Point3<f64>) -> Vector3<f64> {
        let mut delta = b - a;
        if self.box_length > 0.0 {
            delta = delta.map(|d| d - self.box_length * (d / self.box_length).round());
        }
        delta
    }

    pub fn minimum_distance(&self, a: &Point3<f64>, b: &Point3<f64>) -> f64 {
        self.minimum_image(a, b).norm()
    }
}
