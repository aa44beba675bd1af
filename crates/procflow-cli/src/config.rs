use crate::error::{CliError, Result};
use nalgebra::Point3;
use procflow::core::configuration::{Configuration, Site};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

fn default_temperature() -> f64 {
    300.0
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
struct FileSite {
    name: String,
    molecule: usize,
    origin: [f64; 3],
}

/// The system a procedure runs against, as described in a TOML file.
///
/// ```toml
/// box-length = 20.0
/// temperature = 298.15
///
/// [[site]]
/// name = "COM"
/// molecule = 0
/// origin = [0.0, 0.0, 0.0]
/// ```
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct SystemConfig {
    box_length: f64,
    #[serde(default = "default_temperature")]
    temperature: f64,
    #[serde(default, rename = "site")]
    sites: Vec<FileSite>,
}

impl SystemConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading system description from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Builds the configuration, grouping sites into stacks by name in file order.
    pub fn into_configuration(self) -> Result<Configuration> {
        if !(self.box_length > 0.0) {
            return Err(CliError::Config(format!(
                "'box-length' must be positive, but {} was given",
                self.box_length
            )));
        }

        let mut configuration = Configuration::new(self.box_length);
        configuration.temperature = self.temperature;
        for site in self.sites {
            let [x, y, z] = site.origin;
            configuration.add_site(&site.name, Site::new(Point3::new(x, y, z), site.molecule));
        }
        Ok(configuration)
    }
}
