/// A one-dimensional histogram with uniform bins over `[minimum, maximum)`.
///
/// The upper limit is adjusted down to a whole number of bins.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram1D {
    minimum: f64,
    maximum: f64,
    bin_width: f64,
    bins: Vec<f64>,
    n_binned: u64,
    n_missed: u64,
}

impl Histogram1D {
    /// Creates an empty histogram. Returns `None` if the range or bin width is invalid.
    pub fn new(minimum: f64, maximum: f64, bin_width: f64) -> Option<Self> {
        if !(bin_width > 0.0) || !(maximum > minimum) {
            return None;
        }
        let n_bins = (((maximum - minimum) / bin_width).floor() as usize).max(1);
        Some(Self {
            minimum,
            maximum: minimum + n_bins as f64 * bin_width,
            bin_width,
            bins: vec![0.0; n_bins],
            n_binned: 0,
            n_missed: 0,
        })
    }

    pub fn minimum(&self) -> f64 {
        self.minimum
    }

    pub fn maximum(&self) -> f64 {
        self.maximum
    }

    pub fn bin_width(&self) -> f64 {
        self.bin_width
    }

    pub fn n_bins(&self) -> usize {
        self.bins.len()
    }

    /// Adds a value to the histogram. Returns whether it fell inside the range.
    pub fn bin(&mut self, value: f64) -> bool {
        if !(value >= self.minimum && value < self.maximum) {
            self.n_missed += 1;
            return false;
        }
        let index = (((value - self.minimum) / self.bin_width) as usize).min(self.bins.len() - 1);
        self.bins[index] += 1.0;
        self.n_binned += 1;
        true
    }

    pub fn bin_centres(&self) -> Vec<f64> {
        (0..self.bins.len())
            .map(|i| self.minimum + (i as f64 + 0.5) * self.bin_width)
            .collect()
    }

    pub fn values(&self) -> &[f64] {
        &self.bins
    }

    pub fn n_binned(&self) -> u64 {
        self.n_binned
    }

    pub fn n_missed(&self) -> u64 {
        self.n_missed
    }
}

/// Processed one-dimensional data: abscissae and their values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Data1D {
    x: Vec<f64>,
    values: Vec<f64>,
}

impl Data1D {
    pub fn from_histogram(histogram: &Histogram1D) -> Self {
        Self {
            x: histogram.bin_centres(),
            values: histogram.values().to_vec(),
        }
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn divide(&mut self, divisor: f64) {
        for value in &mut self.values {
            *value /= divisor;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn histogram_rejects_invalid_ranges() {
        assert!(Histogram1D::new(0.0, 10.0, 0.0).is_none());
        assert!(Histogram1D::new(5.0, 1.0, 0.5).is_none());
    }

    #[test]
    fn histogram_bins_values_and_counts_misses() {
        let mut histogram = Histogram1D::new(0.0, 1.05, 0.25).unwrap();
        assert_eq!(histogram.n_bins(), 4);
        assert_eq!(histogram.maximum(), 1.0);

        assert!(histogram.bin(0.1));
        assert!(histogram.bin(0.3));
        assert!(histogram.bin(0.35));
        assert!(!histogram.bin(1.0));
        assert!(!histogram.bin(-0.1));

        assert_eq!(histogram.values(), &[1.0, 2.0, 0.0, 0.0]);
        assert_eq!(histogram.n_binned(), 3);
        assert_eq!(histogram.n_missed(), 2);
        assert_eq!(histogram.bin_centres(), vec![0.125, 0.375, 0.625, 0.875]);
    }

    #[test]
    fn data_divides_values_in_place() {
        let mut histogram = Histogram1D::new(0.0, 2.0, 1.0).unwrap();
        histogram.bin(0.5);
        histogram.bin(0.6);
        let mut data = Data1D::from_histogram(&histogram);
        data.divide(4.0);
        assert_eq!(data.values(), &[0.5, 0.0]);
        assert_eq!(data.x(), &[0.5, 1.5]);
    }
}
