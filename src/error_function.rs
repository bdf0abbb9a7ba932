//! Per-pattern loss measures and their running total.

/// How a vector of output errors is reduced to a single value.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ErrorMeasure {
    /// Mean of the squared errors.
    MeanSquared,
    /// Half of the sum of the squared errors.
    HalfSumSquared,
    /// Square root of the mean squared error.
    RootMeanSquared,
    /// Mean of the absolute errors.
    MeanAbsolute,
}

impl Default for ErrorMeasure {
    fn default() -> Self {
        ErrorMeasure::MeanSquared
    }
}

impl ErrorMeasure {
    /// Reduces `errors` (target minus output) to a single value.
    pub fn error(&self, errors: &[f64]) -> f64 {
        if errors.is_empty() {
            return 0.0;
        }
        let n = errors.len() as f64;
        let squared = || errors.iter().map(|e| e * e).sum::<f64>();
        match *self {
            ErrorMeasure::MeanSquared => squared() / n,
            ErrorMeasure::HalfSumSquared => squared() / 2.0,
            ErrorMeasure::RootMeanSquared => (squared() / n).sqrt(),
            ErrorMeasure::MeanAbsolute => errors.iter().map(|e| e.abs()).sum::<f64>() / n,
        }
    }
}

/// An error measure together with the total accumulated over the current
/// measurement window.
#[derive(Clone, Debug, PartialEq)]
pub struct ErrorFunction {
    measure: ErrorMeasure,
    total: f64,
    count: usize,
}

impl ErrorFunction {
    pub fn new(measure: ErrorMeasure) -> Self {
        ErrorFunction {
            measure,
            total: 0.0,
            count: 0,
        }
    }

    pub fn measure(&self) -> ErrorMeasure {
        self.measure
    }

    /// Returns the error for one pattern without accumulating it.
    pub fn error(&self, errors: &[f64]) -> f64 {
        self.measure.error(errors)
    }

    pub fn add_error(&mut self, error: f64) {
        self.total += error;
        self.count += 1;
    }

    /// Returns the sum of every error added since the last reset.
    pub fn total_error(&self) -> f64 {
        self.total
    }

    /// Returns the average error added since the last reset.
    pub fn mean_error(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn reset(&mut self) {
        self.total = 0.0;
        self.count = 0;
    }
}

impl Default for ErrorFunction {
    fn default() -> Self {
        ErrorFunction::new(ErrorMeasure::default())
    }
}
