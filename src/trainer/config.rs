use super::stop::StopCondition;
use crate::error::{Error, Result};
use crate::error_function::ErrorMeasure;

use std::fs;
use std::path::Path;
use std::time::Instant;

/// Logging frequency to use during training
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Logging {
    /// No logs will be emitted
    Silent,
    /// A summary will be logged at completion
    Completion,
    /// A summary will be logged after every `n` training iterations
    Iterations(usize),
}

impl Default for Logging {
    fn default() -> Self {
        Logging::Completion
    }
}

impl Logging {
    /// Performs logging at the current `iteration` of training.
    pub(crate) fn iteration(&self, iteration: usize, training_error: f64) {
        if let Logging::Iterations(freq) = *self {
            if freq > 0 && iteration % freq == 0 {
                info!("Iteration {}:\terror={}", iteration, training_error);
            }
        }
    }

    /// Performs logging at the end of training.
    pub(crate) fn completion(&self, iterations: usize, training_error: f64, start_time: Instant) {
        if let Logging::Silent = *self {
            return;
        }
        info!(
            "Ran {} iterations in {:.3} seconds.",
            iterations,
            start_time.elapsed().as_secs_f64()
        );
        info!("Final error: {}", training_error);
    }
}

/// Everything that can be tuned about a training run.
///
/// The defaults are:
///
/// * A learning rate of 0.1 without decay.
/// * No momentum.
/// * Weight updates enabled.
/// * Mean squared error.
/// * Performance calculated after every iteration.
/// * rayon's default worker pool size.
/// * Logs on training completion.
/// * Stops after 1000 training iterations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Gradient descent step size, in `(0, 1]`.
    pub learning_rate: f64,
    /// Factor applied to the learning rate after every iteration, in `(0, 1]`.
    pub learning_rate_decay: f64,
    /// Fraction of the previous weight change added to the next, in `[0, 1)`.
    pub momentum: f64,
    pub update_weights: bool,
    pub error_measure: ErrorMeasure,
    /// Run the check patterns every `n` iterations. Zero disables it.
    pub performance_interval: usize,
    /// Worker threads for neuron tasks. Zero picks one per CPU.
    pub threads: usize,
    pub logging: Logging,
    pub stop_conditions: Vec<StopCondition>,
}

impl Default for LearningConfig {
    fn default() -> Self {
        LearningConfig {
            learning_rate: 0.1,
            learning_rate_decay: 1.0,
            momentum: 0.0,
            update_weights: true,
            error_measure: ErrorMeasure::MeanSquared,
            performance_interval: 1,
            threads: 0,
            logging: Logging::Completion,
            stop_conditions: vec![StopCondition::MaxIterations(1000)],
        }
    }
}

impl LearningConfig {
    /// Parses a configuration from TOML, filling missing keys with defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: LearningConfig =
            toml::from_str(s).map_err(|e| Error::Config(format!("cannot parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        LearningConfig::from_toml_str(&contents)
    }

    /// Verifies that every value is in range.
    pub fn validate(&self) -> Result<()> {
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(Error::Config(format!(
                "learning rate must be in (0, 1], got {}",
                self.learning_rate
            )));
        }
        if !(self.learning_rate_decay > 0.0 && self.learning_rate_decay <= 1.0) {
            return Err(Error::Config(format!(
                "learning rate decay must be in (0, 1], got {}",
                self.learning_rate_decay
            )));
        }
        if !(0.0..1.0).contains(&self.momentum) {
            return Err(Error::Config(format!(
                "momentum must be in [0, 1), got {}",
                self.momentum
            )));
        }
        for condition in &self.stop_conditions {
            condition.validate()?;
        }
        Ok(())
    }
}
