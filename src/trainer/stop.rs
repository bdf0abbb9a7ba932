use super::LearningProcessManager;
use crate::error::{Error, Result};

use std::time;

/// When to stop training
///
/// Every condition is evaluated after each completed iteration; training
/// stops as soon as one of them fires.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum StopCondition {
    /// Stops after the provided number of training iterations, which must be
    /// at least one
    MaxIterations(usize),
    /// Stops when the total error of an iteration drops to or below the
    /// provided threshold
    IrreducibleError(f64),
    /// Stops after the provided duration
    Duration(time::Duration),
    /// Stops once the calculated performance reaches the provided fraction
    TargetPerformance(f64),
}

impl From<time::Duration> for StopCondition {
    fn from(duration: time::Duration) -> StopCondition {
        StopCondition::Duration(duration)
    }
}

impl StopCondition {
    /// Rejects conditions that cannot be honored, such as stopping before
    /// the first iteration.
    pub fn validate(&self) -> Result<()> {
        match *self {
            StopCondition::MaxIterations(0) => Err(Error::Config(
                "MaxIterations must allow at least one iteration".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Returns true if training is complete.
    pub fn should_stop_learning(&self, manager: &LearningProcessManager<'_>) -> bool {
        self.check(manager).is_some()
    }

    /// Returns a message explaining why training should stop, or `None` to
    /// keep going.
    pub fn check(&self, manager: &LearningProcessManager<'_>) -> Option<String> {
        use self::StopCondition::*;
        match *self {
            MaxIterations(iterations) => {
                if manager.iteration() >= iterations {
                    Some(format!("reached {} iterations", iterations))
                } else {
                    None
                }
            }
            IrreducibleError(threshold) => match manager.last_iteration_error() {
                Some(error) if error <= threshold => Some(format!(
                    "total error {} reached the threshold {}",
                    error, threshold
                )),
                _ => None,
            },
            Duration(duration) => {
                let elapsed = manager.elapsed();
                if elapsed >= duration {
                    Some(format!(
                        "ran for {:.3} seconds, limit is {:.3}",
                        elapsed.as_secs_f64(),
                        duration.as_secs_f64()
                    ))
                } else {
                    None
                }
            }
            TargetPerformance(target) => match manager.performance() {
                Some(performance) if performance >= target => Some(format!(
                    "performance {} reached the target {}",
                    performance, target
                )),
                _ => None,
            },
        }
    }
}
