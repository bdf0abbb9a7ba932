//! Dense feed-forward neural networks trained by backpropagation, with every
//! layer's neurons computed as parallel tasks.
//!
//! - [`network`]: the layer stack, weight initialization and checkpoints
//! - [`process`]: one forward and one backward pass, fanned out per neuron
//! - [`trainer`]: iterations over a pattern source, stop conditions, events

#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;

pub mod activator;
pub mod error;
pub mod error_function;
pub mod executor;
pub mod layer;
pub mod matrix;
pub mod network;
pub mod pattern;
pub mod process;
pub mod trainer;

mod utils;

pub use crate::activator::Activator;
pub use crate::error::{Error, Result};
pub use crate::error_function::{ErrorFunction, ErrorMeasure};
pub use crate::executor::ParallelExecutor;
pub use crate::layer::{Backprop, Layer};
pub use crate::network::{Checkpoint, Network};
pub use crate::pattern::{Pattern, PatternSet, PatternSource};
pub use crate::process::TrainingProcess;
pub use crate::trainer::{
    LearningConfig, LearningControl, LearningEvent, LearningListener, LearningProcessManager,
    LearningState, Logging, Outcome, StopCondition,
};
pub use crate::utils::arg_max;
