//! Error types shared by every part of the training engine.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while building or training a network.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum Error {
    /// Invalid topology: zero widths, mismatched layer widths, or layers
    /// added in the wrong order.
    #[error("construction error: {0}")]
    Construction(String),
    /// An operation was called while the network was in the wrong state,
    /// e.g. a backward pass without a forward pass, or a checkpoint of the
    /// wrong length.
    #[error("state error: {0}")]
    State(String),
    /// A pattern does not fit the network it is fed to.
    #[error("data error: {0}")]
    Data(String),
    /// A neuron task failed while running on the worker pool.
    #[error("runtime failure: {0}")]
    Runtime(String),
    /// A configuration value is out of range or could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}
