//! Error types for the simulator

use thiserror::Error;

/// Errors raised by simulator control (never by the simulated SDK calls)
#[derive(Debug, Error)]
pub enum SimError {
    /// Generator interval must be non-zero
    #[error("generator interval must be greater than zero")]
    ZeroInterval,

    /// The generator thread could not be started
    #[error("failed to spawn generator thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// The generator thread panicked
    #[error("generator thread panicked")]
    GeneratorPanicked,
}
