//! Error types for the worker host API.

use thiserror::Error;

use crate::config::ConfigError;
use crate::engine::StartupFault;

/// Errors surfaced to the host.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The worker thread could not be started.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The engine module could not be brought up. The worker is gone.
    #[error("worker startup failed: {0}")]
    Startup(#[from] StartupFault),

    /// The worker no longer accepts messages.
    #[error("worker is closed")]
    Closed,

    /// The worker thread panicked, usually inside the engine.
    #[error("worker thread panicked: {0}")]
    Panicked(String),

    /// Worker configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for worker operations.
pub type Result<T> = std::result::Result<T, WorkerError>;
