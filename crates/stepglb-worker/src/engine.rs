//! The seam between the worker and a conversion engine.

use async_trait::async_trait;
use thiserror::Error;

/// Type-erased engine error carried by a fault event.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A synchronous STEP → GLB converter.
///
/// The worker calls [`init_log`](Self::init_log) exactly once, before the
/// first [`convert`](Self::convert), and never calls `convert` concurrently.
/// Implementations need not be `Send`: they are created on, and never leave,
/// the worker thread.
pub trait ConversionEngine {
    /// Error returned for a rejected payload.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Enable engine diagnostics.
    fn init_log(&self);

    /// Convert one STEP document into one GLB scene.
    fn convert(&self, step: &[u8]) -> Result<Vec<u8>, Self::Error>;
}

/// Provisions a [`ConversionEngine`].
///
/// `instantiate` runs on the worker thread inside a current-thread runtime,
/// so its future does not need to be `Send`.
#[async_trait(?Send)]
pub trait EngineLoader {
    /// The engine this loader yields.
    type Engine: ConversionEngine;

    /// Load and instantiate the engine module.
    async fn instantiate(&self) -> Result<Self::Engine, StartupFault>;
}

/// Why an engine module could not be brought up. Fatal to the worker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartupFault {
    /// The module could not be located or read.
    #[error("engine module unreachable: {0}")]
    Unreachable(String),

    /// The module was read but could not be decoded.
    #[error("engine module malformed: {0}")]
    Malformed(String),

    /// The module decoded but cannot be used by this worker.
    #[error("engine module incompatible: {0}")]
    Incompatible(String),

    /// The worker's own runtime could not be created.
    #[error("worker runtime unavailable: {0}")]
    Runtime(String),
}
