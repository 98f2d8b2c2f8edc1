#![warn(missing_docs)]

//! Background worker bridging a host to a STEP → GLB conversion engine.
//!
//! A worker owns one engine on a dedicated thread. Startup has two phases:
//! the [`ModuleLoader`] instantiates the engine module and enables its
//! diagnostics, then the [`RequestDispatcher`] is activated and serves the
//! inbox. Requests posted during startup queue and are served in order once
//! the engine is ready. Every request yields exactly one [`WorkerEvent`].
//!
//! # Example
//!
//! ```no_run
//! use stepglb_worker::{WorkerConfig, WorkerHandle, EngineLoader};
//!
//! async fn convert<L: EngineLoader + Send + 'static>(
//!     loader: L,
//!     step: Vec<u8>,
//! ) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
//!     let mut worker = WorkerHandle::spawn(loader, &WorkerConfig::default())?;
//!     worker.ready().await?;
//!     worker.post(step).await?;
//!     let event = worker.next_event().await.ok_or("worker exited")?;
//!     let glb = event.into_result()?.into_bytes();
//!     worker.shutdown().await?;
//!     Ok(glb)
//! }
//! ```

pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod handle;
pub mod loader;
pub mod message;

pub use config::{ConfigError, ModuleSource, WorkerConfig, MODULE_ENV};
pub use dispatcher::{Active, DispatchStats, Inactive, RequestDispatcher};
pub use engine::{BoxError, ConversionEngine, EngineLoader, StartupFault};
pub use error::{Result, WorkerError};
pub use handle::{WorkerHandle, WorkerState};
pub use loader::{ModuleLoader, ReadyEngine};
pub use message::{ConversionFault, ConversionRequest, ConversionResult, WorkerEvent};
