#![warn(missing_docs)]

//! STEP → GLB conversion engine.
//!
//! [`StepToGlb`] reads a STEP document, triangulates its planar faces,
//! fits the result into a fixed-size box and encodes it as a binary glTF
//! scene with per-vertex colours and flat normals. [`StepToGlbLoader`]
//! provisions the engine for a `stepglb-worker` from a built-in default or
//! a TOML manifest.
//!
//! # Example
//!
//! ```no_run
//! use stepglb_engine::StepToGlbLoader;
//! use stepglb_worker::{WorkerConfig, WorkerHandle};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut worker = WorkerHandle::spawn(StepToGlbLoader::builtin(), &WorkerConfig::default())?;
//! worker.ready().await?;
//! worker.post(std::fs::read("part.step")?).await?;
//! if let Some(event) = worker.next_event().await {
//!     std::fs::write("part.glb", event.into_result()?.as_bytes())?;
//! }
//! worker.shutdown().await?;
//! # Ok(())
//! # }
//! ```

mod engine;
mod glb;
pub mod logging;
mod module;

pub use engine::{ConversionError, StepToGlb};
pub use glb::encode_glb;
pub use logging::init_logging;
pub use module::{EngineManifest, EngineSettings, StepToGlbLoader, SUPPORTED_FORMAT_VERSION};
