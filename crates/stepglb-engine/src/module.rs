//! Engine module manifests and the loader that instantiates them.
//!
//! A manifest is a small TOML file describing how the engine should be
//! configured:
//!
//! ```toml
//! format_version = 1
//!
//! [settings]
//! target_extent = 200.0
//! circle_segments = 48
//! default_color = [0.7, 0.7, 0.75]
//! center = true
//! log_filter = "stepglb=debug"
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stepglb_step::Rgb;
use stepglb_worker::{EngineLoader, ModuleSource, StartupFault};

use crate::engine::StepToGlb;

/// Manifest format this engine understands.
pub const SUPPORTED_FORMAT_VERSION: u32 = 1;

const MAX_CIRCLE_SEGMENTS: usize = 4096;

/// Tunables for a [`StepToGlb`] engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineSettings {
    /// Size of the largest bounding-box extent after normalization.
    pub target_extent: f32,
    /// Segments per full turn when sampling circular and elliptical edges.
    pub circle_segments: usize,
    /// Colour for faces without a STEP style.
    pub default_color: Rgb,
    /// Move the bounding-box centre to the origin.
    pub center: bool,
    /// Log filter used when `RUST_LOG` is unset.
    pub log_filter: Option<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            target_extent: 200.0,
            circle_segments: 32,
            default_color: [0.8, 0.8, 0.8],
            center: true,
            log_filter: None,
        }
    }
}

impl EngineSettings {
    /// Reject settings the engine cannot honour.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.target_extent.is_finite() && self.target_extent > 0.0) {
            return Err(format!(
                "target_extent must be a positive number, got {}",
                self.target_extent
            ));
        }
        if !(3..=MAX_CIRCLE_SEGMENTS).contains(&self.circle_segments) {
            return Err(format!(
                "circle_segments must be between 3 and {MAX_CIRCLE_SEGMENTS}, got {}",
                self.circle_segments
            ));
        }
        if self
            .default_color
            .iter()
            .any(|c| !(0.0..=1.0).contains(c))
        {
            return Err(format!(
                "default_color components must be in [0, 1], got {:?}",
                self.default_color
            ));
        }
        Ok(())
    }
}

/// On-disk description of an engine module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineManifest {
    /// Manifest format version. Must equal [`SUPPORTED_FORMAT_VERSION`].
    pub format_version: u32,
    /// Engine tunables.
    #[serde(default)]
    pub settings: EngineSettings,
}

impl EngineManifest {
    /// Decode a manifest. Syntax and schema errors are [`StartupFault::Malformed`].
    pub fn from_toml_str(text: &str) -> Result<Self, StartupFault> {
        toml::from_str(text).map_err(|err| StartupFault::Malformed(err.to_string()))
    }

    /// Check the version and settings. Failures are [`StartupFault::Incompatible`].
    pub fn into_settings(self) -> Result<EngineSettings, StartupFault> {
        if self.format_version != SUPPORTED_FORMAT_VERSION {
            return Err(StartupFault::Incompatible(format!(
                "manifest format_version {} is not supported (expected {SUPPORTED_FORMAT_VERSION})",
                self.format_version
            )));
        }
        self.settings
            .validate()
            .map_err(StartupFault::Incompatible)?;
        Ok(self.settings)
    }
}

/// Instantiates a [`StepToGlb`] engine from a [`ModuleSource`].
#[derive(Debug, Clone, Default)]
pub struct StepToGlbLoader {
    source: ModuleSource,
}

impl StepToGlbLoader {
    /// Load the engine described by `source`.
    pub fn new(source: ModuleSource) -> Self {
        Self { source }
    }

    /// The built-in engine with default settings.
    pub fn builtin() -> Self {
        Self::new(ModuleSource::Builtin)
    }

    /// The engine described by a manifest file.
    pub fn manifest(path: impl Into<PathBuf>) -> Self {
        Self::new(ModuleSource::Manifest(path.into()))
    }

    /// Where this loader reads its module from.
    pub fn source(&self) -> &ModuleSource {
        &self.source
    }
}

async fn read_manifest(path: &Path) -> Result<EngineSettings, StartupFault> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|err| StartupFault::Unreachable(format!("{}: {err}", path.display())))?;
    EngineManifest::from_toml_str(&text)?.into_settings()
}

#[async_trait(?Send)]
impl EngineLoader for StepToGlbLoader {
    type Engine = StepToGlb;

    async fn instantiate(&self) -> Result<StepToGlb, StartupFault> {
        let settings = match &self.source {
            ModuleSource::Builtin => EngineSettings::default(),
            ModuleSource::Manifest(path) => {
                tracing::debug!(path = %path.display(), "reading engine manifest");
                read_manifest(path).await?
            }
        };
        Ok(StepToGlb::new(settings))
    }
}
