//! The STEP → GLB conversion pipeline.

use std::time::Instant;

use stepglb_step::{read_step_from_buffer, ReadOptions, StepError};
use stepglb_tessellate::{normalize, tessellate_model, TriangleMesh};
use stepglb_worker::ConversionEngine;
use thiserror::Error;

use crate::glb::encode_glb;
use crate::logging::init_logging;
use crate::module::EngineSettings;

/// Why a STEP document could not be converted.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// The STEP document could not be read.
    #[error(transparent)]
    Step(#[from] StepError),

    /// The model has no faces this engine can triangulate.
    #[error("model produced no triangles ({skipped_faces} faces skipped)")]
    EmptyMesh {
        /// Faces dropped because they are curved or degenerate.
        skipped_faces: usize,
    },

    /// The tessellated mesh refers to a vertex it does not contain.
    #[error("mesh index {0} out of range")]
    InvalidMesh(u32),

    /// The scene does not fit the 32-bit GLB length field.
    #[error("GLB of {0} bytes exceeds the container limit")]
    TooLarge(usize),

    /// The glTF JSON chunk could not be serialized.
    #[error("glTF JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// The GLB container could not be written.
    #[error("GLB encoding failed: {0}")]
    Gltf(#[from] gltf::Error),
}

/// Converts STEP documents to normalized, vertex-coloured GLB scenes.
///
/// Stateless between calls: the same input always yields the same bytes.
#[derive(Debug, Clone, Default)]
pub struct StepToGlb {
    settings: EngineSettings,
}

impl StepToGlb {
    /// An engine with the given settings.
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }

    /// The engine's settings.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Read and triangulate a STEP document, then fit it to the target extent.
    pub fn mesh(&self, step: &[u8]) -> Result<TriangleMesh, ConversionError> {
        let options = ReadOptions {
            circle_segments: self.settings.circle_segments,
        };
        let model = read_step_from_buffer(step, &options)?;
        let (mut mesh, stats) = tessellate_model(&model, self.settings.default_color);
        if mesh.is_empty() {
            return Err(ConversionError::EmptyMesh {
                skipped_faces: stats.skipped_faces,
            });
        }
        if stats.skipped_faces > 0 {
            tracing::warn!(
                skipped = stats.skipped_faces,
                converted = stats.faces,
                "non-planar or degenerate faces left out"
            );
        }

        let scale = normalize(&mut mesh, self.settings.target_extent, self.settings.center);
        tracing::debug!(scale, triangles = mesh.num_triangles(), "normalized mesh");
        Ok(mesh)
    }
}

impl ConversionEngine for StepToGlb {
    type Error = ConversionError;

    fn init_log(&self) {
        if init_logging(self.settings.log_filter.as_deref()) {
            tracing::debug!("engine installed log subscriber");
        }
    }

    fn convert(&self, step: &[u8]) -> Result<Vec<u8>, ConversionError> {
        let started = Instant::now();
        let mesh = self.mesh(step)?;
        let glb = encode_glb(&mesh)?;
        tracing::info!(
            step_bytes = step.len(),
            glb_bytes = glb.len(),
            triangles = mesh.num_triangles(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "converted STEP to GLB"
        );
        Ok(glb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepglb_tessellate::bounding_box;

    const BOX: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../../fixtures/box.step"));
    const PLATE: &str = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../fixtures/plate_with_hole.step"
    ));

    #[test]
    fn test_box_normalized_to_target_extent() {
        let engine = StepToGlb::default();
        let mesh = engine.mesh(BOX.as_bytes()).unwrap();
        let bb = bounding_box(&mesh).unwrap();
        assert!((bb.max_extent() - 200.0).abs() < 1e-3);
        for c in bb.center() {
            assert!(c.abs() < 1e-3);
        }
    }

    #[test]
    fn test_convert_box_to_glb() {
        let glb = StepToGlb::default().convert(BOX.as_bytes()).unwrap();
        let gltf = gltf::Gltf::from_slice(&glb).unwrap();
        let primitive = gltf.meshes().next().unwrap().primitives().next().unwrap();
        let positions = primitive.get(&gltf::mesh::Semantic::Positions).unwrap();
        // 12 triangles, one vertex per corner
        assert_eq!(positions.count(), 36);
    }

    #[test]
    fn test_styled_colour_reaches_glb() {
        let glb = StepToGlb::default().convert(BOX.as_bytes()).unwrap();
        let gltf = gltf::Gltf::from_slice(&glb).unwrap();
        let blob = gltf.blob.unwrap();
        let color: Vec<f32> = blob[12..24]
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes(b.try_into().unwrap()))
            .collect();
        assert_eq!(color, vec![0.2, 0.4, 0.6]);
    }

    #[test]
    fn test_same_input_same_bytes() {
        let engine = StepToGlb::default();
        let a = engine.convert(PLATE.as_bytes()).unwrap();
        let b = engine.convert(PLATE.as_bytes()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_custom_extent_without_centering() {
        let engine = StepToGlb::new(EngineSettings {
            target_extent: 1.0,
            center: false,
            ..EngineSettings::default()
        });
        let mesh = engine.mesh(PLATE.as_bytes()).unwrap();
        let bb = bounding_box(&mesh).unwrap();
        assert!((bb.max_extent() - 1.0).abs() < 1e-5);
        assert!(bb.min[0].abs() < 1e-5);
    }

    #[test]
    fn test_garbage_is_step_error() {
        let err = StepToGlb::default().convert(b"\x00\x01not step").unwrap_err();
        assert!(matches!(err, ConversionError::Step(_)));
    }

    #[test]
    fn test_curved_only_model_is_empty() {
        let input = BOX.replace("PLANE(", "CYLINDRICAL_SURFACE(");
        let err = StepToGlb::default().convert(input.as_bytes()).unwrap_err();
        assert!(matches!(err, ConversionError::EmptyMesh { skipped_faces: 6 }));
    }
}
