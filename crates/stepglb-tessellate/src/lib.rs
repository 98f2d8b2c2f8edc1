#![warn(missing_docs)]

//! Planar face tessellation for the stepglb conversion engine.
//!
//! Converts the face polygons produced by `stepglb-step` into one indexed
//! triangle mesh by:
//! 1. Computing each face's plane from its outer loop (Newell's method)
//! 2. Projecting outer and hole loops into that plane
//! 3. Bridging holes into the outer loop and ear-clipping the result
//! 4. Emitting flat per-vertex normals and colours
//!
//! [`normalize`] then fits the mesh into a fixed-size box for viewers.

mod bounds;
mod polygon;

pub use bounds::{bounding_box, normalize, BoundingBox};
pub use polygon::{newell_normal, polygon_area, triangulate_polygon_with_holes};

use stepglb_step::{Rgb, StepModel};

/// Output triangle mesh for rendering and export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleMesh {
    /// Flat array of vertex positions: `[x0, y0, z0, x1, y1, z1, ...]` (f32).
    pub vertices: Vec<f32>,
    /// Flat array of triangle indices: `[i0, i1, i2, ...]` (u32).
    pub indices: Vec<u32>,
    /// Flat array of vertex normals, same length as `vertices`.
    pub normals: Vec<f32>,
    /// Flat array of linear RGB vertex colours, same length as `vertices`.
    pub colors: Vec<f32>,
}

impl TriangleMesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.indices.len() / 3
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Whether the mesh has no triangles.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Merge another mesh into this one.
    pub fn merge(&mut self, other: &TriangleMesh) {
        let offset = self.num_vertices() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.normals.extend_from_slice(&other.normals);
        self.colors.extend_from_slice(&other.colors);
        self.indices.extend(other.indices.iter().map(|&i| i + offset));
    }
}

/// Counters describing one tessellation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TessellationStats {
    /// Bodies visited.
    pub bodies: usize,
    /// Faces that produced triangles.
    pub faces: usize,
    /// Faces skipped by the reader or found degenerate here.
    pub skipped_faces: usize,
    /// Triangles emitted.
    pub triangles: usize,
}

/// Tessellate every planar face of `model` into a single mesh.
///
/// Faces without a styled colour get `default_color`.
pub fn tessellate_model(model: &StepModel, default_color: Rgb) -> (TriangleMesh, TessellationStats) {
    let mut mesh = TriangleMesh::new();
    let mut stats = TessellationStats::default();

    for body in &model.bodies {
        stats.bodies += 1;
        stats.skipped_faces += body.skipped_faces;
        for face in &body.faces {
            let color = body.face_color(face).unwrap_or(default_color);
            match triangulate_polygon_with_holes(&face.outer, &face.holes, color) {
                Some(face_mesh) if !face_mesh.is_empty() => {
                    stats.faces += 1;
                    mesh.merge(&face_mesh);
                }
                _ => {
                    tracing::trace!(face = face.id, "degenerate face produced no triangles");
                    stats.skipped_faces += 1;
                }
            }
        }
    }

    stats.triangles = mesh.num_triangles();
    tracing::debug!(
        bodies = stats.bodies,
        faces = stats.faces,
        skipped = stats.skipped_faces,
        triangles = stats.triangles,
        "tessellated model"
    );
    (mesh, stats)
}
