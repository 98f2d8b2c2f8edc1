//! Flattened output of the reader: bodies made of planar face polygons.

use crate::Point3;

/// Linear RGB colour with channels in `0.0..=1.0`.
pub type Rgb = [f32; 3];

/// One planar face, ready for triangulation.
///
/// The outer loop winds counter-clockwise when seen from the side the face
/// normal points to. Hole loops wind the opposite way. Loops are open: the
/// first point is not repeated at the end.
#[derive(Debug, Clone, PartialEq)]
pub struct FacePolygon {
    /// Entity ID of the face.
    pub id: u64,
    /// Outer boundary.
    pub outer: Vec<Point3>,
    /// Inner boundaries.
    pub holes: Vec<Vec<Point3>>,
    /// Colour styled on the face itself, if any.
    pub color: Option<Rgb>,
}

/// A solid or surface model.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    /// Entity ID of the solid / surface model.
    pub id: u64,
    /// Name argument of the entity, possibly empty.
    pub name: String,
    /// Faces that could be flattened.
    pub faces: Vec<FacePolygon>,
    /// Faces on curved surfaces or with degenerate loops.
    pub skipped_faces: usize,
    /// Colour styled on the body or one of its shells.
    pub color: Option<Rgb>,
}

impl Body {
    /// Colour for `face`: its own style, else the body's.
    pub fn face_color(&self, face: &FacePolygon) -> Option<Rgb> {
        face.color.or(self.color)
    }
}

/// Everything read from one STEP document, bodies in ascending entity ID order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepModel {
    /// Bodies found in the file.
    pub bodies: Vec<Body>,
}

impl StepModel {
    /// Total number of readable faces.
    pub fn face_count(&self) -> usize {
        self.bodies.iter().map(|b| b.faces.len()).sum()
    }

    /// Total number of skipped faces.
    pub fn skipped_face_count(&self) -> usize {
        self.bodies.iter().map(|b| b.skipped_faces).sum()
    }
}
