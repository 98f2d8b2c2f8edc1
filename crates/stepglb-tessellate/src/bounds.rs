//! Bounding boxes and viewer normalization.

use crate::TriangleMesh;

/// Axis-aligned bounds of a mesh's vertex positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Component-wise minimum.
    pub min: [f32; 3],
    /// Component-wise maximum.
    pub max: [f32; 3],
}

impl BoundingBox {
    /// Box centre.
    pub fn center(&self) -> [f32; 3] {
        std::array::from_fn(|i| 0.5 * (self.min[i] + self.max[i]))
    }

    /// Size along each axis.
    pub fn extents(&self) -> [f32; 3] {
        std::array::from_fn(|i| self.max[i] - self.min[i])
    }

    /// Largest of the three extents.
    pub fn max_extent(&self) -> f32 {
        self.extents().into_iter().fold(0.0, f32::max)
    }
}

/// Bounds over all vertices, or `None` for a mesh without vertices.
pub fn bounding_box(mesh: &TriangleMesh) -> Option<BoundingBox> {
    let mut points = mesh.vertices.chunks_exact(3);
    let first = points.next()?;
    let mut bb = BoundingBox {
        min: [first[0], first[1], first[2]],
        max: [first[0], first[1], first[2]],
    };
    for p in points {
        for axis in 0..3 {
            bb.min[axis] = bb.min[axis].min(p[axis]);
            bb.max[axis] = bb.max[axis].max(p[axis]);
        }
    }
    Some(bb)
}

/// Scale the mesh uniformly so its largest extent equals `target_extent`,
/// optionally moving the bounding-box centre to the origin first.
///
/// Returns the applied scale factor. A mesh whose extent is zero (a single
/// point) is only translated. Normals are unaffected by uniform scaling.
pub fn normalize(mesh: &mut TriangleMesh, target_extent: f32, center: bool) -> f32 {
    let Some(bb) = bounding_box(mesh) else {
        return 1.0;
    };
    let extent = bb.max_extent();
    let scale = if extent > f32::EPSILON {
        target_extent / extent
    } else {
        1.0
    };
    let offset = if center { bb.center() } else { [0.0; 3] };

    for p in mesh.vertices.chunks_exact_mut(3) {
        for axis in 0..3 {
            p[axis] = (p[axis] - offset[axis]) * scale;
        }
    }
    scale
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mesh(points: &[[f32; 3]]) -> TriangleMesh {
        TriangleMesh {
            vertices: points.iter().flatten().copied().collect(),
            indices: vec![0, 1, 2],
            normals: vec![0.0; points.len() * 3],
            colors: vec![0.0; points.len() * 3],
        }
    }

    #[test]
    fn test_bounding_box_all_axes() {
        let m = mesh(&[[1.0, -2.0, 3.0], [4.0, 5.0, -6.0], [0.0, 0.0, 0.0]]);
        let bb = bounding_box(&m).unwrap();
        assert_eq!(bb.min, [0.0, -2.0, -6.0]);
        assert_eq!(bb.max, [4.0, 5.0, 3.0]);
        assert_eq!(bb.max_extent(), 9.0);
    }

    #[test]
    fn test_normalize_centers_and_scales() {
        let mut m = mesh(&[[10.0, 10.0, 10.0], [20.0, 10.0, 10.0], [10.0, 15.0, 12.0]]);
        let scale = normalize(&mut m, 200.0, true);
        assert!((scale - 20.0).abs() < 1e-6);

        let bb = bounding_box(&m).unwrap();
        assert!((bb.max_extent() - 200.0).abs() < 1e-3);
        for c in bb.center() {
            assert!(c.abs() < 1e-3);
        }
    }

    #[test]
    fn test_normalize_without_centering() {
        let mut m = mesh(&[[1.0, 0.0, 0.0], [2.0, 0.0, 0.0], [1.0, 1.0, 0.0]]);
        normalize(&mut m, 2.0, false);
        assert_eq!(&m.vertices[..3], &[2.0, 0.0, 0.0]);
    }

    #[test]
    fn test_degenerate_extent_not_scaled() {
        let mut m = mesh(&[[3.0, 3.0, 3.0], [3.0, 3.0, 3.0], [3.0, 3.0, 3.0]]);
        assert_eq!(normalize(&mut m, 200.0, true), 1.0);
        assert!(m.vertices.iter().all(|v| v.abs() < 1e-6));
        assert!(m.vertices.iter().all(|v| v.is_finite()));
    }
}
