//! Triangulation of planar polygons with holes.

use nalgebra::Vector3;
use stepglb_step::{Point3, Rgb};

use crate::TriangleMesh;

type Point2 = (f64, f64);

/// Unnormalized polygon normal by Newell's method.
///
/// Its length is twice the polygon area; its direction is the side from
/// which the loop winds counter-clockwise.
pub fn newell_normal(points: &[Point3]) -> Vector3<f64> {
    let mut n = Vector3::zeros();
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        n.x += (p.y - q.y) * (p.z + q.z);
        n.y += (p.z - q.z) * (p.x + q.x);
        n.z += (p.x - q.x) * (p.y + q.y);
    }
    n
}

/// Area of a planar polygon in 3D.
pub fn polygon_area(points: &[Point3]) -> f64 {
    0.5 * newell_normal(points).norm()
}

/// Triangulate a planar face given its outer loop and hole loops.
///
/// Loop windings are normalized internally (outer counter-clockwise, holes
/// clockwise about the outer loop's normal), so callers only need the outer
/// loop to face the intended way. Returns `None` for a degenerate outer loop.
pub fn triangulate_polygon_with_holes(
    outer: &[Point3],
    holes: &[Vec<Point3>],
    color: Rgb,
) -> Option<TriangleMesh> {
    if outer.len() < 3 {
        return None;
    }
    let normal = newell_normal(outer);
    if normal.norm() < 1e-12 {
        return None;
    }
    let normal = normal.normalize();

    // Plane basis with u × v = normal, so counter-clockwise stays positive.
    let helper = if normal.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    let u = (helper - helper.dot(&normal) * normal).normalize();
    let v = normal.cross(&u);
    let origin = outer[0];
    let project = |p: &Point3| {
        let d = *p - origin;
        (d.dot(&u), d.dot(&v))
    };

    let mut verts_3d: Vec<Point3> = outer.to_vec();
    let mut verts_2d: Vec<Point2> = outer.iter().map(&project).collect();
    if signed_area(&verts_2d) < 0.0 {
        verts_3d.reverse();
        verts_2d.reverse();
    }
    let outer_len = verts_2d.len();

    // (start, len) of each usable hole within the vertex arrays.
    let mut hole_ranges = Vec::new();
    for hole in holes.iter().filter(|h| h.len() >= 3) {
        let mut hole_2d: Vec<Point2> = hole.iter().map(&project).collect();
        let area = signed_area(&hole_2d);
        if area.abs() < 1e-12 {
            continue;
        }
        let start = verts_3d.len();
        if area > 0.0 {
            hole_2d.reverse();
            verts_3d.extend(hole.iter().rev());
        } else {
            verts_3d.extend_from_slice(hole);
        }
        verts_2d.extend(hole_2d);
        hole_ranges.push((start, hole.len()));
    }

    let poly = bridge_holes(&verts_2d, outer_len, &hole_ranges);

    let mut mesh = TriangleMesh::new();
    for p in &verts_3d {
        mesh.vertices.extend([p.x as f32, p.y as f32, p.z as f32]);
        mesh.normals
            .extend([normal.x as f32, normal.y as f32, normal.z as f32]);
        mesh.colors.extend(color);
    }
    ear_clip_triangulate(&verts_2d, &poly, &mut mesh.indices);
    Some(mesh)
}

/// Shoelace signed area; positive for counter-clockwise loops.
fn signed_area(points: &[Point2]) -> f64 {
    let mut sum = 0.0;
    for (i, a) in points.iter().enumerate() {
        let b = points[(i + 1) % points.len()];
        sum += a.0 * b.1 - b.0 * a.1;
    }
    0.5 * sum
}

/// Splice every hole into the outer loop through a bridge edge, yielding a
/// single weakly-simple polygon as indices into `verts`.
fn bridge_holes(verts: &[Point2], outer_len: usize, holes: &[(usize, usize)]) -> Vec<usize> {
    let mut poly: Vec<usize> = (0..outer_len).collect();

    // Rightmost holes first keeps later bridges from crossing earlier ones.
    let mut order: Vec<usize> = (0..holes.len()).collect();
    let max_x = |&(start, len): &(usize, usize)| {
        verts[start..start + len]
            .iter()
            .map(|p| p.0)
            .fold(f64::NEG_INFINITY, f64::max)
    };
    order.sort_by(|&a, &b| max_x(&holes[b]).total_cmp(&max_x(&holes[a])));

    for (merged, &hole_idx) in order.iter().enumerate() {
        let (start, len) = holes[hole_idx];

        let mut candidates: Vec<(f64, usize, usize)> = Vec::with_capacity(len * poly.len());
        for i in 0..len {
            let h = verts[start + i];
            for (j, &pi) in poly.iter().enumerate() {
                let p = verts[pi];
                candidates.push(((p.0 - h.0).powi(2) + (p.1 - h.1).powi(2), i, j));
            }
        }
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

        // Holes not yet merged still block bridges.
        let pending: Vec<(usize, usize)> = order[merged + 1..].iter().map(|&k| holes[k]).collect();
        let visible = |hole_i: usize, poly_j: usize| {
            let a = verts[start + hole_i];
            let b = verts[poly[poly_j]];
            let ring_edges = (0..poly.len()).map(|k| (poly[k], poly[(k + 1) % poly.len()]));
            let hole_edges = std::iter::once((start, len))
                .chain(pending.iter().copied())
                .flat_map(|(s, l)| (0..l).map(move |k| (s + k, s + (k + 1) % l)));
            !ring_edges
                .chain(hole_edges)
                .any(|(c, d)| segments_cross(a, b, verts[c], verts[d]))
        };

        let Some(&(_, hole_i, poly_j)) = candidates
            .iter()
            .find(|(_, i, j)| visible(*i, *j))
            .or_else(|| candidates.first())
        else {
            continue;
        };

        let bridge_outer = poly[poly_j];
        let hole_indices = (0..len).map(|k| start + (hole_i + k) % len);

        let mut spliced = Vec::with_capacity(poly.len() + len + 2);
        spliced.extend_from_slice(&poly[..=poly_j]);
        spliced.extend(hole_indices);
        spliced.push(start + hole_i);
        spliced.push(bridge_outer);
        spliced.extend_from_slice(&poly[poly_j + 1..]);
        poly = spliced;
    }

    poly
}

/// Proper intersection of segments `ab` and `cd`; touching endpoints and
/// collinear overlaps do not count.
fn segments_cross(a: Point2, b: Point2, c: Point2, d: Point2) -> bool {
    let d1 = orient(a, b, c);
    let d2 = orient(a, b, d);
    let d3 = orient(c, d, a);
    let d4 = orient(c, d, b);
    d1 * d2 < 0.0 && d3 * d4 < 0.0
}

/// Ear-clipping triangulation of a counter-clockwise polygon given as
/// indices into `verts_2d`. Falls back to a fan when no ear can be found.
///
/// Bridged holes repeat vertex indices, so a vertex sharing an index with
/// the candidate ear never blocks it.
fn ear_clip_triangulate(verts_2d: &[Point2], indices: &[usize], out_indices: &mut Vec<u32>) {
    if indices.len() < 3 {
        return;
    }

    let mut remaining: Vec<usize> = indices.to_vec();

    while remaining.len() > 3 {
        let n = remaining.len();
        let corner = |k: usize| {
            (
                verts_2d[remaining[(k + n - 1) % n]],
                verts_2d[remaining[k]],
                verts_2d[remaining[(k + 1) % n]],
            )
        };
        let reflex: Vec<bool> = (0..n)
            .map(|k| {
                let (a, b, c) = corner(k);
                orient(a, b, c) <= 0.0
            })
            .collect();

        let ear = (0..n).find(|&i| {
            if reflex[i] {
                return false;
            }
            let ear_ids = [remaining[(i + n - 1) % n], remaining[i], remaining[(i + 1) % n]];
            let (a, b, c) = corner(i);
            !(0..n).any(|j| {
                reflex[j]
                    && !ear_ids.contains(&remaining[j])
                    && point_in_triangle_2d(verts_2d[remaining[j]], a, b, c)
            })
        });

        let Some(i) = ear else {
            tracing::trace!(remaining = n, "no ear found, fanning remainder");
            for k in 1..n - 1 {
                out_indices.extend([remaining[0] as u32, remaining[k] as u32, remaining[k + 1] as u32]);
            }
            return;
        };

        out_indices.extend([
            remaining[(i + n - 1) % n] as u32,
            remaining[i] as u32,
            remaining[(i + 1) % n] as u32,
        ]);
        remaining.remove(i);
    }

    out_indices.extend(remaining.iter().map(|&i| i as u32));
}

/// Twice the signed area of triangle `pqr`; positive when counter-clockwise.
fn orient(p: Point2, q: Point2, r: Point2) -> f64 {
    (q.0 - p.0) * (r.1 - p.1) - (q.1 - p.1) * (r.0 - p.0)
}

/// Whether `p` lies inside or on the boundary of the counter-clockwise
/// triangle `abc`.
fn point_in_triangle_2d(p: Point2, a: Point2, b: Point2, c: Point2) -> bool {
    orient(a, b, p) >= 0.0 && orient(b, c, p) >= 0.0 && orient(c, a, p) >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(min: f64, max: f64) -> Vec<Point3> {
        vec![
            Point3::new(min, min, 0.0),
            Point3::new(max, min, 0.0),
            Point3::new(max, max, 0.0),
            Point3::new(min, max, 0.0),
        ]
    }

    fn mesh_area(mesh: &TriangleMesh) -> f64 {
        let v = |i: u32| {
            let i = i as usize * 3;
            Vector3::new(
                mesh.vertices[i] as f64,
                mesh.vertices[i + 1] as f64,
                mesh.vertices[i + 2] as f64,
            )
        };
        mesh.indices
            .chunks(3)
            .map(|t| 0.5 * (v(t[1]) - v(t[0])).cross(&(v(t[2]) - v(t[0]))).norm())
            .sum()
    }

    /// Every triangle winds the same way as the face normal.
    fn all_front_facing(mesh: &TriangleMesh) -> bool {
        let v = |i: u32| {
            let i = i as usize * 3;
            Vector3::new(
                mesh.vertices[i] as f64,
                mesh.vertices[i + 1] as f64,
                mesh.vertices[i + 2] as f64,
            )
        };
        let n = Vector3::new(
            mesh.normals[0] as f64,
            mesh.normals[1] as f64,
            mesh.normals[2] as f64,
        );
        mesh.indices
            .chunks(3)
            .all(|t| (v(t[1]) - v(t[0])).cross(&(v(t[2]) - v(t[0]))).dot(&n) >= -1e-9)
    }

    #[test]
    fn test_newell_normal_and_area() {
        let sq = square(0.0, 2.0);
        let n = newell_normal(&sq);
        assert!((n.normalize() - Vector3::z()).norm() < 1e-12);
        assert!((polygon_area(&sq) - 4.0).abs() < 1e-12);

        let mut rev = sq.clone();
        rev.reverse();
        assert!(newell_normal(&rev).z < 0.0);
    }

    #[test]
    fn test_square_two_triangles() {
        let mesh = triangulate_polygon_with_holes(&square(0.0, 1.0), &[], [1.0, 0.0, 0.0]).unwrap();
        assert_eq!(mesh.num_triangles(), 2);
        assert!((mesh_area(&mesh) - 1.0).abs() < 1e-6);
        assert!(all_front_facing(&mesh));
        assert_eq!(&mesh.colors[..3], &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_concave_l_shape() {
        let l = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(1.0, 2.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        ];
        let mesh = triangulate_polygon_with_holes(&l, &[], [0.5; 3]).unwrap();
        assert_eq!(mesh.num_triangles(), 4);
        assert!((mesh_area(&mesh) - 3.0).abs() < 1e-6);
        assert!(all_front_facing(&mesh));
    }

    #[test]
    fn test_square_with_square_hole() {
        // Hole given with the same winding as the outer loop; it is flipped.
        let mesh = triangulate_polygon_with_holes(&square(0.0, 10.0), &[square(4.0, 6.0)], [0.5; 3])
            .unwrap();
        assert_eq!(mesh.num_triangles(), 8);
        assert!((mesh_area(&mesh) - 96.0).abs() < 1e-6);
        assert!(all_front_facing(&mesh));
    }

    #[test]
    fn test_concave_face_with_hole() {
        let l = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(4.0, 0.0, 0.0),
            Point3::new(4.0, 2.0, 0.0),
            Point3::new(2.0, 2.0, 0.0),
            Point3::new(2.0, 4.0, 0.0),
            Point3::new(0.0, 4.0, 0.0),
        ];
        let mesh = triangulate_polygon_with_holes(&l, &[square(0.5, 1.5)], [0.5; 3]).unwrap();
        assert_eq!(mesh.num_triangles(), 10);
        assert!((mesh_area(&mesh) - 11.0).abs() < 1e-6);
        assert!(all_front_facing(&mesh));
    }

    #[test]
    fn test_reflex_vertex_on_ear_edge_blocks_it() {
        assert!(point_in_triangle_2d((1.0, 1.0), (0.0, 2.0), (0.0, 0.0), (2.0, 0.0)));
        assert!(!point_in_triangle_2d((1.0, 1.5), (0.0, 2.0), (0.0, 0.0), (2.0, 0.0)));
    }

    #[test]
    fn test_two_holes() {
        let holes = vec![square(1.0, 3.0), square(6.0, 8.0)];
        let mesh = triangulate_polygon_with_holes(&square(0.0, 10.0), &holes, [0.5; 3]).unwrap();
        assert!((mesh_area(&mesh) - 92.0).abs() < 1e-6);
        assert!(all_front_facing(&mesh));
    }

    #[test]
    fn test_tilted_plane_keeps_normal() {
        let tilted: Vec<Point3> = square(0.0, 1.0)
            .into_iter()
            .map(|p| Point3::new(p.x, p.y, p.y))
            .collect();
        let mesh = triangulate_polygon_with_holes(&tilted, &[], [0.5; 3]).unwrap();
        let expected = Vector3::new(0.0, -1.0, 1.0).normalize();
        let n = Vector3::new(mesh.normals[0] as f64, mesh.normals[1] as f64, mesh.normals[2] as f64);
        assert!((n - expected).norm() < 1e-6);
        assert!((mesh_area(&mesh) - 2f64.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_degenerate_outer_rejected() {
        let line = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        assert!(triangulate_polygon_with_holes(&line, &[], [0.5; 3]).is_none());
    }
}
