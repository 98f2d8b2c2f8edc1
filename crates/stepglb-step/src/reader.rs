//! STEP file reader: flattens B-rep bodies into planar face polygons.

use std::collections::HashMap;
use std::path::Path;

use crate::entities::{
    collect_colours, parse_axis_placement, parse_cartesian_point, parse_curve, parse_edge_curve,
    parse_face, parse_loop, parse_oriented_edge, parse_shell, parse_solid, parse_vertex_point,
    ColourMap, EntityArgs, StepCurve, StepFace, StepFaceBound, StepLoop, SOLID_TYPES,
};
use crate::error::StepError;
use crate::model::{Body, FacePolygon, StepModel};
use crate::parser::{Parser, StepFile};
use crate::{Point3, Vec3};

/// Points closer than this are merged when building loops.
const MERGE_TOLERANCE: f64 = 1e-9;

/// Options controlling how curved edges are approximated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Polyline segments used for a full turn of a circle or ellipse.
    pub circle_segments: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            circle_segments: 32,
        }
    }
}

/// Read STEP file from a path.
pub fn read_step(path: impl AsRef<Path>, options: &ReadOptions) -> Result<StepModel, StepError> {
    let data = std::fs::read(path)?;
    read_step_from_buffer(&data, options)
}

/// Read STEP file from a byte buffer.
///
/// Returns [`StepError::NoSolids`] when the file holds no solid or surface
/// model.
pub fn read_step_from_buffer(data: &[u8], options: &ReadOptions) -> Result<StepModel, StepError> {
    let step_file = Parser::parse(data)?;
    tracing::debug!(
        entities = step_file.entities.len(),
        schemas = ?step_file.schemas(),
        "parsed STEP file"
    );
    StepReader::new(&step_file, options).read_model()
}

/// Context for flattening one parsed file.
struct StepReader<'a> {
    file: &'a StepFile,
    options: &'a ReadOptions,
    colours: ColourMap,
    /// Maps VERTEX_POINT ID to its position.
    vertex_map: HashMap<u64, Point3>,
}

impl<'a> StepReader<'a> {
    fn new(file: &'a StepFile, options: &'a ReadOptions) -> Self {
        Self {
            file,
            options,
            colours: collect_colours(file),
            vertex_map: HashMap::new(),
        }
    }

    fn read_model(&mut self) -> Result<StepModel, StepError> {
        let mut solid_ids: Vec<u64> = SOLID_TYPES
            .iter()
            .flat_map(|t| self.file.entities_of_type(t).map(|e| e.id))
            .collect();
        if solid_ids.is_empty() {
            return Err(StepError::NoSolids);
        }
        solid_ids.sort_unstable();

        let bodies = solid_ids
            .into_iter()
            .map(|id| self.read_body(id))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(StepModel { bodies })
    }

    fn read_body(&mut self, solid_id: u64) -> Result<Body, StepError> {
        let solid = parse_solid(self.file, solid_id)?;
        let color = std::iter::once(solid_id)
            .chain(solid.shell_ids.iter().copied())
            .find_map(|id| self.colours.get(&id).copied());

        let mut body = Body {
            id: solid_id,
            name: solid.name,
            faces: Vec::new(),
            skipped_faces: 0,
            color,
        };

        let mut open_shells = 0usize;
        for shell_id in solid.shell_ids {
            let shell = parse_shell(self.file, shell_id)?;
            if !shell.is_closed {
                open_shells += 1;
            }
            for face_id in shell.face_ids {
                let face = parse_face(self.file, face_id)?;
                match self.read_face(&face)? {
                    Some(polygon) => body.faces.push(polygon),
                    None => body.skipped_faces += 1,
                }
            }
        }

        tracing::debug!(
            solid = solid_id,
            kind = %solid.kind,
            faces = body.faces.len(),
            skipped = body.skipped_faces,
            open_shells,
            "read body"
        );
        Ok(body)
    }

    /// Flatten one face, or `None` when it cannot be represented as a
    /// planar polygon.
    fn read_face(&mut self, face: &StepFace) -> Result<Option<FacePolygon>, StepError> {
        let face_normal = match face.surface_id {
            Some(surface_id) => {
                let surface = self.file.require(surface_id)?;
                if surface.type_name != "PLANE" {
                    tracing::trace!(face = face.id, surface = %surface.type_name, "skipping non-planar face");
                    return Ok(None);
                }
                // PLANE(name, position)
                let plane_normal = parse_axis_placement(self.file, surface.entity_ref(1)?)?
                    .z_axis()
                    .into_inner();
                Some(if face.same_sense { plane_normal } else { -plane_normal })
            }
            None => None,
        };

        let mut loops: Vec<(bool, Vec<Point3>)> = Vec::with_capacity(face.bounds.len());
        for bound in &face.bounds {
            let points = self.read_bound(bound)?;
            if points.len() >= 3 {
                loops.push((bound.is_outer, points));
            }
        }

        // Without an explicit outer bound the largest loop encloses the rest.
        let outer_index = loops
            .iter()
            .position(|(is_outer, _)| *is_outer)
            .or_else(|| {
                loops
                    .iter()
                    .enumerate()
                    .max_by(|(_, a), (_, b)| loop_area(&a.1).total_cmp(&loop_area(&b.1)))
                    .map(|(i, _)| i)
            });
        let Some(outer_index) = outer_index else {
            tracing::trace!(face = face.id, "skipping face without a usable loop");
            return Ok(None);
        };

        let (_, mut outer) = loops.swap_remove(outer_index);
        let mut holes: Vec<Vec<Point3>> = loops.into_iter().map(|(_, points)| points).collect();

        // The loops must wind counter-clockwise about the face normal.
        if face_normal.is_some_and(|n| loop_normal(&outer).dot(&n) < 0.0) {
            tracing::trace!(face = face.id, "loops disagree with face sense, reversing");
            outer.reverse();
            for hole in &mut holes {
                hole.reverse();
            }
        }

        Ok(Some(FacePolygon {
            id: face.id,
            outer,
            holes,
            color: self.colours.get(&face.id).copied(),
        }))
    }

    fn read_bound(&mut self, bound: &StepFaceBound) -> Result<Vec<Point3>, StepError> {
        let mut points = match parse_loop(self.file, bound.loop_id)? {
            StepLoop::Edges(oriented_edges) => self.edge_loop_points(&oriented_edges)?,
            StepLoop::Poly(point_ids) => point_ids
                .iter()
                .map(|&id| parse_cartesian_point(self.file, id))
                .collect::<Result<Vec<_>, _>>()?,
            StepLoop::Vertex => Vec::new(),
        };
        if !bound.orientation {
            points.reverse();
        }
        dedup_loop(&mut points);
        Ok(points)
    }

    fn edge_loop_points(&mut self, oriented_edges: &[u64]) -> Result<Vec<Point3>, StepError> {
        let mut points = Vec::new();
        for &oe_id in oriented_edges {
            let oe = parse_oriented_edge(self.file, oe_id)?;
            let edge = parse_edge_curve(self.file, oe.edge_id)?;
            let start = self.vertex(edge.start_vertex_id)?;
            let end = self.vertex(edge.end_vertex_id)?;

            // Path in the edge's own start → end direction.
            let mut path = vec![start];
            match parse_curve(self.file, edge.curve_id)? {
                StepCurve::Line => {}
                StepCurve::Conic(conic) => path.extend(conic.sample_arc(
                    &start,
                    &end,
                    edge.same_sense,
                    self.options.circle_segments,
                )),
                StepCurve::Other(kind) => {
                    tracing::trace!(edge = oe.edge_id, curve = %kind, "approximating edge by its chord");
                }
            }
            path.push(end);

            if !oe.orientation {
                path.reverse();
            }
            // The last point is the next edge's first.
            path.pop();
            points.extend(path);
        }
        Ok(points)
    }

    fn vertex(&mut self, id: u64) -> Result<Point3, StepError> {
        if let Some(p) = self.vertex_map.get(&id) {
            return Ok(*p);
        }
        let p = parse_vertex_point(self.file, id)?;
        self.vertex_map.insert(id, p);
        Ok(p)
    }
}

/// Remove consecutive duplicates and a closing point equal to the first.
fn dedup_loop(points: &mut Vec<Point3>) {
    points.dedup_by(|b, a| (*b - *a).norm() < MERGE_TOLERANCE);
    while points.len() > 1 {
        let (first, last) = (points[0], points[points.len() - 1]);
        if (last - first).norm() < MERGE_TOLERANCE {
            points.pop();
        } else {
            break;
        }
    }
}

/// Newell normal of a loop; its length is twice the enclosed area.
fn loop_normal(points: &[Point3]) -> Vec3 {
    let mut n = Vec3::zeros();
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        n += p.coords.cross(&q.coords);
    }
    n
}

fn loop_area(points: &[Point3]) -> f64 {
    0.5 * loop_normal(points).norm()
}
