//! Topology entities: vertex, edge, loop, face, shell, and solid.

use super::{parse_cartesian_point, EntityArgs};
use crate::error::StepError;
use crate::parser::StepFile;
use crate::Point3;

/// Parsed EDGE_CURVE entity.
#[derive(Debug, Clone)]
pub struct StepEdge {
    /// Start vertex entity ID.
    pub start_vertex_id: u64,
    /// End vertex entity ID.
    pub end_vertex_id: u64,
    /// Edge geometry (curve) entity ID.
    pub curve_id: u64,
    /// Whether the curve parameterization runs from start to end vertex.
    pub same_sense: bool,
}

/// Parsed ORIENTED_EDGE entity.
#[derive(Debug, Clone, Copy)]
pub struct StepOrientedEdge {
    /// The underlying edge entity ID.
    pub edge_id: u64,
    /// `true` walks the edge start to end, `false` end to start.
    pub orientation: bool,
}

/// A loop bounding a face.
#[derive(Debug, Clone)]
pub enum StepLoop {
    /// EDGE_LOOP: ORIENTED_EDGE ids in traversal order.
    Edges(Vec<u64>),
    /// POLY_LOOP: CARTESIAN_POINT ids in traversal order.
    Poly(Vec<u64>),
    /// VERTEX_LOOP: a degenerate single-vertex loop (apex of a cone).
    Vertex,
}

/// Parsed FACE_BOUND / FACE_OUTER_BOUND entity.
#[derive(Debug, Clone)]
pub struct StepFaceBound {
    /// The loop entity ID.
    pub loop_id: u64,
    /// `false` means the loop is traversed reversed relative to the face.
    pub orientation: bool,
    /// Whether this is an explicit outer bound.
    pub is_outer: bool,
}

/// Parsed ADVANCED_FACE / FACE_SURFACE / FACE entity.
#[derive(Debug, Clone)]
pub struct StepFace {
    /// The entity ID.
    pub id: u64,
    /// Face bounds (outer and inner loops).
    pub bounds: Vec<StepFaceBound>,
    /// Surface geometry entity ID; `None` for a bare FACE.
    pub surface_id: Option<u64>,
    /// Whether the face normal matches the surface normal.
    pub same_sense: bool,
}

/// Parsed CLOSED_SHELL / OPEN_SHELL entity.
#[derive(Debug, Clone)]
pub struct StepShell {
    /// Face entity IDs.
    pub face_ids: Vec<u64>,
    /// Whether the shell is closed.
    pub is_closed: bool,
}

/// A solid or surface-model representation item and the shells it owns.
#[derive(Debug, Clone)]
pub struct StepSolid {
    /// Entity type (e.g. `MANIFOLD_SOLID_BREP`).
    pub kind: String,
    /// Name argument, possibly empty.
    pub name: String,
    /// Shells whose faces make up the visible boundary.
    pub shell_ids: Vec<u64>,
}

/// Entity types read as bodies.
pub const SOLID_TYPES: &[&str] = &[
    "MANIFOLD_SOLID_BREP",
    "FACETED_BREP",
    "BREP_WITH_VOIDS",
    "SHELL_BASED_SURFACE_MODEL",
];

/// Parse a VERTEX_POINT entity into its position.
pub fn parse_vertex_point(file: &StepFile, id: u64) -> Result<Point3, StepError> {
    let entity = file.require_type(id, "VERTEX_POINT")?;
    parse_cartesian_point(file, entity.entity_ref(1)?)
}

/// Parse an EDGE_CURVE entity.
pub fn parse_edge_curve(file: &StepFile, id: u64) -> Result<StepEdge, StepError> {
    let entity = file.require_type(id, "EDGE_CURVE")?;
    Ok(StepEdge {
        start_vertex_id: entity.entity_ref(1)?,
        end_vertex_id: entity.entity_ref(2)?,
        curve_id: entity.entity_ref(3)?,
        same_sense: entity.logical(4)?,
    })
}

/// Parse an ORIENTED_EDGE entity.
pub fn parse_oriented_edge(file: &StepFile, id: u64) -> Result<StepOrientedEdge, StepError> {
    let entity = file.require_type(id, "ORIENTED_EDGE")?;
    // (name, *, *, edge_element, orientation); the vertices are derived.
    Ok(StepOrientedEdge {
        edge_id: entity.entity_ref(3)?,
        orientation: entity.logical(4)?,
    })
}

/// Parse an EDGE_LOOP, POLY_LOOP or VERTEX_LOOP entity.
pub fn parse_loop(file: &StepFile, id: u64) -> Result<StepLoop, StepError> {
    let entity = file.require(id)?;
    match entity.type_name.as_str() {
        "EDGE_LOOP" => Ok(StepLoop::Edges(entity.entity_ref_list(1)?)),
        "POLY_LOOP" => Ok(StepLoop::Poly(entity.entity_ref_list(1)?)),
        "VERTEX_LOOP" => Ok(StepLoop::Vertex),
        other => Err(StepError::type_mismatch("EDGE_LOOP", other)),
    }
}

/// Parse a FACE_BOUND or FACE_OUTER_BOUND entity.
pub fn parse_face_bound(file: &StepFile, id: u64) -> Result<StepFaceBound, StepError> {
    let entity = file.require(id)?;
    let is_outer = match entity.type_name.as_str() {
        "FACE_OUTER_BOUND" => true,
        "FACE_BOUND" => false,
        other => return Err(StepError::type_mismatch("FACE_BOUND", other)),
    };
    Ok(StepFaceBound {
        loop_id: entity.entity_ref(1)?,
        orientation: entity.logical(2)?,
        is_outer,
    })
}

/// Parse an ADVANCED_FACE, FACE_SURFACE or bare FACE entity.
pub fn parse_face(file: &StepFile, id: u64) -> Result<StepFace, StepError> {
    let entity = file.require(id)?;
    let (surface_id, same_sense) = match entity.type_name.as_str() {
        "ADVANCED_FACE" | "FACE_SURFACE" => (Some(entity.entity_ref(2)?), entity.logical(3)?),
        "FACE" => (None, true),
        other => return Err(StepError::type_mismatch("ADVANCED_FACE", other)),
    };

    let bounds = entity
        .entity_ref_list(1)?
        .into_iter()
        .map(|bid| parse_face_bound(file, bid))
        .collect::<Result<Vec<_>, _>>()?;
    if bounds.is_empty() {
        return Err(StepError::InvalidTopology(format!("face #{id} has no bounds")));
    }

    Ok(StepFace {
        id,
        bounds,
        surface_id,
        same_sense,
    })
}

/// Parse a CLOSED_SHELL or OPEN_SHELL entity.
pub fn parse_shell(file: &StepFile, id: u64) -> Result<StepShell, StepError> {
    let entity = file.require(id)?;
    let is_closed = match entity.type_name.as_str() {
        "CLOSED_SHELL" => true,
        "OPEN_SHELL" => false,
        other => return Err(StepError::type_mismatch("CLOSED_SHELL", other)),
    };
    Ok(StepShell {
        face_ids: entity.entity_ref_list(1)?,
        is_closed,
    })
}

/// Parse any of the [`SOLID_TYPES`] into the shells that bound it.
///
/// Voids of a BREP_WITH_VOIDS are interior and never visible, so only its
/// outer shell is returned.
pub fn parse_solid(file: &StepFile, id: u64) -> Result<StepSolid, StepError> {
    let entity = file.require(id)?;
    let shell_ids = match entity.type_name.as_str() {
        "MANIFOLD_SOLID_BREP" | "FACETED_BREP" | "BREP_WITH_VOIDS" => {
            vec![entity.entity_ref(1)?]
        }
        "SHELL_BASED_SURFACE_MODEL" => entity.entity_ref_list(1)?,
        other => return Err(StepError::type_mismatch("MANIFOLD_SOLID_BREP", other)),
    };
    Ok(StepSolid {
        kind: entity.type_name.clone(),
        name: entity.name().to_string(),
        shell_ids,
    })
}
