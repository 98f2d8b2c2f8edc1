//! Edge curve entities: lines, circles and ellipses.
//!
//! Edges only need enough curve information to be turned into polyline
//! samples between their two vertices. Lines contribute no interior
//! samples. Conics are swept in parameter space.

use std::f64::consts::TAU;

use super::{parse_axis_placement, EntityArgs};
use crate::error::StepError;
use crate::parser::StepFile;
use crate::{Point3, Vec3};

/// Deepest chain of curve wrappers unwrapped before giving up.
const MAX_CURVE_DEPTH: usize = 16;

/// A circle or ellipse in 3D, parameterized as
/// `center + semi_x * cos(t) * x_dir + semi_y * sin(t) * y_dir`.
#[derive(Debug, Clone)]
pub struct Conic {
    /// Center point.
    pub center: Point3,
    /// Unit major direction.
    pub x_dir: Vec3,
    /// Unit minor direction.
    pub y_dir: Vec3,
    /// Semi-axis along `x_dir`.
    pub semi_x: f64,
    /// Semi-axis along `y_dir`.
    pub semi_y: f64,
}

impl Conic {
    /// Point at parameter `t` (radians).
    pub fn point_at(&self, t: f64) -> Point3 {
        self.center + self.semi_x * t.cos() * self.x_dir + self.semi_y * t.sin() * self.y_dir
    }

    /// Parameter of the point on the conic closest in angle to `p`.
    pub fn parameter_of(&self, p: &Point3) -> f64 {
        let d = p - self.center;
        (d.dot(&self.y_dir) / self.semi_y).atan2(d.dot(&self.x_dir) / self.semi_x)
    }

    /// Interior samples of the arc from `start` to `end`.
    ///
    /// With `same_sense` the arc runs in increasing parameter direction,
    /// otherwise in decreasing direction. Coincident endpoints mean a full
    /// turn. Neither endpoint is included in the output.
    pub fn sample_arc(
        &self,
        start: &Point3,
        end: &Point3,
        same_sense: bool,
        segments_per_turn: usize,
    ) -> Vec<Point3> {
        let ts = self.parameter_of(start);
        let te = self.parameter_of(end);
        let forward = positive_sweep(if same_sense { te - ts } else { ts - te });
        let sweep = if same_sense { forward } else { -forward };

        let n = ((forward / TAU) * segments_per_turn.max(3) as f64 - 1e-9).ceil() as usize;
        (1..n.max(1))
            .map(|i| self.point_at(ts + sweep * i as f64 / n as f64))
            .collect()
    }
}

/// Normalize an angle difference into `(0, TAU]`.
fn positive_sweep(delta: f64) -> f64 {
    let d = delta.rem_euclid(TAU);
    if d < 1e-9 {
        TAU
    } else {
        d
    }
}

/// Edge geometry as far as sampling is concerned.
#[derive(Debug, Clone)]
pub enum StepCurve {
    /// A straight line; the edge is its chord.
    Line,
    /// A circle or ellipse.
    Conic(Conic),
    /// Any other curve type; edges over it are approximated by a chord.
    Other(String),
}

/// Parse a CIRCLE or ELLIPSE entity.
///
/// STEP syntax: `CIRCLE(name, position, radius)` and
/// `ELLIPSE(name, position, semi_axis_1, semi_axis_2)`.
pub fn parse_conic(file: &StepFile, id: u64) -> Result<Conic, StepError> {
    let entity = file.require(id)?;
    let (semi_x, semi_y) = match entity.type_name.as_str() {
        "CIRCLE" => {
            let r = entity.real(2)?;
            (r, r)
        }
        "ELLIPSE" => (entity.real(2)?, entity.real(3)?),
        other => return Err(StepError::type_mismatch("CIRCLE", other)),
    };
    if semi_x <= 0.0 || semi_y <= 0.0 {
        return Err(StepError::InvalidGeometry(format!(
            "non-positive radius on #{id}"
        )));
    }

    let placement = parse_axis_placement(file, entity.entity_ref(1)?)?;
    Ok(Conic {
        center: placement.location,
        x_dir: placement.x_axis().into_inner(),
        y_dir: placement.y_axis().into_inner(),
        semi_x,
        semi_y,
    })
}

/// Parse the geometry of an edge, unwrapping surface and trimmed curves.
///
/// Wrapper chains longer than [`MAX_CURVE_DEPTH`], which includes any that
/// refer back to themselves, are rejected.
pub fn parse_curve(file: &StepFile, id: u64) -> Result<StepCurve, StepError> {
    let mut current = id;
    for _ in 0..=MAX_CURVE_DEPTH {
        let entity = file.require(current)?;
        match entity.type_name.as_str() {
            "LINE" => return Ok(StepCurve::Line),
            "CIRCLE" | "ELLIPSE" => return Ok(StepCurve::Conic(parse_conic(file, current)?)),
            // Wrappers keep the underlying curve at argument 1.
            "SURFACE_CURVE" | "SEAM_CURVE" | "INTERSECTION_CURVE" | "TRIMMED_CURVE" => {
                current = entity.entity_ref(1)?;
            }
            other => return Ok(StepCurve::Other(other.to_string())),
        }
    }
    Err(StepError::InvalidGeometry(format!(
        "curve #{id} wraps more than {MAX_CURVE_DEPTH} levels deep"
    )))
}
