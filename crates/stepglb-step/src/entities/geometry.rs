//! Fundamental geometry entities: points, directions, and placements.

use super::EntityArgs;
use crate::error::StepError;
use crate::parser::StepFile;
use crate::{Dir3, Point3, Vec3};

/// Parse a CARTESIAN_POINT entity.
///
/// STEP syntax: `CARTESIAN_POINT(name, (x, y, z))`. Two-coordinate points
/// are lifted to `z = 0`.
pub fn parse_cartesian_point(file: &StepFile, id: u64) -> Result<Point3, StepError> {
    let entity = file.require_type(id, "CARTESIAN_POINT")?;
    let coords = entity.real_list(1)?;
    match coords.as_slice() {
        [x, y, z, ..] => Ok(Point3::new(*x, *y, *z)),
        [x, y] => Ok(Point3::new(*x, *y, 0.0)),
        _ => Err(StepError::parser(
            Some(id),
            format!("CARTESIAN_POINT needs 3 coordinates, got {}", coords.len()),
        )),
    }
}

/// Parse a DIRECTION entity.
///
/// STEP syntax: `DIRECTION(name, (x, y, z))`
pub fn parse_direction(file: &StepFile, id: u64) -> Result<Dir3, StepError> {
    let entity = file.require_type(id, "DIRECTION")?;
    let coords = entity.real_list(1)?;
    if coords.len() < 3 {
        return Err(StepError::parser(
            Some(id),
            format!("DIRECTION needs 3 components, got {}", coords.len()),
        ));
    }
    let v = Vec3::new(coords[0], coords[1], coords[2]);
    if v.norm() < 1e-15 {
        return Err(StepError::InvalidGeometry(format!(
            "zero-length direction #{id}"
        )));
    }
    Ok(Dir3::new_normalize(v))
}

/// Axis placement data (origin + optional directions).
#[derive(Debug, Clone)]
pub struct AxisPlacement {
    /// Location point.
    pub location: Point3,
    /// Z-axis direction (normal).
    pub axis: Option<Dir3>,
    /// X-axis direction (reference).
    pub ref_direction: Option<Dir3>,
}

impl AxisPlacement {
    /// Z-axis direction, defaulting to +Z.
    pub fn z_axis(&self) -> Dir3 {
        self.axis.unwrap_or_else(Vec3::z_axis)
    }

    /// X-axis direction: the reference direction projected perpendicular to
    /// Z, or an arbitrary perpendicular when unset or parallel.
    pub fn x_axis(&self) -> Dir3 {
        let z = self.z_axis().into_inner();
        if let Some(r) = self.ref_direction {
            let projected = r.into_inner() - r.dot(&z) * z;
            if projected.norm() > 1e-12 {
                return Dir3::new_normalize(projected);
            }
        }
        let arbitrary = if z.x.abs() < 0.9 { Vec3::x() } else { Vec3::y() };
        Dir3::new_normalize(arbitrary - arbitrary.dot(&z) * z)
    }

    /// Y-axis direction (Z × X).
    pub fn y_axis(&self) -> Dir3 {
        Dir3::new_normalize(self.z_axis().cross(&self.x_axis().into_inner()))
    }
}

/// Parse an AXIS2_PLACEMENT_3D or AXIS1_PLACEMENT entity.
///
/// STEP syntax: `AXIS2_PLACEMENT_3D(name, location, axis, ref_direction)`
/// and `AXIS1_PLACEMENT(name, location, axis)`.
pub fn parse_axis_placement(file: &StepFile, id: u64) -> Result<AxisPlacement, StepError> {
    let entity = file.require(id)?;
    let has_ref = match entity.type_name.as_str() {
        "AXIS2_PLACEMENT_3D" => true,
        "AXIS1_PLACEMENT" => false,
        other => return Err(StepError::type_mismatch("AXIS2_PLACEMENT_3D", other)),
    };

    let location = parse_cartesian_point(file, entity.entity_ref(1)?)?;
    let axis = if entity.is_null(2) {
        None
    } else {
        Some(parse_direction(file, entity.entity_ref(2)?)?)
    };
    let ref_direction = if has_ref && !entity.is_null(3) {
        Some(parse_direction(file, entity.entity_ref(3)?)?)
    } else {
        None
    };

    Ok(AxisPlacement {
        location,
        axis,
        ref_direction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn parse_step(data: &str) -> StepFile {
        let input = format!("ISO-10303-21;\nHEADER;\nENDSEC;\nDATA;\n{data}\nENDSEC;\nEND-ISO-10303-21;\n");
        Parser::parse(input.as_bytes()).unwrap()
    }

    #[test]
    fn test_parse_cartesian_point() {
        let file = parse_step("#1 = CARTESIAN_POINT('origin', (1., 2., 3.));\n#2 = CARTESIAN_POINT('', (4., 5.));");
        let p = parse_cartesian_point(&file, 1).unwrap();
        assert_eq!(p, Point3::new(1.0, 2.0, 3.0));
        let q = parse_cartesian_point(&file, 2).unwrap();
        assert_eq!(q, Point3::new(4.0, 5.0, 0.0));
    }

    #[test]
    fn test_zero_direction_rejected() {
        let file = parse_step("#1 = DIRECTION('', (0., 0., 0.));");
        assert!(matches!(
            parse_direction(&file, 1),
            Err(StepError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_parse_axis2_placement_3d() {
        let file = parse_step(
            "#1 = CARTESIAN_POINT('', (0., 0., 0.));\n\
             #2 = DIRECTION('', (0., 0., 1.));\n\
             #3 = DIRECTION('', (1., 0., 0.));\n\
             #4 = AXIS2_PLACEMENT_3D('', #1, #2, #3);\n\
             #5 = AXIS2_PLACEMENT_3D('', #1, $, $);",
        );
        let placement = parse_axis_placement(&file, 4).unwrap();
        assert!((placement.z_axis().z - 1.0).abs() < 1e-10);
        assert!((placement.x_axis().x - 1.0).abs() < 1e-10);
        assert!((placement.y_axis().y - 1.0).abs() < 1e-10);

        let defaulted = parse_axis_placement(&file, 5).unwrap();
        let x = defaulted.x_axis();
        assert!(x.dot(&defaulted.z_axis().into_inner()).abs() < 1e-12);
    }
}
