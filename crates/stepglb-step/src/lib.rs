#![warn(missing_docs)]

//! STEP file reader for the stepglb conversion engine.
//!
//! Reads STEP files (ISO 10303-21) and flattens their B-rep bodies into
//! planar face polygons that a tessellator can triangulate. Targets the
//! AP203/AP214 entity set written by common mechanical CAD exporters.
//!
//! # Example
//!
//! ```no_run
//! use stepglb_step::{read_step_from_buffer, ReadOptions};
//!
//! let data = std::fs::read("model.step").unwrap();
//! let model = read_step_from_buffer(&data, &ReadOptions::default()).unwrap();
//! println!("{} bodies", model.bodies.len());
//! ```

mod entities;
mod error;
mod lexer;
mod model;
mod parser;
mod reader;

pub use error::StepError;
pub use model::{Body, FacePolygon, Rgb, StepModel};
pub use reader::{read_step, read_step_from_buffer, ReadOptions};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = nalgebra::Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = nalgebra::Unit<nalgebra::Vector3<f64>>;
