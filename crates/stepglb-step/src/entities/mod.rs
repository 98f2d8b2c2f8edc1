//! STEP entity type definitions and parsing utilities.
//!
//! Typed views over the raw entity graph for the AP203/AP214 subset the
//! reader walks: placements, edge curves, B-rep topology and presentation
//! styles.

pub mod curves;
pub mod geometry;
pub mod style;
pub mod topology;

pub use curves::*;
pub use geometry::*;
pub use style::*;
pub use topology::*;

use crate::error::StepError;
use crate::parser::{StepEntity, StepValue};

/// Helper trait for extracting argument values from STEP entities.
pub trait EntityArgs {
    /// Get a required real argument at index.
    fn real(&self, idx: usize) -> Result<f64, StepError>;

    /// Get a required `.T.`/`.F.` argument at index.
    fn logical(&self, idx: usize) -> Result<bool, StepError>;

    /// Get a required entity reference at index.
    fn entity_ref(&self, idx: usize) -> Result<u64, StepError>;

    /// Get a required list argument at index.
    fn list(&self, idx: usize) -> Result<&[StepValue], StepError>;

    /// Get a list of reals at index.
    fn real_list(&self, idx: usize) -> Result<Vec<f64>, StepError>;

    /// Get a list of entity references at index.
    fn entity_ref_list(&self, idx: usize) -> Result<Vec<u64>, StepError>;

    /// Name argument (index 0), empty when unset.
    fn name(&self) -> &str;

    /// Check if argument at index is null or missing.
    fn is_null(&self, idx: usize) -> bool;
}

impl StepEntity {
    fn arg_error(&self, what: &str, idx: usize) -> StepError {
        StepError::parser(
            Some(self.id),
            format!("expected {what} at arg {idx} in {}", self.type_name),
        )
    }
}

impl EntityArgs for StepEntity {
    fn real(&self, idx: usize) -> Result<f64, StepError> {
        self.args
            .get(idx)
            .and_then(StepValue::as_real)
            .ok_or_else(|| self.arg_error("real", idx))
    }

    fn logical(&self, idx: usize) -> Result<bool, StepError> {
        self.args
            .get(idx)
            .and_then(StepValue::as_bool)
            .ok_or_else(|| self.arg_error("logical", idx))
    }

    fn entity_ref(&self, idx: usize) -> Result<u64, StepError> {
        self.args
            .get(idx)
            .and_then(StepValue::as_entity_ref)
            .ok_or_else(|| self.arg_error("entity ref", idx))
    }

    fn list(&self, idx: usize) -> Result<&[StepValue], StepError> {
        self.args
            .get(idx)
            .and_then(StepValue::as_list)
            .ok_or_else(|| self.arg_error("list", idx))
    }

    fn real_list(&self, idx: usize) -> Result<Vec<f64>, StepError> {
        self.list(idx)?
            .iter()
            .map(|v| v.as_real().ok_or_else(|| self.arg_error("list of reals", idx)))
            .collect()
    }

    fn entity_ref_list(&self, idx: usize) -> Result<Vec<u64>, StepError> {
        self.list(idx)?
            .iter()
            .map(|v| {
                v.as_entity_ref()
                    .ok_or_else(|| self.arg_error("list of entity refs", idx))
            })
            .collect()
    }

    fn name(&self) -> &str {
        self.args.first().and_then(StepValue::as_string).unwrap_or("")
    }

    fn is_null(&self, idx: usize) -> bool {
        self.args.get(idx).map_or(true, |v| *v == StepValue::Null)
    }
}
