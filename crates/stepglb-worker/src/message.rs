//! Host ↔ worker message contract.

use thiserror::Error;

use crate::engine::BoxError;

/// A STEP document sent to the worker. Owned by whoever holds it; the
/// dispatcher drops it once the conversion call returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest(Vec<u8>);

impl ConversionRequest {
    /// Wrap raw STEP bytes.
    pub fn new(step: impl Into<Vec<u8>>) -> Self {
        Self(step.into())
    }

    /// The payload bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for ConversionRequest {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for ConversionRequest {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for ConversionRequest {
    fn from(bytes: &[u8; N]) -> Self {
        Self(bytes.to_vec())
    }
}

/// A GLB scene produced for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult(Vec<u8>);

impl ConversionResult {
    pub(crate) fn new(glb: Vec<u8>) -> Self {
        Self(glb)
    }

    /// The GLB bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Take ownership of the GLB bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

/// The engine rejected the request with this sequence number.
#[derive(Debug, Error)]
#[error("conversion #{sequence} failed: {source}")]
pub struct ConversionFault {
    /// Receive ordinal of the rejected request.
    pub sequence: u64,
    /// The engine's error.
    #[source]
    pub source: BoxError,
}

/// Everything the worker sends back, in receive order.
#[derive(Debug)]
pub enum WorkerEvent {
    /// The request with this sequence number converted successfully.
    Reply {
        /// Receive ordinal of the request, starting at 0.
        sequence: u64,
        /// The converted scene.
        result: ConversionResult,
    },
    /// The engine rejected a request; the worker keeps running.
    Fault(ConversionFault),
}

impl WorkerEvent {
    /// Sequence number of the request this event answers.
    pub fn sequence(&self) -> u64 {
        match self {
            WorkerEvent::Reply { sequence, .. } => *sequence,
            WorkerEvent::Fault(fault) => fault.sequence,
        }
    }

    /// Turn the event into the outcome of its request.
    pub fn into_result(self) -> Result<ConversionResult, ConversionFault> {
        match self {
            WorkerEvent::Reply { result, .. } => Ok(result),
            WorkerEvent::Fault(fault) => Err(fault),
        }
    }
}
