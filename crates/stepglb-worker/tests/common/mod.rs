//! Test engines and loaders for worker lifecycle tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use stepglb_worker::{ConversionEngine, EngineLoader, StartupFault};
use tokio::sync::Notify;

/// Counters shared between a test and the engine on the worker thread.
#[derive(Debug, Default)]
pub struct CallLog {
    pub init_calls: AtomicUsize,
    pub convert_calls: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl CallLog {
    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    pub fn convert_calls(&self) -> usize {
        self.convert_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EchoError {
    #[error("engine used before init_log")]
    NotInitialized,
    #[error("rejected payload of {0} bytes")]
    Rejected(usize),
}

/// Replies `GLB:` followed by the payload.
///
/// Payloads starting with `bad` are rejected, payloads starting with
/// `panic` panic.
pub struct EchoEngine {
    calls: Arc<CallLog>,
    delay: Duration,
}

impl ConversionEngine for EchoEngine {
    type Error = EchoError;

    fn init_log(&self) {
        self.calls.init_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn convert(&self, step: &[u8]) -> Result<Vec<u8>, EchoError> {
        if self.calls.init_calls() == 0 {
            return Err(EchoError::NotInitialized);
        }
        let now = self.calls.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.calls.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.calls.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.calls.convert_calls.fetch_add(1, Ordering::SeqCst);

        if step.starts_with(b"panic") {
            panic!("engine blew up");
        }
        if step.starts_with(b"bad") {
            return Err(EchoError::Rejected(step.len()));
        }
        let mut glb = b"GLB:".to_vec();
        glb.extend_from_slice(step);
        Ok(glb)
    }
}

/// Yields an [`EchoEngine`], optionally waiting on a gate first.
pub struct EchoLoader {
    pub calls: Arc<CallLog>,
    pub gate: Option<Arc<Notify>>,
    pub delay: Duration,
}

impl EchoLoader {
    pub fn new() -> (Self, Arc<CallLog>) {
        let calls = Arc::new(CallLog::default());
        let loader = Self {
            calls: Arc::clone(&calls),
            gate: None,
            delay: Duration::ZERO,
        };
        (loader, calls)
    }

    /// A loader that does not finish instantiating until the gate opens.
    pub fn gated() -> (Self, Arc<CallLog>, Arc<Notify>) {
        let (mut loader, calls) = Self::new();
        let gate = Arc::new(Notify::new());
        loader.gate = Some(Arc::clone(&gate));
        (loader, calls, gate)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait(?Send)]
impl EngineLoader for EchoLoader {
    type Engine = EchoEngine;

    async fn instantiate(&self) -> Result<EchoEngine, StartupFault> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        Ok(EchoEngine {
            calls: Arc::clone(&self.calls),
            delay: self.delay,
        })
    }
}

/// Always fails to instantiate.
pub struct FailingLoader(pub StartupFault);

#[async_trait(?Send)]
impl EngineLoader for FailingLoader {
    type Engine = EchoEngine;

    async fn instantiate(&self) -> Result<EchoEngine, StartupFault> {
        Err(self.0.clone())
    }
}
