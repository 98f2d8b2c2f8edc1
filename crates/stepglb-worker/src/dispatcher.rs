//! Routes inbound requests to the engine, one at a time.
//!
//! The dispatcher is a typestate: an [`Inactive`] dispatcher has no engine
//! and no way to accept messages. [`RequestDispatcher::activate`] consumes it
//! together with a [`ReadyEngine`], so a request can never reach an engine
//! that was not initialized.

use tokio::sync::mpsc;

use crate::engine::ConversionEngine;
use crate::loader::ReadyEngine;
use crate::message::{ConversionFault, ConversionRequest, ConversionResult, WorkerEvent};

/// Dispatcher state before an engine is attached.
#[derive(Debug)]
pub struct Inactive;

/// Dispatcher state with an initialized engine.
pub struct Active<E> {
    engine: E,
    next_sequence: u64,
    stats: DispatchStats,
}

/// Counters for a dispatcher run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Requests taken from the inbox.
    pub received: u64,
    /// Requests answered with a GLB.
    pub replied: u64,
    /// Requests the engine rejected.
    pub faulted: u64,
}

/// Request router over a worker's event channel.
pub struct RequestDispatcher<S> {
    state: S,
    events: mpsc::UnboundedSender<WorkerEvent>,
}

impl RequestDispatcher<Inactive> {
    /// A dispatcher that will publish to `events` once activated.
    pub fn new(events: mpsc::UnboundedSender<WorkerEvent>) -> Self {
        Self {
            state: Inactive,
            events,
        }
    }

    /// Attach an initialized engine. Subsequent requests are routed to it.
    pub fn activate<E: ConversionEngine>(self, ready: ReadyEngine<E>) -> RequestDispatcher<Active<E>> {
        tracing::debug!("dispatcher active");
        RequestDispatcher {
            state: Active {
                engine: ready.into_engine(),
                next_sequence: 0,
                stats: DispatchStats::default(),
            },
            events: self.events,
        }
    }
}

impl<E: ConversionEngine> RequestDispatcher<Active<E>> {
    /// Convert one request and publish exactly one event for it.
    ///
    /// Returns `false` when nobody is listening for events any more.
    pub fn on_message(&mut self, request: ConversionRequest) -> bool {
        let sequence = self.state.next_sequence;
        self.state.next_sequence += 1;
        self.state.stats.received += 1;

        let span = tracing::debug_span!("convert", sequence, bytes = request.len());
        let outcome = span.in_scope(|| self.state.engine.convert(request.as_bytes()));
        drop(request);

        let event = match outcome {
            Ok(glb) => {
                self.state.stats.replied += 1;
                tracing::debug!(sequence, glb_bytes = glb.len(), "conversion succeeded");
                WorkerEvent::Reply {
                    sequence,
                    result: ConversionResult::new(glb),
                }
            }
            Err(err) => {
                self.state.stats.faulted += 1;
                tracing::warn!(sequence, error = %err, "conversion failed");
                WorkerEvent::Fault(ConversionFault {
                    sequence,
                    source: Box::new(err),
                })
            }
        };

        if self.events.send(event).is_err() {
            tracing::debug!(sequence, "event receiver dropped");
            return false;
        }
        true
    }

    /// Serve the inbox until it is closed and drained, or until the event
    /// receiver goes away. Blocks the calling thread.
    pub fn run(mut self, inbox: &mut mpsc::Receiver<ConversionRequest>) -> DispatchStats {
        while let Some(request) = inbox.blocking_recv() {
            if !self.on_message(request) {
                break;
            }
        }
        tracing::info!(
            received = self.state.stats.received,
            replied = self.state.stats.replied,
            faulted = self.state.stats.faulted,
            "dispatcher stopped"
        );
        self.state.stats
    }

    /// Counters so far.
    pub fn stats(&self) -> DispatchStats {
        self.state.stats
    }

    /// The attached engine.
    pub fn engine(&self) -> &E {
        &self.state.engine
    }
}
