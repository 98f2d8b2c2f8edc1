//! Host-side handle to a running worker.

use std::any::Any;
use std::thread::JoinHandle;

use tokio::sync::{mpsc, watch};

use crate::config::WorkerConfig;
use crate::dispatcher::{DispatchStats, RequestDispatcher};
use crate::engine::{EngineLoader, StartupFault};
use crate::error::{Result, WorkerError};
use crate::loader::ModuleLoader;
use crate::message::{ConversionRequest, WorkerEvent};

/// Lifecycle of a worker as seen by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerState {
    /// The engine module is being brought up. Posted requests queue.
    Starting,
    /// Requests are being converted.
    Active,
    /// The inbox was closed and every queued request answered.
    Stopped,
    /// The engine module could not be brought up.
    Failed(StartupFault),
    /// The worker thread panicked.
    Faulted,
}

impl WorkerState {
    /// Whether the worker has exited.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkerState::Stopped | WorkerState::Failed(_) | WorkerState::Faulted
        )
    }
}

/// Publishes [`WorkerState::Faulted`] if the worker thread unwinds.
struct FaultGuard<'a> {
    state: &'a watch::Sender<WorkerState>,
}

impl Drop for FaultGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            tracing::error!("worker thread panicked");
            self.state.send_replace(WorkerState::Faulted);
        }
    }
}

/// A background conversion worker.
///
/// Requests posted with [`post`](Self::post) are converted one at a time in
/// the order received, and each produces exactly one [`WorkerEvent`].
/// Requests posted before the engine is ready are queued, up to the
/// configured inbox capacity, after which `post` waits.
pub struct WorkerHandle {
    inbox: Option<mpsc::Sender<ConversionRequest>>,
    events: mpsc::UnboundedReceiver<WorkerEvent>,
    state: watch::Receiver<WorkerState>,
    thread: Option<JoinHandle<std::result::Result<DispatchStats, StartupFault>>>,
}

impl WorkerHandle {
    /// Start a worker thread that loads its engine through `loader`.
    ///
    /// Returns immediately; use [`ready`](Self::ready) to wait for startup.
    pub fn spawn<L>(loader: L, config: &WorkerConfig) -> Result<Self>
    where
        L: EngineLoader + Send + 'static,
    {
        config.validate()?;

        let (inbox_tx, inbox_rx) = mpsc::channel(config.inbox_capacity);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(WorkerState::Starting);

        let thread = std::thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || worker_main(loader, inbox_rx, events_tx, state_tx))
            .map_err(WorkerError::Spawn)?;

        tracing::debug!(
            thread = %config.thread_name,
            capacity = config.inbox_capacity,
            "worker spawned"
        );

        Ok(Self {
            inbox: Some(inbox_tx),
            events: events_rx,
            state: state_rx,
            thread: Some(thread),
        })
    }

    /// Queue a request. Waits while the inbox is full.
    pub async fn post(&self, request: impl Into<ConversionRequest>) -> Result<()> {
        let inbox = self.inbox.as_ref().ok_or(WorkerError::Closed)?;
        inbox
            .send(request.into())
            .await
            .map_err(|_| WorkerError::Closed)
    }

    /// Next reply or fault. `None` once the worker has exited and every
    /// event has been taken.
    pub async fn next_event(&mut self) -> Option<WorkerEvent> {
        self.events.recv().await
    }

    /// Wait until startup finishes.
    pub async fn ready(&mut self) -> Result<()> {
        let state = self
            .state
            .wait_for(|s| *s != WorkerState::Starting)
            .await
            .map_err(|_| WorkerError::Closed)?
            .clone();
        match state {
            WorkerState::Starting | WorkerState::Active | WorkerState::Stopped => Ok(()),
            WorkerState::Failed(fault) => Err(WorkerError::Startup(fault)),
            WorkerState::Faulted => Err(WorkerError::Panicked(
                "worker panicked during startup".into(),
            )),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WorkerState {
        self.state.borrow().clone()
    }

    /// Wait for the worker thread to exit and return its final state.
    pub async fn exited(&mut self) -> WorkerState {
        let exited = self
            .state
            .wait_for(WorkerState::is_terminal)
            .await
            .map(|state| state.clone());
        exited.unwrap_or_else(|_| self.state.borrow().clone())
    }

    /// Stop accepting requests. Queued requests are still converted and
    /// their events still delivered.
    pub fn close(&mut self) {
        if self.inbox.take().is_some() {
            tracing::debug!("worker inbox closed");
        }
    }

    /// Close the inbox and wait for the worker thread to finish.
    ///
    /// Events for requests still queued are produced but discarded. Drain
    /// [`next_event`](Self::next_event) after [`close`](Self::close) to
    /// observe them.
    pub async fn shutdown(mut self) -> Result<DispatchStats> {
        self.close();
        let Some(thread) = self.thread.take() else {
            return Err(WorkerError::Closed);
        };

        // `self.events` stays alive across the join so the dispatcher
        // finishes the queue instead of stopping at the first send.
        let joined = tokio::task::spawn_blocking(move || thread.join())
            .await
            .map_err(|err| WorkerError::Panicked(err.to_string()))?;

        match joined {
            Ok(Ok(stats)) => Ok(stats),
            Ok(Err(fault)) => Err(WorkerError::Startup(fault)),
            Err(payload) => Err(WorkerError::Panicked(panic_message(payload.as_ref()))),
        }
    }
}

fn worker_main<L: EngineLoader>(
    loader: L,
    mut inbox: mpsc::Receiver<ConversionRequest>,
    events: mpsc::UnboundedSender<WorkerEvent>,
    state: watch::Sender<WorkerState>,
) -> std::result::Result<DispatchStats, StartupFault> {
    let _guard = FaultGuard { state: &state };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| StartupFault::Runtime(err.to_string()));
    let ready = match runtime.and_then(|rt| rt.block_on(ModuleLoader::new(loader).initialize())) {
        Ok(ready) => ready,
        Err(fault) => {
            state.send_replace(WorkerState::Failed(fault.clone()));
            return Err(fault);
        }
    };

    let dispatcher = RequestDispatcher::new(events).activate(ready);
    state.send_replace(WorkerState::Active);

    let stats = dispatcher.run(&mut inbox);
    state.send_replace(WorkerState::Stopped);
    Ok(stats)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_payloads() {
        let s: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(s.as_ref()), "boom");
        let s: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(s.as_ref()), "bang");
        let s: Box<dyn Any + Send> = Box::new(7u32);
        assert_eq!(panic_message(s.as_ref()), "unknown panic payload");
    }

    #[test]
    fn test_terminal_states() {
        assert!(!WorkerState::Starting.is_terminal());
        assert!(!WorkerState::Active.is_terminal());
        assert!(WorkerState::Stopped.is_terminal());
        assert!(WorkerState::Failed(StartupFault::Unreachable("x".into())).is_terminal());
        assert!(WorkerState::Faulted.is_terminal());
    }
}
