//! One-shot engine module initialization.

use std::time::Instant;

use crate::engine::{ConversionEngine, EngineLoader, StartupFault};

/// Brings an engine module up exactly once.
///
/// [`initialize`](Self::initialize) consumes the loader, so a second
/// initialization cannot be expressed.
pub struct ModuleLoader<L> {
    loader: L,
}

/// An engine that has been instantiated and had `init_log` called.
///
/// Only [`ModuleLoader::initialize`] can produce one, which is what lets
/// the dispatcher accept it as proof of readiness.
pub struct ReadyEngine<E> {
    engine: E,
}

impl<L: EngineLoader> ModuleLoader<L> {
    /// Wrap an engine loader.
    pub fn new(loader: L) -> Self {
        Self { loader }
    }

    /// Instantiate the engine, then enable its diagnostics.
    ///
    /// Module instantiation is the only suspend point. A failure is fatal
    /// to the worker and `init_log` is not called.
    pub async fn initialize(self) -> Result<ReadyEngine<L::Engine>, StartupFault> {
        let started = Instant::now();
        let engine = self.loader.instantiate().await.inspect_err(|fault| {
            tracing::error!(%fault, "engine module failed to instantiate");
        })?;

        engine.init_log();
        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "engine module ready"
        );
        Ok(ReadyEngine { engine })
    }
}

impl<E> ReadyEngine<E> {
    /// Borrow the engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub(crate) fn into_engine(self) -> E {
        self.engine
    }
}

impl<E: ConversionEngine> std::fmt::Debug for ReadyEngine<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadyEngine").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Debug, thiserror::Error)]
    #[error("never")]
    struct Never;

    struct CountingEngine {
        inits: Rc<Cell<usize>>,
    }

    impl ConversionEngine for CountingEngine {
        type Error = Never;

        fn init_log(&self) {
            self.inits.set(self.inits.get() + 1);
        }

        fn convert(&self, step: &[u8]) -> Result<Vec<u8>, Never> {
            Ok(step.to_vec())
        }
    }

    struct Loader {
        inits: Rc<Cell<usize>>,
        fault: Option<StartupFault>,
    }

    #[async_trait(?Send)]
    impl EngineLoader for Loader {
        type Engine = CountingEngine;

        async fn instantiate(&self) -> Result<CountingEngine, StartupFault> {
            tokio::task::yield_now().await;
            match &self.fault {
                Some(fault) => Err(fault.clone()),
                None => Ok(CountingEngine {
                    inits: Rc::clone(&self.inits),
                }),
            }
        }
    }

    #[tokio::test]
    async fn test_init_log_called_once() {
        let inits = Rc::new(Cell::new(0));
        let loader = ModuleLoader::new(Loader {
            inits: Rc::clone(&inits),
            fault: None,
        });
        let ready = loader.initialize().await.unwrap();
        assert_eq!(inits.get(), 1);
        assert_eq!(ready.engine().convert(b"x").unwrap(), b"x");
    }

    #[tokio::test]
    async fn test_fault_skips_init_log() {
        let inits = Rc::new(Cell::new(0));
        let loader = ModuleLoader::new(Loader {
            inits: Rc::clone(&inits),
            fault: Some(StartupFault::Malformed("bad header".into())),
        });
        let err = loader.initialize().await.unwrap_err();
        assert_eq!(err, StartupFault::Malformed("bad header".into()));
        assert_eq!(inits.get(), 0);
    }
}
