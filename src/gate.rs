//! Single-flight initialization gate.
//!
//! Ensures the embedding engine is constructed from a ready artifact
//! exactly once per facade instance, no matter how many callers arrive
//! concurrently before it is ready.

use crate::error::{EmbedderError, Result};
use std::future::Future;
use std::sync::RwLock;
use tokio::sync::OnceCell;

/// Observable lifecycle of the lazily constructed engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitState {
    /// No request has needed the engine yet.
    Uninitialized,
    /// A fetch of the remote artifact is in flight.
    Fetching,
    /// The engine is constructed and serving requests.
    Ready,
    /// Initialization failed. Terminal: subsequent calls receive the
    /// same error and a new facade instance is required to retry.
    Failed,
}

/// Gate guarding one-time initialization of a shared value.
///
/// `Ready` and `Failed` are terminal; the stored outcome is cloned out
/// to every caller, so waiters on an in-flight initialization share the
/// triggering caller's result.
pub(crate) struct InitGate<T> {
    cell: OnceCell<std::result::Result<T, EmbedderError>>,
    state: RwLock<InitState>,
}

impl<T: Clone> InitGate<T> {
    pub(crate) fn new() -> Self {
        Self {
            cell: OnceCell::new(),
            state: RwLock::new(InitState::Uninitialized),
        }
    }

    /// Current state. Purely observational; only the gate itself moves
    /// the state forward.
    pub(crate) fn state(&self) -> InitState {
        *self.state.read().expect("init state lock poisoned")
    }

    /// Records that the in-flight initialization entered its fetch leg.
    ///
    /// Must only be called from within the closure passed to
    /// [`InitGate::get_or_init`]; the single-flight discipline makes
    /// that caller the exclusive writer.
    pub(crate) fn mark_fetching(&self) {
        *self.state.write().expect("init state lock poisoned") = InitState::Fetching;
    }

    /// Returns the initialized value, running `init` at most once across
    /// all callers of this gate.
    pub(crate) async fn get_or_init<F, Fut>(&self, init: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let outcome = self
            .cell
            .get_or_init(|| async {
                let outcome = init().await;
                let next = match &outcome {
                    Ok(_) => InitState::Ready,
                    Err(_) => InitState::Failed,
                };
                *self.state.write().expect("init state lock poisoned") = next;
                outcome
            })
            .await;
        outcome.clone()
    }
}
