use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use crate::workflow::ExecutionState;
use super::events::ExecutionEvent;

/// The only path by which a driver touches execution state.
///
/// Every mutation re-checks the cancellation token while holding the write
/// lock, so nothing lands once the owning execution has been torn down.
#[derive(Clone)]
pub struct StateWriter {
    state: Arc<RwLock<ExecutionState>>,
    token: CancellationToken,
    event_tx: Option<mpsc::UnboundedSender<ExecutionEvent>>,
}

impl StateWriter {
    pub fn new(state: Arc<RwLock<ExecutionState>>, token: CancellationToken) -> Self {
        Self { state, token, event_tx: None }
    }

    pub fn with_event_channel(mut self, tx: Option<mpsc::UnboundedSender<ExecutionEvent>>) -> Self {
        self.event_tx = tx;
        self
    }

    /// Apply `f` unless the execution was cancelled. Returns `None` when cancelled.
    pub async fn apply<R>(&self, f: impl FnOnce(&mut ExecutionState) -> R) -> Option<R> {
        let mut state = self.state.write().await;
        if self.token.is_cancelled() {
            return None;
        }
        Some(f(&mut state))
    }

    /// Prepend a log line and mirror it as an event. False once cancelled.
    pub async fn log(&self, line: String) -> bool {
        let applied = self.apply(|s| s.log(line.clone())).await.is_some();
        if applied {
            self.emit(ExecutionEvent::Log { line });
        }
        applied
    }

    pub fn emit(&self, event: ExecutionEvent) {
        if self.token.is_cancelled() {
            return;
        }
        if let Some(ref tx) = self.event_tx {
            let _ = tx.send(event);
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}
