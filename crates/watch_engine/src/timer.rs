use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::{EngineEvent, EventSink};

/// The single reconnect timer. Scheduling replaces the previous timer, so at
/// most one `RetryDue` can ever be outstanding.
#[derive(Default)]
pub struct RetryTimer {
    pending: Option<(u64, JoinHandle<()>)>,
}

impl RetryTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Must be called from within a tokio runtime.
    pub fn schedule(&mut self, generation: u64, delay: Duration, sink: Arc<dyn EventSink>) {
        self.cancel();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            sink.emit(EngineEvent::RetryDue { generation });
        });
        self.pending = Some((generation, task));
    }

    pub fn cancel(&mut self) {
        if let Some((_, task)) = self.pending.take() {
            task.abort();
        }
    }

    /// Generation of the armed timer, if it has not fired yet.
    pub fn pending_generation(&self) -> Option<u64> {
        self.pending
            .as_ref()
            .filter(|(_, task)| !task.is_finished())
            .map(|(generation, _)| *generation)
    }
}

impl Drop for RetryTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
