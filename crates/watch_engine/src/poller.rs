use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use watch_logging::watch_debug;

use crate::{EngineEvent, EventSink, JobId, StatusSource};

/// Periodic status check for the tracked job. Starting a new poll cancels the
/// previous one, so replies only ever arrive for the latest job id.
#[derive(Default)]
pub struct Poller {
    active: Option<(JobId, CancellationToken)>,
}

impl Poller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Must be called from within a tokio runtime.
    pub fn start(
        &mut self,
        job_id: JobId,
        interval: Duration,
        source: Arc<dyn StatusSource>,
        sink: Arc<dyn EventSink>,
    ) {
        self.stop();
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let task_job = job_id.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately; the job was only just submitted.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        let event = match source.job_status(&task_job).await {
                            Ok(body) => EngineEvent::PollBody { job_id: task_job.clone(), body },
                            Err(err) => EngineEvent::PollFailed {
                                job_id: task_job.clone(),
                                message: err.to_string(),
                            },
                        };
                        if cancelled.is_cancelled() {
                            break;
                        }
                        sink.emit(event);
                    }
                }
            }
            watch_debug!("poller for {} stopped", task_job);
        });
        self.active = Some((job_id, token));
    }

    pub fn stop(&mut self) {
        if let Some((_, token)) = self.active.take() {
            token.cancel();
        }
    }

    pub fn active_job(&self) -> Option<&str> {
        self.active.as_ref().map(|(job_id, _)| job_id.as_str())
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}
