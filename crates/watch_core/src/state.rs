use std::collections::VecDeque;

use watch_logging::set_job_context;

use crate::view_model::{AppViewModel, ConnectionView};
use crate::{Connection, DecodeFailure, InboundLog, JobId, JobSnapshot, Reconciler};

/// Decode failures kept for diagnostics; older ones are dropped first.
pub const MAX_DECODE_FAILURES: usize = 32;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    connection: Connection,
    inbound: InboundLog,
    reconciler: Reconciler,
    decode_failures: VecDeque<DecodeFailure>,
    decode_failure_count: u64,
    last_submit_error: Option<String>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            connection: ConnectionView {
                status: self.connection.status(),
                attempt: self.connection.attempt(),
                last_error: self.connection.last_error().map(ToOwned::to_owned),
            },
            snapshot: self.reconciler.current_snapshot(),
            inbound_count: self.inbound.len(),
            recent_decode_failures: self.decode_failures.iter().cloned().collect(),
            last_submit_error: self.last_submit_error.clone(),
            dirty: self.dirty,
        }
    }

    pub fn current_snapshot(&self) -> JobSnapshot {
        self.reconciler.current_snapshot()
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn inbound(&self) -> &InboundLog {
        &self.inbound
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn decode_failure_count(&self) -> u64 {
        self.decode_failure_count
    }

    /// Returns whether anything changed since the last call, and resets the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn connection_mut(&mut self) -> &mut Connection {
        &mut self.connection
    }

    pub(crate) fn inbound_mut(&mut self) -> &mut InboundLog {
        &mut self.inbound
    }

    pub(crate) fn reconciler_mut(&mut self) -> &mut Reconciler {
        &mut self.reconciler
    }

    /// Track `job_id` from now on; frames received earlier leave the view.
    pub(crate) fn start_job(&mut self, job_id: JobId, initial_total: Option<u64>) {
        set_job_context(Some(&job_id));
        self.reconciler.start_job(job_id, initial_total);
        self.inbound.mark_view();
        self.last_submit_error = None;
        self.mark_dirty();
    }

    pub(crate) fn set_submit_error(&mut self, message: String) {
        self.last_submit_error = Some(message);
        self.mark_dirty();
    }

    pub(crate) fn record_decode_failure(&mut self, failure: DecodeFailure) {
        if self.decode_failures.len() == MAX_DECODE_FAILURES {
            self.decode_failures.pop_front();
        }
        self.decode_failures.push_back(failure);
        self.decode_failure_count += 1;
    }
}
