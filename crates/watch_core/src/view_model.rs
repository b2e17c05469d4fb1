use crate::results::ResultEntry;
use crate::{ConnectionStatus, DecodeFailure, Job};

/// Read-only copy of the tracked job and its results.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JobSnapshot {
    pub job: Option<Job>,
    pub results: Vec<ResultEntry>,
    /// Items announced as started but not yet completed.
    pub in_flight: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectionView {
    pub status: ConnectionStatus,
    pub attempt: u32,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppViewModel {
    pub connection: ConnectionView,
    pub snapshot: JobSnapshot,
    pub inbound_count: usize,
    pub recent_decode_failures: Vec<DecodeFailure>,
    pub last_submit_error: Option<String>,
    pub dirty: bool,
}
