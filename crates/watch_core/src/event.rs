use serde_json::Value;

pub type JobId = String;

/// A decoded push notification about one job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    ProgressUpdate {
        job_id: JobId,
        progress: u8,
        completed: u64,
        failed: u64,
        total: Option<u64>,
    },
    ItemStarted {
        job_id: JobId,
        item_key: String,
        index: Option<u64>,
    },
    ItemComplete {
        job_id: JobId,
        item_key: String,
        success: bool,
        payload: Option<Value>,
        error: Option<String>,
    },
    JobComplete {
        job_id: JobId,
        completed: u64,
        failed: u64,
        total: Option<u64>,
    },
    JobError {
        job_id: JobId,
        message: String,
    },
}

impl JobEvent {
    pub fn job_id(&self) -> &str {
        match self {
            JobEvent::ProgressUpdate { job_id, .. }
            | JobEvent::ItemStarted { job_id, .. }
            | JobEvent::ItemComplete { job_id, .. }
            | JobEvent::JobComplete { job_id, .. }
            | JobEvent::JobError { job_id, .. } => job_id,
        }
    }

    /// Short name used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            JobEvent::ProgressUpdate { .. } => "progress_update",
            JobEvent::ItemStarted { .. } => "url_start",
            JobEvent::ItemComplete { .. } => "url_complete",
            JobEvent::JobComplete { .. } => "job_complete",
            JobEvent::JobError { .. } => "job_error",
        }
    }
}

/// Job status as reported by the status-poll collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus {
    Pending,
    Started,
    InProgress,
    Completed,
    Failed,
    Other(String),
}

impl PollStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => PollStatus::Pending,
            "started" | "starting" => PollStatus::Started,
            "in_progress" | "running" => PollStatus::InProgress,
            "completed" | "complete" | "done" => PollStatus::Completed,
            "failed" | "error" => PollStatus::Failed,
            _ => PollStatus::Other(raw.to_string()),
        }
    }
}

/// Out-of-band snapshot of a job fetched by the status poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSnapshot {
    pub job_id: JobId,
    pub status: PollStatus,
    pub progress: u8,
    pub completed: u64,
    pub failed: u64,
    pub total: Option<u64>,
    pub error: Option<String>,
}

/// Reply of the job-submission collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitResponse {
    Started { job_id: JobId },
    Rejected { status: String, message: String },
}
