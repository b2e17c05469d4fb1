use crate::JobId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobStatus {
    #[default]
    Starting,
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Progress of the tracked job.
///
/// `completed + failed <= total` holds whenever `total` is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub progress: u8,
    pub completed: u64,
    pub failed: u64,
    pub total: Option<u64>,
    pub error: Option<String>,
}

impl Job {
    pub fn new(id: impl Into<JobId>, total: Option<u64>) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Starting,
            progress: 0,
            completed: 0,
            failed: 0,
            total,
            error: None,
        }
    }

    /// Items finished either way.
    pub fn processed(&self) -> u64 {
        self.completed + self.failed
    }
}
