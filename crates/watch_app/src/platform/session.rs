use std::collections::VecDeque;

use watch_core::{AppViewModel, ConnectionStatus, JobId, JobStatus, RETRY_CEILING};
use watch_logging::watch_warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Wait,
    Submit(String),
    Exit(Outcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Submitting,
    Tracking(JobId),
    Done,
}

/// Walks the URL list one job at a time.
///
/// Losing the push channel for good is not fatal: status polling keeps
/// tracking the job to its terminal state.
#[derive(Debug)]
pub struct Session {
    pending: VecDeque<String>,
    phase: Phase,
    failures: usize,
    channel_gave_up: bool,
}

impl Session {
    pub fn new(urls: Vec<String>) -> Self {
        Self {
            pending: urls.into(),
            phase: Phase::Done,
            failures: 0,
            channel_gave_up: false,
        }
    }

    pub fn start(&mut self) -> Step {
        self.advance()
    }

    /// `started` is the job id the submission produced, if any.
    pub fn submit_answered(&mut self, started: Option<JobId>) -> Step {
        if self.phase != Phase::Submitting {
            return Step::Wait;
        }
        match started {
            Some(job_id) => {
                self.phase = Phase::Tracking(job_id);
                Step::Wait
            }
            None => {
                self.failures += 1;
                self.advance()
            }
        }
    }

    pub fn observe(&mut self, view: &AppViewModel) -> Step {
        let gave_up = view.connection.status == ConnectionStatus::Closed
            && view.connection.attempt >= RETRY_CEILING;
        if gave_up && !self.channel_gave_up {
            watch_warn!("push channel gave up; following the job by polling only");
        }
        self.channel_gave_up = gave_up;

        let Phase::Tracking(tracked) = &self.phase else {
            return Step::Wait;
        };
        let Some(job) = view.snapshot.job.as_ref().filter(|job| &job.id == tracked) else {
            return Step::Wait;
        };
        match job.status {
            JobStatus::Completed => self.advance(),
            JobStatus::Failed => {
                self.failures += 1;
                self.advance()
            }
            JobStatus::Starting | JobStatus::InProgress => Step::Wait,
        }
    }

    fn advance(&mut self) -> Step {
        match self.pending.pop_front() {
            Some(url) => {
                self.phase = Phase::Submitting;
                Step::Submit(url)
            }
            None => {
                self.phase = Phase::Done;
                Step::Exit(if self.failures == 0 {
                    Outcome::Success
                } else {
                    Outcome::Failure
                })
            }
        }
    }
}
