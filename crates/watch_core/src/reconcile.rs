use std::collections::{HashMap, HashSet};

use thiserror::Error;
use watch_logging::watch_warn;

use crate::results::{normalize_item_key, ResultIndex};
use crate::{Job, JobEvent, JobId, JobSnapshot, JobStatus, PollSnapshot, PollStatus};

/// Why an event or snapshot left the state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("no job is tracked")]
    NoJob,
    #[error("event for job {got} while tracking {tracked}")]
    StaleJob { tracked: JobId, got: JobId },
    #[error("job already reached a terminal state")]
    Terminal,
}

/// Single authority over the tracked job and its results.
///
/// Every entry point may be applied repeatedly or out of order: counters only
/// grow, terminal states stick and results are keyed per item.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Reconciler {
    job: Option<Job>,
    results: ResultIndex,
    outcomes: HashMap<String, bool>,
    in_flight: HashSet<String>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job(&self) -> Option<&Job> {
        self.job.as_ref()
    }

    pub fn results(&self) -> &ResultIndex {
        &self.results
    }

    /// Replace the tracked job; the previous job and its results are discarded.
    pub fn start_job(&mut self, job_id: impl Into<JobId>, initial_total: Option<u64>) {
        self.job = Some(Job::new(job_id, initial_total));
        self.results.clear();
        self.outcomes.clear();
        self.in_flight.clear();
    }

    pub fn current_snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            job: self.job.clone(),
            results: self.results.entries().to_vec(),
            in_flight: self.in_flight.len(),
        }
    }

    pub fn apply(&mut self, event: &JobEvent) -> Result<(), Rejection> {
        let job = tracked(&mut self.job, event.job_id())?;

        match event {
            JobEvent::ProgressUpdate {
                progress,
                completed,
                failed,
                total,
                ..
            } => {
                reject_terminal(job)?;
                merge_counts(job, Some(*progress), *completed, *failed, *total);
            }
            JobEvent::ItemStarted { item_key, .. } => {
                reject_terminal(job)?;
                let key = normalize_item_key(item_key);
                if !self.outcomes.contains_key(&key) {
                    self.in_flight.insert(key);
                }
                if job.status == JobStatus::Starting {
                    job.status = JobStatus::InProgress;
                }
            }
            JobEvent::ItemComplete {
                item_key,
                success,
                payload,
                ..
            } => {
                reject_terminal(job)?;
                let key = normalize_item_key(item_key);
                self.in_flight.remove(&key);
                self.outcomes.insert(key, *success);
                if *success {
                    if let Some(payload) = payload {
                        self.results.upsert(item_key, payload.clone());
                    }
                }
                let successes = self.outcomes.values().filter(|ok| **ok).count() as u64;
                let failures = self.outcomes.len() as u64 - successes;
                merge_counts(job, None, successes, failures, None);
            }
            JobEvent::JobComplete {
                completed,
                failed,
                total,
                ..
            } => {
                if job.status == JobStatus::Failed {
                    return Err(Rejection::Terminal);
                }
                job.completed = *completed;
                job.failed = *failed;
                if total.is_some() {
                    job.total = *total;
                }
                enforce_total(job);
                finish(job, JobStatus::Completed, None);
                self.in_flight.clear();
            }
            JobEvent::JobError { message, .. } => {
                reject_terminal(job)?;
                finish(job, JobStatus::Failed, Some(message.clone()));
                self.in_flight.clear();
            }
        }
        Ok(())
    }

    /// Merge an out-of-band status snapshot with the same rules as push events.
    ///
    /// A terminal snapshot, or one whose counters reach the known total,
    /// finishes the job even if the push notification was lost.
    pub fn reconcile_from_poll(&mut self, snapshot: &PollSnapshot) -> Result<(), Rejection> {
        let job = tracked(&mut self.job, &snapshot.job_id)?;
        reject_terminal(job)?;

        merge_counts(
            job,
            Some(snapshot.progress),
            snapshot.completed,
            snapshot.failed,
            snapshot.total,
        );

        match &snapshot.status {
            PollStatus::Completed => finish(job, JobStatus::Completed, None),
            PollStatus::Failed => finish(
                job,
                JobStatus::Failed,
                Some(
                    snapshot
                        .error
                        .clone()
                        .unwrap_or_else(|| "job failed".to_string()),
                ),
            ),
            status => match job.total {
                Some(total) if total > 0 && job.processed() >= total => {
                    finish(job, JobStatus::Completed, None);
                }
                _ => {
                    if *status == PollStatus::InProgress && job.status == JobStatus::Starting {
                        job.status = JobStatus::InProgress;
                    }
                }
            },
        }
        if job.status.is_terminal() {
            self.in_flight.clear();
        }
        Ok(())
    }
}

fn tracked<'a>(job: &'a mut Option<Job>, job_id: &str) -> Result<&'a mut Job, Rejection> {
    match job {
        None => Err(Rejection::NoJob),
        Some(job) if job.id != job_id => Err(Rejection::StaleJob {
            tracked: job.id.clone(),
            got: job_id.to_string(),
        }),
        Some(job) => Ok(job),
    }
}

fn reject_terminal(job: &Job) -> Result<(), Rejection> {
    if job.status.is_terminal() {
        Err(Rejection::Terminal)
    } else {
        Ok(())
    }
}

fn merge_counts(job: &mut Job, progress: Option<u8>, completed: u64, failed: u64, total: Option<u64>) {
    if let Some(progress) = progress {
        job.progress = job.progress.max(progress.min(100));
    }
    job.completed = job.completed.max(completed);
    job.failed = job.failed.max(failed);
    if total.is_some() {
        job.total = total;
    }
    enforce_total(job);
}

fn enforce_total(job: &mut Job) {
    if let Some(total) = job.total {
        if job.processed() > total {
            watch_warn!(
                "job {} reports {} processed items but total {}; raising total",
                job.id,
                job.processed(),
                total
            );
            job.total = Some(job.processed());
        }
    }
}

fn finish(job: &mut Job, status: JobStatus, error: Option<String>) {
    job.status = status;
    if status == JobStatus::Completed {
        job.progress = 100;
    }
    if error.is_some() {
        job.error = error;
    }
}
