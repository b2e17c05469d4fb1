use watch_core::{AppViewModel, ConnectionStatus, JobStatus};

pub fn render(view: &AppViewModel) -> String {
    let connection = match view.connection.status {
        ConnectionStatus::Disconnected if view.connection.attempt > 0 => {
            format!("retrying {}", view.connection.attempt)
        }
        ConnectionStatus::Disconnected => "disconnected".to_string(),
        ConnectionStatus::Connecting => "connecting".to_string(),
        ConnectionStatus::Connected => "connected".to_string(),
        ConnectionStatus::Closed => "closed".to_string(),
    };

    let Some(job) = &view.snapshot.job else {
        return match &view.last_submit_error {
            Some(error) => format!("[{connection}] submission failed: {error}"),
            None => format!("[{connection}] no job"),
        };
    };

    let status = match job.status {
        JobStatus::Starting => "starting",
        JobStatus::InProgress => "in progress",
        JobStatus::Completed => "completed",
        JobStatus::Failed => "failed",
    };
    let total = job
        .total
        .map_or_else(|| "?".to_string(), |total| total.to_string());
    let mut line = format!(
        "[{connection}] job {} {status} {:>3}% | {} done, {} failed of {total} | {} results",
        job.id,
        job.progress,
        job.completed,
        job.failed,
        view.snapshot.results.len()
    );
    if let Some(error) = &job.error {
        line.push_str(" | ");
        line.push_str(error);
    }
    line
}
