use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::{JobEvent, PollSnapshot, PollStatus, SubmitResponse};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeFailure {
    #[error("invalid json: {0}")]
    NotJson(String),
    #[error("expected a json object")]
    NotAnObject,
    #[error("missing `type` discriminator")]
    MissingType,
    #[error("unknown message type `{0}`")]
    UnknownType(String),
    #[error("malformed `{kind}` message: {message}")]
    Malformed { kind: String, message: String },
    #[error("remote reported an error: {0}")]
    Remote(String),
}

#[derive(Deserialize)]
struct ProgressWire {
    job_id: String,
    progress: f64,
    completed: u64,
    failed: u64,
    #[serde(default)]
    total: Option<u64>,
}

#[derive(Deserialize)]
struct ItemStartWire {
    job_id: String,
    url: String,
    #[serde(default)]
    index: Option<u64>,
}

#[derive(Deserialize)]
struct ItemCompleteWire {
    job_id: String,
    url: String,
    success: bool,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct ItemErrorWire {
    job_id: String,
    url: String,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct JobCompleteWire {
    job_id: String,
    completed: u64,
    failed: u64,
    #[serde(default)]
    total: Option<u64>,
}

#[derive(Deserialize)]
struct JobErrorWire {
    job_id: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Decode one inbound transport frame into a typed event.
///
/// Pure: the caller decides what to do with a failure (the app loop records
/// and drops it).
pub fn decode(raw: &str) -> Result<JobEvent, DecodeFailure> {
    let value = parse_object(raw)?;
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(DecodeFailure::MissingType)?
        .to_string();

    match kind.as_str() {
        "progress_update" => {
            let wire: ProgressWire = from_value(&kind, value)?;
            Ok(JobEvent::ProgressUpdate {
                job_id: wire.job_id,
                progress: clamp_progress(wire.progress),
                completed: wire.completed,
                failed: wire.failed,
                total: wire.total,
            })
        }
        "url_start" => {
            let wire: ItemStartWire = from_value(&kind, value)?;
            Ok(JobEvent::ItemStarted {
                job_id: wire.job_id,
                item_key: wire.url,
                index: wire.index,
            })
        }
        "url_complete" => {
            let wire: ItemCompleteWire = from_value(&kind, value)?;
            Ok(JobEvent::ItemComplete {
                job_id: wire.job_id,
                item_key: wire.url,
                success: wire.success,
                payload: wire.data.filter(|data| !data.is_null()),
                error: wire.error,
            })
        }
        "url_error" => {
            let wire: ItemErrorWire = from_value(&kind, value)?;
            Ok(JobEvent::ItemComplete {
                job_id: wire.job_id,
                item_key: wire.url,
                success: false,
                payload: None,
                error: wire.error,
            })
        }
        "job_complete" => {
            let wire: JobCompleteWire = from_value(&kind, value)?;
            Ok(JobEvent::JobComplete {
                job_id: wire.job_id,
                completed: wire.completed,
                failed: wire.failed,
                total: wire.total,
            })
        }
        "job_error" => {
            let wire: JobErrorWire = from_value(&kind, value)?;
            Ok(JobEvent::JobError {
                job_id: wire.job_id,
                message: wire
                    .message
                    .or(wire.error)
                    .unwrap_or_else(|| "job failed".to_string()),
            })
        }
        _ => Err(DecodeFailure::UnknownType(kind)),
    }
}

#[derive(Deserialize)]
struct PollWire {
    #[serde(alias = "job_id")]
    id: String,
    status: String,
    #[serde(default)]
    progress: f64,
    #[serde(default, alias = "completed")]
    completed_urls: u64,
    #[serde(default, alias = "failed")]
    failed_urls: u64,
    #[serde(default, alias = "total")]
    total_urls: Option<u64>,
    #[serde(default)]
    error: Option<String>,
}

/// Decode the body returned by the status-poll collaborator.
///
/// The server stores `total_urls = 0` until the job has been counted, so a
/// zero total is reported as unknown.
pub fn decode_poll_snapshot(raw: &str) -> Result<PollSnapshot, DecodeFailure> {
    let value = parse_object(raw)?;
    if value.get("status").is_none() {
        if let Some(error) = value.get("error").and_then(Value::as_str) {
            return Err(DecodeFailure::Remote(error.to_string()));
        }
    }
    let wire: PollWire = from_value("poll_snapshot", value)?;
    Ok(PollSnapshot {
        job_id: wire.id,
        status: PollStatus::parse(&wire.status),
        progress: clamp_progress(wire.progress),
        completed: wire.completed_urls,
        failed: wire.failed_urls,
        total: wire.total_urls.filter(|total| *total > 0),
        error: wire.error,
    })
}

#[derive(Deserialize)]
struct SubmitWire {
    status: String,
    #[serde(default)]
    job_id: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Decode the reply of the job-submission collaborator.
pub fn decode_submit_response(raw: &str) -> Result<SubmitResponse, DecodeFailure> {
    let value = parse_object(raw)?;
    let wire: SubmitWire = from_value("submit_response", value)?;
    let job_id = wire.job_id.filter(|id| !id.trim().is_empty());
    match (wire.status.as_str(), job_id) {
        ("started", Some(job_id)) => Ok(SubmitResponse::Started { job_id }),
        _ => Ok(SubmitResponse::Rejected {
            message: wire
                .message
                .unwrap_or_else(|| format!("job submission returned `{}`", wire.status)),
            status: wire.status,
        }),
    }
}

fn parse_object(raw: &str) -> Result<Value, DecodeFailure> {
    let value: Value =
        serde_json::from_str(raw).map_err(|err| DecodeFailure::NotJson(err.to_string()))?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(DecodeFailure::NotAnObject)
    }
}

fn from_value<T: for<'de> Deserialize<'de>>(kind: &str, value: Value) -> Result<T, DecodeFailure> {
    serde_json::from_value(value).map_err(|err| DecodeFailure::Malformed {
        kind: kind.to_string(),
        message: err.to_string(),
    })
}

fn clamp_progress(progress: f64) -> u8 {
    if progress.is_nan() {
        return 0;
    }
    progress.clamp(0.0, 100.0) as u8
}
