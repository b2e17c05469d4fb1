use std::fmt;
use std::sync::mpsc;

use chrono::{DateTime, Utc};
use thiserror::Error;

pub type JobId = String;

/// Everything the engine reports back to the app loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Established {
        dial_id: u64,
    },
    Inbound {
        dial_id: u64,
        text: String,
        received_at: DateTime<Utc>,
    },
    Lost {
        dial_id: u64,
        code: Option<u16>,
        reason: Option<String>,
    },
    RetryDue {
        generation: u64,
    },
    Submitted {
        result: Result<String, ApiError>,
    },
    PollBody {
        job_id: JobId,
        body: String,
    },
    PollFailed {
        job_id: JobId,
        message: String,
    },
}

/// Receives engine events; implemented over a channel in production and a vec in tests.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelEventSink {
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("invalid address {address}: {message}")]
    InvalidAddress { address: String, message: String },
    #[error("connect timed out after {0} ms")]
    ConnectTimeout(u128),
    #[error("handshake failed: {0}")]
    Handshake(String),
    #[error("channel error: {0}")]
    Channel(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiFailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
}

impl fmt::Display for ApiFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiFailureKind::InvalidUrl => write!(f, "invalid url"),
            ApiFailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            ApiFailureKind::Timeout => write!(f, "timeout"),
            ApiFailureKind::Network => write!(f, "network error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    pub kind: ApiFailureKind,
    pub message: String,
}

impl ApiError {
    pub(crate) fn new(kind: ApiFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to start runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("failed to build http client: {0}")]
    HttpClient(ApiError),
}
