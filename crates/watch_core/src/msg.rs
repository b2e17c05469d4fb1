use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Consumer asked for the push channel at `address`.
    OpenRequested { address: String },
    /// Consumer closed the push channel.
    CloseRequested,
    /// Consumer wants a text frame sent upstream.
    SendRequested { text: String },
    /// Channel handshake finished.
    Established { dial_id: u64 },
    /// Text frame received on the push channel by dial `dial_id`.
    Inbound {
        dial_id: u64,
        raw: String,
        received_at: DateTime<Utc>,
    },
    /// Physical channel closed or failed to open.
    ConnectionLost {
        dial_id: u64,
        code: Option<u16>,
        reason: Option<String>,
    },
    /// Reconnect timer fired.
    RetryDue { generation: u64 },
    /// Consumer submitted a URL for scraping.
    SubmitRequested { url: String, max_threads: u32 },
    /// Submission collaborator answered.
    SubmitResponded { raw: String },
    /// Submission request never got an answer.
    SubmitFailed { message: String },
    /// Status poll answered for `job_id`.
    PollResponded { job_id: crate::JobId, raw: String },
    /// Status poll request failed.
    PollFailed {
        job_id: crate::JobId,
        message: String,
    },
    /// Consumer asked to drop the inbound log.
    ClearInbound,
    /// Render tick.
    Tick,
}
