use std::time::Duration;

/// IO requested by the core; executed by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Open a physical channel. `dial_id` tags every event the channel reports.
    Dial { dial_id: u64, address: String },
    Send { dial_id: u64, text: String },
    Disconnect { dial_id: u64, code: u16 },
    /// Arm the single retry timer, replacing any previous one.
    ScheduleRetry { generation: u64, delay: Duration },
    CancelRetry,
    SubmitJob { url: String, max_threads: u32 },
    StartPolling { job_id: crate::JobId },
    StopPolling,
}
