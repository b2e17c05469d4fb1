use std::time::Duration;

use watch_logging::{watch_debug, watch_info, watch_warn};

use crate::Effect;

/// Close code of a deliberate, non-retrying close.
pub const MANUAL_CLOSE_CODE: u16 = 1000;
/// Reconnect attempts allowed before the session gives up.
pub const RETRY_CEILING: u32 = 5;
pub const BACKOFF_BASE: Duration = Duration::from_millis(1000);

/// Delay before reconnect attempt `attempt + 1`: 1s, 2s, 4s, 8s, 16s.
pub fn backoff_delay(attempt: u32) -> Duration {
    BACKOFF_BASE * 2u32.saturating_pow(attempt.min(RETRY_CEILING))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingRetry {
    pub generation: u64,
    pub delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Queued,
    Dropped,
}

/// Logical push channel kept alive over an unreliable physical one.
///
/// Holds no IO: every transition returns the effects the engine must run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Connection {
    address: Option<String>,
    status: ConnectionStatus,
    attempt: u32,
    last_error: Option<String>,
    pending_retry: Option<PendingRetry>,
    manual_close: bool,
    dial_id: u64,
    generation: u64,
    session: u64,
}

impl Connection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Dial whose events and frames belong to the current session.
    pub fn current_dial(&self) -> u64 {
        self.dial_id
    }

    pub fn pending_retry(&self) -> Option<PendingRetry> {
        self.pending_retry
    }

    /// Number of logical sessions started so far.
    pub fn session(&self) -> u64 {
        self.session
    }

    pub fn open(&mut self, address: &str) -> Vec<Effect> {
        let address = address.trim();
        if address.is_empty() {
            watch_warn!("open rejected: empty address");
            self.last_error = Some("address must not be empty".to_string());
            return Vec::new();
        }

        let same_address = self.address.as_deref() == Some(address);
        match self.status {
            ConnectionStatus::Connecting | ConnectionStatus::Connected if same_address => {
                Vec::new()
            }
            ConnectionStatus::Disconnected if same_address => {
                // Retry pending or previous dial failed: dial now, keep the attempt count.
                let mut effects = Vec::new();
                if self.pending_retry.take().is_some() {
                    effects.push(Effect::CancelRetry);
                }
                effects.push(self.dial());
                effects
            }
            ConnectionStatus::Connecting | ConnectionStatus::Connected => {
                let mut effects = vec![Effect::Disconnect {
                    dial_id: self.dial_id,
                    code: MANUAL_CLOSE_CODE,
                }];
                effects.extend(self.start_session(address));
                effects
            }
            ConnectionStatus::Disconnected | ConnectionStatus::Closed => {
                self.start_session(address)
            }
        }
    }

    fn start_session(&mut self, address: &str) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.pending_retry.take().is_some() {
            effects.push(Effect::CancelRetry);
        }
        self.session += 1;
        self.address = Some(address.to_string());
        self.attempt = 0;
        self.manual_close = false;
        self.last_error = None;
        watch_info!("session {} opening {}", self.session, address);
        effects.push(self.dial());
        effects
    }

    fn dial(&mut self) -> Effect {
        self.dial_id += 1;
        self.status = ConnectionStatus::Connecting;
        Effect::Dial {
            dial_id: self.dial_id,
            address: self.address.clone().unwrap_or_default(),
        }
    }

    pub fn on_established(&mut self, dial_id: u64) -> Vec<Effect> {
        if dial_id != self.dial_id {
            watch_debug!("ignoring establish from stale dial {}", dial_id);
            return vec![Effect::Disconnect {
                dial_id,
                code: MANUAL_CLOSE_CODE,
            }];
        }
        if self.status != ConnectionStatus::Connecting {
            // Closed while the handshake was in flight.
            return vec![Effect::Disconnect {
                dial_id,
                code: MANUAL_CLOSE_CODE,
            }];
        }
        self.status = ConnectionStatus::Connected;
        self.attempt = 0;
        self.last_error = None;
        watch_info!("connected to {}", self.address.as_deref().unwrap_or(""));
        if self.pending_retry.take().is_some() {
            vec![Effect::CancelRetry]
        } else {
            Vec::new()
        }
    }

    pub fn on_lost(&mut self, dial_id: u64, code: Option<u16>, reason: Option<String>) -> Vec<Effect> {
        if dial_id != self.dial_id {
            watch_debug!("ignoring loss from stale dial {}", dial_id);
            return Vec::new();
        }
        if matches!(
            self.status,
            ConnectionStatus::Closed | ConnectionStatus::Disconnected
        ) {
            return Vec::new();
        }
        if let Some(reason) = reason {
            self.last_error = Some(reason);
        }

        if self.manual_close || code == Some(MANUAL_CLOSE_CODE) {
            watch_info!("channel closed deliberately");
            self.status = ConnectionStatus::Closed;
            self.pending_retry = None;
            return Vec::new();
        }

        if self.attempt < RETRY_CEILING {
            let delay = backoff_delay(self.attempt);
            self.attempt += 1;
            self.generation += 1;
            self.status = ConnectionStatus::Disconnected;
            self.pending_retry = Some(PendingRetry {
                generation: self.generation,
                delay,
            });
            watch_warn!(
                "channel lost (code {:?}), retry {}/{} in {} ms",
                code,
                self.attempt,
                RETRY_CEILING,
                delay.as_millis()
            );
            vec![Effect::ScheduleRetry {
                generation: self.generation,
                delay,
            }]
        } else {
            let cause = self.last_error.take().unwrap_or_else(|| "channel lost".into());
            self.last_error = Some(format!(
                "gave up after {RETRY_CEILING} reconnect attempts: {cause}"
            ));
            self.status = ConnectionStatus::Closed;
            self.pending_retry = None;
            watch_warn!("{}", self.last_error.as_deref().unwrap_or(""));
            Vec::new()
        }
    }

    pub fn on_retry_due(&mut self, generation: u64) -> Vec<Effect> {
        match self.pending_retry {
            Some(pending) if pending.generation == generation => {
                self.pending_retry = None;
                vec![self.dial()]
            }
            _ => {
                watch_debug!("ignoring stale retry timer {}", generation);
                Vec::new()
            }
        }
    }

    pub fn send(&self, text: impl Into<String>) -> (SendOutcome, Vec<Effect>) {
        if self.status == ConnectionStatus::Connected {
            (
                SendOutcome::Queued,
                vec![Effect::Send {
                    dial_id: self.dial_id,
                    text: text.into(),
                }],
            )
        } else {
            watch_debug!("send dropped while {:?}", self.status);
            (SendOutcome::Dropped, Vec::new())
        }
    }

    pub fn close(&mut self) -> Vec<Effect> {
        self.manual_close = true;
        let mut effects = Vec::new();
        if self.pending_retry.take().is_some() {
            effects.push(Effect::CancelRetry);
        }
        if matches!(
            self.status,
            ConnectionStatus::Connecting | ConnectionStatus::Connected
        ) {
            effects.push(Effect::Disconnect {
                dial_id: self.dial_id,
                code: MANUAL_CLOSE_CODE,
            });
        }
        if self.address.is_some() {
            self.status = ConnectionStatus::Closed;
        }
        effects
    }
}
