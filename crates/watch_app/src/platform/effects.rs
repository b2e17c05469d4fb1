use std::time::Duration;

use watch_core::{Effect, Msg};
use watch_engine::{EngineCommand, EngineError, EngineEvent, EngineHandle, EngineSettings};
use watch_logging::watch_info;

/// Executes core effects on the engine and turns engine events into messages.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(settings: EngineSettings) -> Result<Self, EngineError> {
        Ok(Self {
            engine: EngineHandle::new(settings)?,
        })
    }

    pub fn run(&self, effects: Vec<Effect>) {
        for effect in effects {
            if let Effect::SubmitJob { url, max_threads } = &effect {
                watch_info!("SubmitJob url={} max_threads={}", url, max_threads);
            }
            self.engine.send(to_command(effect));
        }
    }

    /// Waits up to `wait` for the next engine event; `Msg::Tick` when none arrives.
    pub fn next_msg(&self, wait: Duration) -> Msg {
        self.engine
            .recv_timeout(wait)
            .map(to_msg)
            .unwrap_or(Msg::Tick)
    }
}

pub fn to_command(effect: Effect) -> EngineCommand {
    match effect {
        Effect::Dial { dial_id, address } => EngineCommand::Dial { dial_id, address },
        Effect::Send { dial_id, text } => EngineCommand::Send { dial_id, text },
        Effect::Disconnect { dial_id, code } => EngineCommand::Disconnect { dial_id, code },
        Effect::ScheduleRetry { generation, delay } => {
            EngineCommand::ScheduleRetry { generation, delay }
        }
        Effect::CancelRetry => EngineCommand::CancelRetry,
        Effect::SubmitJob { url, max_threads } => EngineCommand::Submit { url, max_threads },
        Effect::StartPolling { job_id } => EngineCommand::StartPolling { job_id },
        Effect::StopPolling => EngineCommand::StopPolling,
    }
}

pub fn to_msg(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::Established { dial_id } => Msg::Established { dial_id },
        EngineEvent::Inbound {
            dial_id,
            text,
            received_at,
        } => Msg::Inbound {
            dial_id,
            raw: text,
            received_at,
        },
        EngineEvent::Lost {
            dial_id,
            code,
            reason,
        } => Msg::ConnectionLost {
            dial_id,
            code,
            reason,
        },
        EngineEvent::RetryDue { generation } => Msg::RetryDue { generation },
        EngineEvent::Submitted { result: Ok(raw) } => Msg::SubmitResponded { raw },
        EngineEvent::Submitted { result: Err(err) } => Msg::SubmitFailed {
            message: err.to_string(),
        },
        EngineEvent::PollBody { job_id, body } => Msg::PollResponded { job_id, raw: body },
        EngineEvent::PollFailed { job_id, message } => Msg::PollFailed { job_id, message },
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn retry_effect_keeps_generation_and_delay() {
        let command = to_command(Effect::ScheduleRetry {
            generation: 3,
            delay: Duration::from_millis(4000),
        });
        assert_eq!(
            command,
            EngineCommand::ScheduleRetry {
                generation: 3,
                delay: Duration::from_millis(4000),
            }
        );
    }

    #[test]
    fn submit_effect_becomes_submit_command() {
        let command = to_command(Effect::SubmitJob {
            url: "https://a.com".to_string(),
            max_threads: 5,
        });
        assert_eq!(
            command,
            EngineCommand::Submit {
                url: "https://a.com".to_string(),
                max_threads: 5,
            }
        );
    }

    #[test]
    fn lost_socket_maps_to_connection_lost() {
        let msg = to_msg(EngineEvent::Lost {
            dial_id: 2,
            code: Some(1006),
            reason: Some("reset".to_string()),
        });
        assert_eq!(
            msg,
            Msg::ConnectionLost {
                dial_id: 2,
                code: Some(1006),
                reason: Some("reset".to_string()),
            }
        );
    }

    #[test]
    fn inbound_frame_keeps_its_dial() {
        let received_at = chrono::Utc::now();
        let msg = to_msg(EngineEvent::Inbound {
            dial_id: 4,
            text: "{}".to_string(),
            received_at,
        });
        assert_eq!(
            msg,
            Msg::Inbound {
                dial_id: 4,
                raw: "{}".to_string(),
                received_at,
            }
        );
    }

    #[test]
    fn poll_body_maps_to_poll_response() {
        let msg = to_msg(EngineEvent::PollBody {
            job_id: "J1".to_string(),
            body: "{}".to_string(),
        });
        assert_eq!(
            msg,
            Msg::PollResponded {
                job_id: "J1".to_string(),
                raw: "{}".to_string(),
            }
        );
    }
}
