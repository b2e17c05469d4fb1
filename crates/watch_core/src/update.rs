use watch_logging::{watch_debug, watch_info, watch_warn};

use crate::{
    decode, decode_poll_snapshot, decode_submit_response, AppState, Effect, Msg, SendOutcome,
    SubmitResponse,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let was_terminal = job_is_terminal(&state);

    let mut effects = match msg {
        Msg::OpenRequested { address } => {
            state.mark_dirty();
            state.connection_mut().open(&address)
        }
        Msg::CloseRequested => {
            state.mark_dirty();
            state.connection_mut().close()
        }
        Msg::SendRequested { text } => {
            let (outcome, effects) = state.connection().send(text);
            if outcome == SendOutcome::Dropped {
                watch_warn!("outbound message dropped: channel not connected");
            }
            effects
        }
        Msg::Established { dial_id } => {
            state.mark_dirty();
            state.connection_mut().on_established(dial_id)
        }
        Msg::ConnectionLost {
            dial_id,
            code,
            reason,
        } => {
            state.mark_dirty();
            state.connection_mut().on_lost(dial_id, code, reason)
        }
        Msg::RetryDue { generation } => {
            state.mark_dirty();
            state.connection_mut().on_retry_due(generation)
        }
        Msg::Inbound {
            dial_id,
            raw,
            received_at,
        } => {
            apply_inbound(&mut state, dial_id, raw, received_at);
            Vec::new()
        }
        Msg::SubmitRequested { url, max_threads } => {
            let url = url.trim();
            if url.is_empty() {
                Vec::new()
            } else {
                vec![Effect::SubmitJob {
                    url: url.to_string(),
                    max_threads,
                }]
            }
        }
        Msg::SubmitResponded { raw } => match decode_submit_response(&raw) {
            Ok(SubmitResponse::Started { job_id }) => {
                watch_info!("job {} started", job_id);
                state.start_job(job_id.clone(), None);
                vec![Effect::StartPolling { job_id }]
            }
            Ok(SubmitResponse::Rejected { status, message }) => {
                watch_warn!("job submission rejected ({}): {}", status, message);
                state.set_submit_error(message);
                Vec::new()
            }
            Err(failure) => {
                watch_warn!("unreadable submission reply: {}", failure);
                state.set_submit_error(failure.to_string());
                Vec::new()
            }
        },
        Msg::SubmitFailed { message } => {
            watch_warn!("job submission failed: {}", message);
            state.set_submit_error(message);
            Vec::new()
        }
        Msg::PollResponded { job_id, raw } => {
            apply_poll(&mut state, &job_id, &raw);
            Vec::new()
        }
        Msg::PollFailed { job_id, message } => {
            watch_debug!("status poll for {} failed: {}", job_id, message);
            Vec::new()
        }
        Msg::ClearInbound => {
            state.inbound_mut().clear();
            state.mark_dirty();
            Vec::new()
        }
        Msg::Tick => Vec::new(),
    };

    if !was_terminal && job_is_terminal(&state) {
        effects.push(Effect::StopPolling);
    }

    (state, effects)
}

fn job_is_terminal(state: &AppState) -> bool {
    state
        .reconciler()
        .job()
        .is_some_and(|job| job.status.is_terminal())
}

fn apply_inbound(
    state: &mut AppState,
    dial_id: u64,
    raw: String,
    received_at: chrono::DateTime<chrono::Utc>,
) {
    let current = state.connection().current_dial();
    if dial_id != current {
        watch_debug!(
            "dropping frame from stale dial {} (current {}, last sequence {})",
            dial_id,
            current,
            state.inbound().last_sequence()
        );
        return;
    }
    let decoded = decode(&raw);
    let sequence = state.inbound_mut().push(raw, received_at).sequence;

    match decoded {
        Ok(event) => match state.reconciler_mut().apply(&event) {
            Ok(()) => {
                watch_debug!("#{} applied {}", sequence, event.kind());
                state.mark_dirty();
            }
            Err(rejection) => {
                watch_debug!("#{} {} ignored: {}", sequence, event.kind(), rejection);
            }
        },
        Err(failure) => {
            watch_warn!("#{} dropped: {}", sequence, failure);
            state.record_decode_failure(failure);
            state.mark_dirty();
        }
    }
}

fn apply_poll(state: &mut AppState, job_id: &str, raw: &str) {
    let tracked = state.reconciler().job().map(|job| job.id.clone());
    if tracked.as_deref() != Some(job_id) {
        watch_debug!("dropping poll reply for stale job {}", job_id);
        return;
    }
    match decode_poll_snapshot(raw) {
        Ok(snapshot) => match state.reconciler_mut().reconcile_from_poll(&snapshot) {
            Ok(()) => state.mark_dirty(),
            Err(rejection) => watch_debug!("poll snapshot ignored: {}", rejection),
        },
        Err(failure) => {
            watch_warn!("unreadable poll reply: {}", failure);
            state.record_decode_failure(failure);
        }
    }
}
