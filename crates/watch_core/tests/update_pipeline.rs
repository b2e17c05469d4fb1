use std::sync::Once;

use chrono::Utc;
use serde_json::json;
use watch_core::{
    update, AppState, ConnectionStatus, Effect, JobStatus, Msg, MAX_DECODE_FAILURES, RETRY_CEILING,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(watch_logging::initialize_for_tests);
}

fn inbound(state: AppState, raw: impl Into<String>) -> (AppState, Vec<Effect>) {
    let dial_id = state.connection().current_dial();
    update(
        state,
        Msg::Inbound {
            dial_id,
            raw: raw.into(),
            received_at: Utc::now(),
        },
    )
}

fn started(job_id: &str) -> AppState {
    let raw = json!({"status": "started", "job_id": job_id, "message": "ok"}).to_string();
    let (state, effects) = update(AppState::new(), Msg::SubmitResponded { raw });
    assert_eq!(
        effects,
        vec![Effect::StartPolling {
            job_id: job_id.to_string()
        }]
    );
    state
}

#[test]
fn progress_then_complete_scenario() {
    init_logging();
    let state = started("J1");

    let (state, _) = inbound(
        state,
        r#"{"type":"progress_update","job_id":"J1","progress":40,"completed":2,"failed":0}"#,
    );
    let job = state.current_snapshot().job.unwrap();
    assert_eq!(job.progress, 40);
    assert_eq!(job.completed, 2);
    assert_eq!(job.total, None);

    let (state, effects) = inbound(
        state,
        r#"{"type":"job_complete","job_id":"J1","completed":5,"failed":1,"total":6}"#,
    );
    assert_eq!(effects, vec![Effect::StopPolling]);
    let job = state.current_snapshot().job.unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.progress, 100);
    assert_eq!((job.completed, job.failed, job.total), (5, 1, Some(6)));

    let (state, effects) = inbound(
        state,
        r#"{"type":"progress_update","job_id":"J1","progress":10,"completed":1,"failed":4,"total":9}"#,
    );
    assert!(effects.is_empty());
    assert_eq!(state.current_snapshot().job.unwrap(), job);
}

#[test]
fn repeated_url_complete_keeps_latest_payload() {
    init_logging();
    let state = started("J1");
    let first = json!({"type": "url_complete", "job_id": "J1", "success": true, "url": "a.com", "data": {"v": 1}});
    let second = json!({"type": "url_complete", "job_id": "J1", "success": true, "url": "a.com", "data": {"v": 2}});

    let (state, _) = inbound(state, first.to_string());
    let (state, _) = inbound(state, second.to_string());

    let snapshot = state.current_snapshot();
    assert_eq!(snapshot.results.len(), 1);
    assert_eq!(snapshot.results[0].item_key, "a.com");
    assert_eq!(snapshot.results[0].payload, json!({"v": 2}));
}

#[test]
fn event_for_replaced_job_is_dropped() {
    init_logging();
    let state = started("J_old");
    let raw = json!({"status": "started", "job_id": "J_new"}).to_string();
    let (state, _) = update(state, Msg::SubmitResponded { raw });

    let (state, _) = inbound(
        state,
        r#"{"type":"progress_update","job_id":"J_old","progress":90,"completed":9,"failed":0,"total":10}"#,
    );

    let job = state.current_snapshot().job.unwrap();
    assert_eq!(job.id, "J_new");
    assert_eq!(job.progress, 0);
    assert_eq!(job.total, None);
}

#[test]
fn start_job_resets_inbound_view() {
    init_logging();
    let state = started("J1");
    let (state, _) = inbound(state, r#"{"type":"job_complete","job_id":"J1","completed":1,"failed":0}"#);
    assert_eq!(state.inbound().view().len(), 1);

    let raw = json!({"status": "started", "job_id": "J2"}).to_string();
    let (state, _) = update(state, Msg::SubmitResponded { raw });

    assert!(state.inbound().view().is_empty());
    assert_eq!(state.inbound().len(), 1);
    assert_eq!(state.inbound().replay_from(1)[0].sequence, 1);
}

#[test]
fn garbage_frames_are_recorded_and_pipeline_continues() {
    init_logging();
    let state = started("J1");

    let (state, _) = inbound(state, "{{{");
    let (state, _) = inbound(state, r#"{"type":"mystery","job_id":"J1"}"#);
    let (state, _) = inbound(
        state,
        r#"{"type":"progress_update","job_id":"J1","progress":30,"completed":3,"failed":0}"#,
    );

    assert_eq!(state.decode_failure_count(), 2);
    assert_eq!(state.inbound().len(), 3);
    assert_eq!(state.current_snapshot().job.unwrap().progress, 30);
}

#[test]
fn decode_diagnostics_are_bounded() {
    init_logging();
    let mut state = AppState::new();
    for _ in 0..MAX_DECODE_FAILURES + 5 {
        state = inbound(state, "nope").0;
    }

    assert_eq!(state.view().recent_decode_failures.len(), MAX_DECODE_FAILURES);
    assert_eq!(state.decode_failure_count(), (MAX_DECODE_FAILURES + 5) as u64);
}

#[test]
fn inbound_sequences_follow_arrival_order() {
    init_logging();
    let mut state = started("J1");
    for pct in [10, 20, 30] {
        let raw = json!({"type": "progress_update", "job_id": "J1", "progress": pct, "completed": 0, "failed": 0});
        state = inbound(state, raw.to_string()).0;
    }

    let sequences: Vec<_> = state.inbound().iter().map(|msg| msg.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3]);

    let (state, _) = update(state, Msg::ClearInbound);
    assert!(state.inbound().is_empty());
}

#[test]
fn poll_reply_completes_job_and_stops_polling() {
    init_logging();
    let state = started("J1");
    let raw = json!({
        "id": "J1",
        "status": "completed",
        "progress": 100,
        "total_urls": 2,
        "completed_urls": 2,
        "failed_urls": 0,
    })
    .to_string();

    let (state, effects) = update(
        state,
        Msg::PollResponded {
            job_id: "J1".to_string(),
            raw,
        },
    );

    assert_eq!(effects, vec![Effect::StopPolling]);
    assert_eq!(
        state.current_snapshot().job.unwrap().status,
        JobStatus::Completed
    );
}

#[test]
fn poll_reply_for_old_job_is_ignored() {
    init_logging();
    let state = started("J2");
    let raw = json!({"id": "J1", "status": "completed"}).to_string();

    let (state, effects) = update(
        state,
        Msg::PollResponded {
            job_id: "J1".to_string(),
            raw,
        },
    );

    assert!(effects.is_empty());
    assert_eq!(
        state.current_snapshot().job.unwrap().status,
        JobStatus::Starting
    );
}

#[test]
fn rejected_submission_tracks_nothing() {
    init_logging();
    let raw = json!({"status": "error", "job_id": "", "message": "Please upload a CSV file"}).to_string();

    let (state, effects) = update(AppState::new(), Msg::SubmitResponded { raw });

    assert!(effects.is_empty());
    let view = state.view();
    assert!(view.snapshot.job.is_none());
    assert_eq!(
        view.last_submit_error.as_deref(),
        Some("Please upload a CSV file")
    );
}

#[test]
fn submit_request_emits_effect_for_non_empty_url() {
    init_logging();
    let (state, effects) = update(
        AppState::new(),
        Msg::SubmitRequested {
            url: "  https://a.com ".to_string(),
            max_threads: 5,
        },
    );
    assert_eq!(
        effects,
        vec![Effect::SubmitJob {
            url: "https://a.com".to_string(),
            max_threads: 5,
        }]
    );

    let (_, effects) = update(
        state,
        Msg::SubmitRequested {
            url: "   ".to_string(),
            max_threads: 5,
        },
    );
    assert!(effects.is_empty());
}

#[test]
fn connection_messages_drive_the_machine() {
    init_logging();
    let (state, effects) = update(
        AppState::new(),
        Msg::OpenRequested {
            address: "ws://localhost:8001/ws".to_string(),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::Dial {
            dial_id: 1,
            address: "ws://localhost:8001/ws".to_string(),
        }]
    );

    let (state, _) = update(state, Msg::Established { dial_id: 1 });
    assert_eq!(state.view().connection.status, ConnectionStatus::Connected);

    let (state, effects) = update(
        state,
        Msg::SendRequested {
            text: "ping".to_string(),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::Send {
            dial_id: 1,
            text: "ping".to_string(),
        }]
    );

    let (state, effects) = update(
        state,
        Msg::ConnectionLost {
            dial_id: 1,
            code: None,
            reason: Some("reset by peer".to_string()),
        },
    );
    assert!(matches!(effects.as_slice(), [Effect::ScheduleRetry { .. }]));

    let (mut state, effects) = update(state, Msg::CloseRequested);
    assert_eq!(effects, vec![Effect::CancelRetry]);
    assert_eq!(state.view().connection.status, ConnectionStatus::Closed);
    assert!(state.consume_dirty());
}

fn dialed(effects: &[Effect]) -> u64 {
    effects
        .iter()
        .find_map(|effect| match effect {
            Effect::Dial { dial_id, .. } => Some(*dial_id),
            _ => None,
        })
        .expect("a dial effect")
}

#[test]
fn frames_from_a_superseded_dial_are_dropped() {
    init_logging();
    let state = started("J1");
    let (state, effects) = update(
        state,
        Msg::OpenRequested {
            address: "ws://a/ws".to_string(),
        },
    );
    let old_dial = dialed(&effects);
    let (state, _) = update(state, Msg::Established { dial_id: old_dial });
    let (state, _) = inbound(
        state,
        r#"{"type":"progress_update","job_id":"J1","progress":20,"completed":1,"failed":0}"#,
    );
    let sequence_before = state.inbound().last_sequence();

    let (state, effects) = update(
        state,
        Msg::OpenRequested {
            address: "ws://b/ws".to_string(),
        },
    );
    let new_dial = dialed(&effects);
    assert_ne!(new_dial, old_dial);
    assert_eq!(state.connection().current_dial(), new_dial);

    let (state, _) = update(
        state,
        Msg::Inbound {
            dial_id: old_dial,
            raw: r#"{"type":"progress_update","job_id":"J1","progress":70,"completed":4,"failed":0}"#
                .to_string(),
            received_at: Utc::now(),
        },
    );
    let job = state.current_snapshot().job.unwrap();
    assert_eq!(job.progress, 20);
    assert_eq!(job.completed, 1);
    assert_eq!(state.inbound().last_sequence(), sequence_before);

    let (state, _) = update(state, Msg::Established { dial_id: new_dial });
    let (state, _) = inbound(
        state,
        r#"{"type":"progress_update","job_id":"J1","progress":70,"completed":4,"failed":0}"#,
    );
    assert_eq!(state.current_snapshot().job.unwrap().progress, 70);
    assert_eq!(state.inbound().last_sequence(), sequence_before + 1);
}

#[test]
fn poll_finishes_the_job_after_the_channel_gives_up() {
    init_logging();
    let state = started("J1");
    let (mut state, mut effects) = update(
        state,
        Msg::OpenRequested {
            address: "ws://localhost:8001/ws".to_string(),
        },
    );

    for _ in 0..=RETRY_CEILING {
        let dial_id = dialed(&effects);
        let (next, lost) = update(
            state,
            Msg::ConnectionLost {
                dial_id,
                code: None,
                reason: Some("connection refused".to_string()),
            },
        );
        state = next;
        effects = match lost.as_slice() {
            [Effect::ScheduleRetry { generation, .. }] => {
                let (next, retry) = update(
                    state,
                    Msg::RetryDue {
                        generation: *generation,
                    },
                );
                state = next;
                retry
            }
            _ => Vec::new(),
        };
    }
    let view = state.view();
    assert_eq!(view.connection.status, ConnectionStatus::Closed);
    assert_eq!(view.connection.attempt, RETRY_CEILING);

    let (state, effects) = update(
        state,
        Msg::PollResponded {
            job_id: "J1".to_string(),
            raw: r#"{"id":"J1","status":"completed","completed_urls":2,"failed_urls":0,"total_urls":2}"#
                .to_string(),
        },
    );
    assert_eq!(effects, vec![Effect::StopPolling]);
    let job = state.current_snapshot().job.unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!((job.completed, job.total), (2, Some(2)));
}
