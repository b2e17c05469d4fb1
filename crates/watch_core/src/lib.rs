//! Scrape watch core: pure connection and job state machines.
mod connection;
mod decode;
mod effect;
mod event;
mod inbound;
mod job;
mod msg;
mod reconcile;
mod results;
mod state;
mod update;
mod view_model;

pub use connection::{
    backoff_delay, Connection, ConnectionStatus, PendingRetry, SendOutcome, BACKOFF_BASE,
    MANUAL_CLOSE_CODE, RETRY_CEILING,
};
pub use decode::{decode, decode_poll_snapshot, decode_submit_response, DecodeFailure};
pub use effect::Effect;
pub use event::{JobEvent, JobId, PollSnapshot, PollStatus, SubmitResponse};
pub use inbound::{InboundLog, InboundMessage};
pub use job::{Job, JobStatus};
pub use msg::Msg;
pub use reconcile::{Reconciler, Rejection};
pub use results::{normalize_item_key, ResultEntry, ResultIndex};
pub use state::{AppState, MAX_DECODE_FAILURES};
pub use update::update;
pub use view_model::{AppViewModel, ConnectionView, JobSnapshot};
