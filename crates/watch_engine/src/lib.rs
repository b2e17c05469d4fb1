mod api;
mod engine;
mod poller;
mod timer;
mod transport;
mod types;

pub use api::{ApiClient, ApiSettings, StatusSource};
pub use engine::{EngineCommand, EngineHandle, EngineSettings};
pub use poller::Poller;
pub use timer::RetryTimer;
pub use transport::{spawn_socket, SocketHandle};
pub use types::{
    ApiError, ApiFailureKind, ChannelEventSink, EngineError, EngineEvent, EventSink, JobId,
    TransportError,
};
