use std::collections::HashMap;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use watch_logging::{watch_debug, watch_warn};

use crate::api::{ApiClient, ApiSettings, StatusSource};
use crate::poller::Poller;
use crate::timer::RetryTimer;
use crate::transport::{spawn_socket, SocketHandle};
use crate::{ChannelEventSink, EngineError, EngineEvent, EventSink, JobId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
    Dial { dial_id: u64, address: String },
    Send { dial_id: u64, text: String },
    Disconnect { dial_id: u64, code: u16 },
    ScheduleRetry { generation: u64, delay: Duration },
    CancelRetry,
    Submit { url: String, max_threads: u32 },
    StartPolling { job_id: JobId },
    StopPolling,
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub connect_timeout: Duration,
    pub poll_interval: Duration,
    pub api: ApiSettings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_secs(5),
            api: ApiSettings::default(),
        }
    }
}

/// Runs all IO on a dedicated thread with its own tokio runtime. The caller
/// talks to it through commands and drains events at its own pace.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(settings: EngineSettings) -> Result<Self, EngineError> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let api = ApiClient::new(settings.api.clone()).map_err(EngineError::HttpClient)?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        let sink: Arc<dyn EventSink> = Arc::new(ChannelEventSink::new(event_tx));

        thread::spawn(move || {
            let _guard = runtime.enter();
            let mut dispatcher = Dispatcher::new(settings, api, sink);
            while let Ok(command) = cmd_rx.recv() {
                dispatcher.handle(command);
            }
            dispatcher.shutdown();
        });

        Ok(Self { cmd_tx, event_rx })
    }

    pub fn send(&self, command: EngineCommand) {
        let _ = self.cmd_tx.send(command);
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

struct Dispatcher {
    settings: EngineSettings,
    api: Arc<ApiClient>,
    sink: Arc<dyn EventSink>,
    sockets: HashMap<u64, SocketHandle>,
    timer: RetryTimer,
    poller: Poller,
}

impl Dispatcher {
    fn new(settings: EngineSettings, api: ApiClient, sink: Arc<dyn EventSink>) -> Self {
        Self {
            settings,
            api: Arc::new(api),
            sink,
            sockets: HashMap::new(),
            timer: RetryTimer::new(),
            poller: Poller::new(),
        }
    }

    fn handle(&mut self, command: EngineCommand) {
        self.sockets.retain(|_, socket| !socket.is_finished());
        match command {
            EngineCommand::Dial { dial_id, address } => {
                watch_debug!("dialing {} as dial {}", address, dial_id);
                let socket = spawn_socket(
                    dial_id,
                    address,
                    self.settings.connect_timeout,
                    self.sink.clone(),
                );
                if let Some(previous) = self.sockets.insert(socket.dial_id(), socket) {
                    previous.abort();
                }
            }
            EngineCommand::Send { dial_id, text } => match self.sockets.get(&dial_id) {
                Some(socket) if socket.send_text(text) => {}
                _ => watch_warn!("dial {} is gone; outbound frame dropped", dial_id),
            },
            EngineCommand::Disconnect { dial_id, code } => {
                if let Some(socket) = self.sockets.get(&dial_id) {
                    socket.close(code);
                }
            }
            EngineCommand::ScheduleRetry { generation, delay } => {
                self.timer.schedule(generation, delay, self.sink.clone());
            }
            EngineCommand::CancelRetry => self.timer.cancel(),
            EngineCommand::Submit { url, max_threads } => {
                let api = self.api.clone();
                let sink = self.sink.clone();
                tokio::spawn(async move {
                    let result = api.submit(&url, max_threads).await;
                    sink.emit(EngineEvent::Submitted { result });
                });
            }
            EngineCommand::StartPolling { job_id } => {
                let source: Arc<dyn StatusSource> = self.api.clone();
                self.poller.start(
                    job_id,
                    self.settings.poll_interval,
                    source,
                    self.sink.clone(),
                );
            }
            EngineCommand::StopPolling => self.poller.stop(),
        }
    }

    fn shutdown(&mut self) {
        self.timer.cancel();
        self.poller.stop();
        for socket in self.sockets.values() {
            socket.abort();
        }
        self.sockets.clear();
    }
}
