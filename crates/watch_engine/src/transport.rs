use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use watch_logging::{watch_debug, watch_info, watch_warn};

use crate::{EngineEvent, EventSink, TransportError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug)]
enum Outbound {
    Text(String),
    Close(u16),
}

/// One physical WebSocket, driven by its own task.
///
/// Every event it reports carries `dial_id`; the core discards events from
/// dials it no longer owns.
pub struct SocketHandle {
    dial_id: u64,
    outbound: mpsc::UnboundedSender<Outbound>,
    task: JoinHandle<()>,
}

impl SocketHandle {
    pub fn dial_id(&self) -> u64 {
        self.dial_id
    }

    /// Queue a text frame. Returns false if the socket task already ended.
    pub fn send_text(&self, text: String) -> bool {
        self.outbound.send(Outbound::Text(text)).is_ok()
    }

    /// Ask the socket to send a close frame with `code` and stop.
    pub fn close(&self, code: u16) {
        let _ = self.outbound.send(Outbound::Close(code));
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn abort(&self) {
        self.task.abort();
    }
}

/// Spawn a socket task on the current tokio runtime.
pub fn spawn_socket(
    dial_id: u64,
    address: String,
    connect_timeout: Duration,
    sink: Arc<dyn EventSink>,
) -> SocketHandle {
    let (outbound, outbound_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(async move {
        match connect(&address, connect_timeout).await {
            Ok(stream) => {
                watch_info!("dial {} established to {}", dial_id, address);
                sink.emit(EngineEvent::Established { dial_id });
                run_socket(dial_id, stream, outbound_rx, sink.as_ref()).await;
            }
            Err(err) => {
                watch_warn!("dial {} to {} failed: {}", dial_id, address, err);
                sink.emit(EngineEvent::Lost {
                    dial_id,
                    code: None,
                    reason: Some(err.to_string()),
                });
            }
        }
    });
    SocketHandle {
        dial_id,
        outbound,
        task,
    }
}

async fn connect(address: &str, connect_timeout: Duration) -> Result<WsStream, TransportError> {
    match tokio::time::timeout(connect_timeout, connect_async(address)).await {
        Ok(Ok((stream, _response))) => Ok(stream),
        Ok(Err(err)) => Err(map_connect_error(address, err)),
        Err(_) => Err(TransportError::ConnectTimeout(connect_timeout.as_millis())),
    }
}

fn map_connect_error(address: &str, err: tungstenite::Error) -> TransportError {
    match err {
        tungstenite::Error::Url(url_err) => TransportError::InvalidAddress {
            address: address.to_string(),
            message: url_err.to_string(),
        },
        tungstenite::Error::Http(response) => {
            TransportError::Handshake(format!("http status {}", response.status()))
        }
        tungstenite::Error::Io(io_err) => TransportError::Channel(io_err.to_string()),
        other => TransportError::Handshake(other.to_string()),
    }
}

async fn run_socket(
    dial_id: u64,
    stream: WsStream,
    mut outbound_rx: mpsc::UnboundedReceiver<Outbound>,
    sink: &dyn EventSink,
) {
    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            command = outbound_rx.recv() => {
                match command {
                    Some(Outbound::Text(text)) => {
                        if let Err(err) = write.send(Message::Text(text.into())).await {
                            emit_lost(sink, dial_id, TransportError::Channel(err.to_string()));
                            return;
                        }
                    }
                    Some(Outbound::Close(code)) => {
                        let frame = CloseFrame {
                            code: CloseCode::from(code),
                            reason: "".into(),
                        };
                        let _ = write.send(Message::Close(Some(frame))).await;
                        let _ = write.close().await;
                        watch_debug!("dial {} closed locally with code {}", dial_id, code);
                        sink.emit(EngineEvent::Lost {
                            dial_id,
                            code: Some(code),
                            reason: None,
                        });
                        return;
                    }
                    None => {
                        let _ = write.close().await;
                        return;
                    }
                }
            }
            frame = read.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        sink.emit(EngineEvent::Inbound {
                            dial_id,
                            text: text.as_str().to_owned(),
                            received_at: Utc::now(),
                        });
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = match frame {
                            Some(frame) => (
                                Some(u16::from(frame.code)),
                                Some(frame.reason.as_str().to_owned()).filter(|r| !r.is_empty()),
                            ),
                            None => (None, None),
                        };
                        watch_info!("dial {} closed by peer (code {:?})", dial_id, code);
                        sink.emit(EngineEvent::Lost { dial_id, code, reason });
                        return;
                    }
                    Some(Ok(_)) => {} // Ping/Pong/Binary: tungstenite answers pings itself.
                    Some(Err(err)) => {
                        emit_lost(sink, dial_id, TransportError::Channel(err.to_string()));
                        return;
                    }
                    None => {
                        emit_lost(sink, dial_id, TransportError::Channel("stream ended".to_string()));
                        return;
                    }
                }
            }
        }
    }
}

fn emit_lost(sink: &dyn EventSink, dial_id: u64, err: TransportError) {
    watch_warn!("dial {} lost: {}", dial_id, err);
    sink.emit(EngineEvent::Lost {
        dial_id,
        code: None,
        reason: Some(err.to_string()),
    });
}
