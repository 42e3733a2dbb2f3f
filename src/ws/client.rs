//! Single-session WebSocket client

use super::types::{WsConfig, WsError, WsMessage};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{
    connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket client with ping/pong keepalive
///
/// Each call to [`WsClient::connect`] opens one session. Reconnection is left
/// to the caller so it can apply its own backoff policy.
pub struct WsClient {
    config: WsConfig,
}

impl WsClient {
    /// Create a new WebSocket client with the given configuration
    pub fn new(config: WsConfig) -> Self {
        Self { config }
    }

    /// Create a new client with just a URL using default config
    pub fn with_url(url: impl Into<String>) -> Self {
        Self::new(WsConfig::new(url))
    }

    /// Get the configured URL
    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Perform the handshake and start streaming in a background task
    pub async fn connect(&self) -> Result<WsConnection, WsError> {
        tracing::info!(url = %self.config.url, "Connecting to WebSocket");

        let (socket, _response) =
            tokio::time::timeout(self.config.connect_timeout, connect_async(&self.config.url))
                .await
                .map_err(|_| WsError::Timeout(self.config.connect_timeout))?
                .map_err(|e| WsError::ConnectionFailed(e.to_string()))?;

        tracing::info!("WebSocket connected");

        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        let config = self.config.clone();
        let task = tokio::spawn(async move {
            let terminal = match Self::stream(socket, &config, &tx).await {
                Ok(Some(closed)) => closed,
                Ok(None) => return,
                Err(e) => WsMessage::Error(e),
            };
            let _ = tx.send(terminal).await;
        });

        Ok(WsConnection::new(rx, Some(task)))
    }

    /// Forward frames until the session ends
    ///
    /// Returns `Ok(None)` when the receiver was dropped.
    async fn stream(
        socket: Socket,
        config: &WsConfig,
        tx: &mpsc::Sender<WsMessage>,
    ) -> Result<Option<WsMessage>, WsError> {
        let (mut write, mut read) = socket.split();

        let mut ping_interval = tokio::time::interval(config.ping_interval);
        ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // First tick completes immediately
        ping_interval.tick().await;
        let mut waiting_for_pong = false;

        loop {
            tokio::select! {
                msg = read.next() => {
                    let forward = match msg {
                        Some(Ok(Message::Text(text))) => WsMessage::Text(text),
                        Some(Ok(Message::Binary(data))) => WsMessage::Binary(data),
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await
                                .map_err(|e| WsError::SendFailed(e.to_string()))?;
                            continue;
                        }
                        Some(Ok(Message::Pong(_))) => {
                            waiting_for_pong = false;
                            continue;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            tracing::info!(?frame, "Received close frame");
                            let (code, reason) = frame
                                .map(|f| (Some(u16::from(f.code)), f.reason.into_owned()))
                                .unwrap_or((None, String::new()));
                            return Ok(Some(WsMessage::Closed { code, reason }));
                        }
                        Some(Ok(Message::Frame(_))) => continue,
                        Some(Err(e)) => return Err(WsError::ConnectionFailed(e.to_string())),
                        None => return Err(WsError::StreamEnded),
                    };
                    if tx.send(forward).await.is_err() {
                        tracing::debug!("Receiver dropped, closing connection");
                        let _ = write.send(Message::Close(None)).await;
                        return Ok(None);
                    }
                }

                _ = ping_interval.tick() => {
                    if waiting_for_pong {
                        return Err(WsError::PongTimeout);
                    }
                    write.send(Message::Ping(vec![])).await
                        .map_err(|e| WsError::SendFailed(e.to_string()))?;
                    waiting_for_pong = true;
                }
            }
        }
    }
}

/// An open session; dropping it closes the socket
pub struct WsConnection {
    rx: mpsc::Receiver<WsMessage>,
    task: Option<JoinHandle<()>>,
}

impl WsConnection {
    fn new(rx: mpsc::Receiver<WsMessage>, task: Option<JoinHandle<()>>) -> Self {
        Self { rx, task }
    }

    /// Wrap a bare receiver, e.g. for replaying recorded frames
    pub fn from_receiver(rx: mpsc::Receiver<WsMessage>) -> Self {
        Self::new(rx, None)
    }

    /// Next event; `None` once the session task is gone
    pub async fn recv(&mut self) -> Option<WsMessage> {
        self.rx.recv().await
    }
}

impl Drop for WsConnection {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
