//! WebSocket connection and event loop.
//!
//! This module handles the websocket connection to the event server,
//! including reconnection and in-order handler dispatch.
//!
//! # Event Loop
//!
//! Opening a connection spawns two tokio tasks:
//!
//! - **socket task**: connects, forwards inbound text frames into the
//!   dispatch queue, writes outbound messages, reconnects after a delay
//! - **dispatch task**: the single consumer of the dispatch queue; runs one
//!   handler at a time in arrival order
//!
//! Handlers therefore never run concurrently, even across reconnects.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::SessionId;
use crate::protocol::Message;

use super::HandlerMap;

// ============================================================================
// Constants
// ============================================================================

/// Delay before reconnecting after the connection drops.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

// ============================================================================
// Types
// ============================================================================

type ClientStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Why a connected session ended.
enum SessionEnd {
    /// Remote closed or the socket failed; reconnect.
    Disconnected,
    /// Local shutdown; stop.
    Shutdown,
}

// ============================================================================
// Connection
// ============================================================================

/// WebSocket connection to the event server.
///
/// Dropping the connection or calling [`Connection::shutdown`] stops both
/// tasks; handlers are not invoked afterwards.
pub struct Connection {
    /// Session identifier.
    session_id: SessionId,
    /// Websocket URL.
    url: Url,
    /// Names of the registered handlers.
    handler_names: Vec<String>,
    /// Outbound message queue.
    outbound_tx: mpsc::UnboundedSender<Message>,
    /// Shutdown signal shared with both tasks.
    shutdown_tx: watch::Sender<bool>,
    /// Set once shutdown has been requested.
    closed: Arc<AtomicBool>,
    /// Set while the socket is connected.
    connected: Arc<AtomicBool>,
}

impl Connection {
    /// Opens a connection to `url` and starts dispatching to `handlers`.
    ///
    /// Returns immediately; connecting happens in the background and is
    /// retried every `reconnect_delay` until shutdown.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if called outside a tokio runtime.
    pub fn open(url: Url, mut handlers: HandlerMap, reconnect_delay: Duration) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| Error::connection(format!("no tokio runtime: {e}")))?;

        handlers.ensure_error_handler();

        let session_id = SessionId::generate();
        let handler_names = handlers.names().into_iter().map(str::to_string).collect();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let closed = Arc::new(AtomicBool::new(false));
        let connected = Arc::new(AtomicBool::new(false));

        runtime.spawn(Self::run_dispatch_loop(
            session_id,
            handlers,
            inbound_rx,
            shutdown_rx.clone(),
            Arc::clone(&closed),
        ));

        runtime.spawn(Self::run_socket_loop(
            session_id,
            url.clone(),
            reconnect_delay,
            inbound_tx,
            outbound_rx,
            shutdown_rx,
            Arc::clone(&connected),
        ));

        debug!(%session_id, %url, "Connection opened");

        Ok(Self {
            session_id,
            url,
            handler_names,
            outbound_tx,
            shutdown_tx,
            closed,
            connected,
        })
    }

    /// Returns the session ID.
    #[inline]
    #[must_use]
    pub const fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Returns the websocket URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the names of the registered handlers, sorted.
    ///
    /// Includes the transport's default `error` handler.
    #[inline]
    #[must_use]
    pub fn handler_names(&self) -> &[String] {
        &self.handler_names
    }

    /// Returns `true` while the socket is connected.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Returns `true` once the connection has been shut down.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Queues a message for the server.
    ///
    /// Messages queued while disconnected are sent after reconnecting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] after shutdown.
    pub fn send(&self, message_type: impl Into<String>, data: Value) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ConnectionClosed);
        }
        self.outbound_tx
            .send(Message::new(message_type, data))
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Shuts down the connection.
    ///
    /// Idempotent. Handlers queued but not yet run are discarded.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.shutdown_tx.send(true);
        debug!(session_id = %self.session_id, "Connection shut down");
    }

    /// Single consumer of the inbound queue.
    async fn run_dispatch_loop(
        session_id: SessionId,
        handlers: HandlerMap,
        mut inbound_rx: mpsc::UnboundedReceiver<Message>,
        mut shutdown_rx: watch::Receiver<bool>,
        closed: Arc<AtomicBool>,
    ) {
        loop {
            tokio::select! {
                message = inbound_rx.recv() => {
                    let Some(message) = message else { break };
                    if closed.load(Ordering::Acquire) {
                        break;
                    }
                    trace!(%session_id, message_type = %message.message_type, "Dispatching");
                    handlers.dispatch(&message);
                }

                _ = shutdown_rx.changed() => break,
            }
        }

        debug!(%session_id, "Dispatch loop terminated");
    }

    /// Connects, pumps frames, and reconnects until shutdown.
    async fn run_socket_loop(
        session_id: SessionId,
        url: Url,
        reconnect_delay: Duration,
        inbound_tx: mpsc::UnboundedSender<Message>,
        mut outbound_rx: mpsc::UnboundedReceiver<Message>,
        mut shutdown_rx: watch::Receiver<bool>,
        connected: Arc<AtomicBool>,
    ) {
        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            let attempt = tokio::select! {
                result = connect_async(url.as_str()) => result,
                _ = shutdown_rx.changed() => break,
            };

            match attempt {
                Ok((ws_stream, _)) => {
                    info!(%session_id, %url, "Websocket connected");
                    connected.store(true, Ordering::Release);

                    let end = Self::run_session(
                        ws_stream,
                        &inbound_tx,
                        &mut outbound_rx,
                        &mut shutdown_rx,
                    )
                    .await;

                    connected.store(false, Ordering::Release);
                    if matches!(end, SessionEnd::Shutdown) {
                        break;
                    }
                    warn!(
                        %session_id,
                        delay_ms = reconnect_delay.as_millis() as u64,
                        "Websocket lost connection, reconnecting"
                    );
                }

                Err(e) => {
                    warn!(
                        %session_id,
                        error = %e,
                        delay_ms = reconnect_delay.as_millis() as u64,
                        "Websocket connect failed, retrying"
                    );
                }
            }

            tokio::select! {
                _ = sleep(reconnect_delay) => {}
                _ = shutdown_rx.changed() => break,
            }
        }

        debug!(%session_id, "Socket loop terminated");
    }

    /// Runs one connected session until it drops or shutdown is requested.
    async fn run_session(
        ws_stream: ClientStream,
        inbound_tx: &mpsc::UnboundedSender<Message>,
        outbound_rx: &mut mpsc::UnboundedReceiver<Message>,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> SessionEnd {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        loop {
            tokio::select! {
                // Incoming frames from the server
                frame = ws_read.next() => {
                    match frame {
                        Some(Ok(WsMessage::Text(text))) => {
                            match Message::from_json(&text) {
                                Ok(message) => {
                                    if inbound_tx.send(message).is_err() {
                                        return SessionEnd::Shutdown;
                                    }
                                }
                                Err(e) => warn!(error = %e, text = %text.as_str(), "Failed to parse incoming message"),
                            }
                        }

                        Some(Ok(WsMessage::Close(_))) => {
                            debug!("WebSocket closed by remote");
                            return SessionEnd::Disconnected;
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            return SessionEnd::Disconnected;
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            return SessionEnd::Disconnected;
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                // Outgoing messages from the display
                outbound = outbound_rx.recv() => {
                    let Some(message) = outbound else {
                        let _ = ws_write.close().await;
                        return SessionEnd::Shutdown;
                    };
                    match message.to_json() {
                        Ok(json) => {
                            if let Err(e) = ws_write.send(WsMessage::Text(json.into())).await {
                                warn!(error = %e, "Failed to send message");
                                return SessionEnd::Disconnected;
                            }
                        }
                        Err(e) => warn!(error = %e, "Failed to serialize message"),
                    }
                }

                _ = shutdown_rx.changed() => {
                    let _ = ws_write.close().await;
                    return SessionEnd::Shutdown;
                }
            }
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use parking_lot::Mutex;
    use serde_json::json;
    use tokio::net::TcpListener;
    use tokio::time::timeout;
    use tokio_tungstenite::accept_hdr_async;
    use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

    const WAIT: Duration = Duration::from_secs(5);

    async fn bind() -> (TcpListener, Url) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let url = Url::parse(&format!("ws://127.0.0.1:{port}/displays/queueing/websocket"))
            .expect("url");
        (listener, url)
    }

    async fn accept(listener: &TcpListener, seen_path: Arc<Mutex<Vec<String>>>) -> WebSocketStream<TcpStream> {
        let (stream, _) = listener.accept().await.expect("accept");
        accept_hdr_async(stream, move |req: &Request, resp: Response| -> std::result::Result<Response, ErrorResponse> {
            seen_path.lock().push(req.uri().path().to_string());
            Ok(resp)
        })
        .await
        .expect("handshake")
    }

    fn recording_handlers(tx: mpsc::UnboundedSender<(String, Value)>) -> HandlerMap {
        let mut handlers = HandlerMap::new();
        for name in ["matchLoad", "matchTime", "matchTiming"] {
            let tx = tx.clone();
            handlers.insert(name, move |message: &Message| {
                let _ = tx.send((message.message_type.clone(), message.data.clone()));
                Ok(())
            });
        }
        handlers
    }

    #[test]
    fn test_open_outside_runtime_fails() {
        let url = Url::parse("ws://127.0.0.1:1/x").unwrap();
        let result = Connection::open(url, HandlerMap::new(), DEFAULT_RECONNECT_DELAY);
        assert!(matches!(result, Err(Error::Connection { .. })));
    }

    #[tokio::test]
    async fn test_dispatches_frames_in_order() {
        let (listener, url) = bind().await;
        let paths = Arc::new(Mutex::new(Vec::new()));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let connection = Connection::open(url, recording_handlers(tx), Duration::from_millis(50))
            .expect("open");
        assert_eq!(
            connection.handler_names(),
            ["error", "matchLoad", "matchTime", "matchTiming"]
        );

        let mut server = accept(&listener, Arc::clone(&paths)).await;
        for frame in [
            r#"{"type":"matchLoad","data":{}}"#,
            "not json",
            r#"{"type":"matchTiming","data":{"AutoDurationSec":15}}"#,
            r#"{"type":"unknown","data":1}"#,
            r#"{"type":"matchTime","data":{"MatchState":3,"MatchTimeSec":2}}"#,
        ] {
            server.send(WsMessage::text(frame.to_string())).await.expect("send");
        }

        let mut received = Vec::new();
        for _ in 0..3 {
            let (name, _) = timeout(WAIT, rx.recv()).await.expect("in time").expect("open");
            received.push(name);
        }

        assert_eq!(received, ["matchLoad", "matchTiming", "matchTime"]);
        assert_eq!(paths.lock().as_slice(), ["/displays/queueing/websocket"]);
        assert!(connection.is_connected());

        connection.shutdown();
    }

    #[tokio::test]
    async fn test_send_reaches_server() {
        let (listener, url) = bind().await;
        let connection =
            Connection::open(url, HandlerMap::new(), Duration::from_millis(50)).expect("open");
        let mut server = accept(&listener, Arc::new(Mutex::new(Vec::new()))).await;

        connection.send("ping", json!({"n": 1})).expect("queued");

        let frame = timeout(WAIT, server.next()).await.expect("in time").expect("frame").expect("ok");
        let text = frame.into_text().expect("text");
        assert_eq!(Message::from_json(&text).unwrap(), Message::new("ping", json!({"n": 1})));
    }

    #[tokio::test]
    async fn test_reconnects_after_close() {
        let (listener, url) = bind().await;
        let paths = Arc::new(Mutex::new(Vec::new()));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let connection = Connection::open(url, recording_handlers(tx), Duration::from_millis(50))
            .expect("open");

        let mut first = accept(&listener, Arc::clone(&paths)).await;
        first.close(None).await.expect("close");
        drop(first);

        let mut second = accept(&listener, Arc::clone(&paths)).await;
        second
            .send(WsMessage::text(r#"{"type":"matchLoad","data":null}"#.to_string()))
            .await
            .expect("send");

        let (name, data) = timeout(WAIT, rx.recv()).await.expect("in time").expect("open");
        assert_eq!(name, "matchLoad");
        assert!(data.is_null());
        assert_eq!(paths.lock().len(), 2);

        connection.shutdown();
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent_and_blocks_send() {
        let (_listener, url) = bind().await;
        let connection =
            Connection::open(url, HandlerMap::new(), Duration::from_millis(50)).expect("open");

        connection.shutdown();
        connection.shutdown();

        assert!(connection.is_closed());
        assert!(matches!(
            connection.send("ping", Value::Null),
            Err(Error::ConnectionClosed)
        ));
    }
}
