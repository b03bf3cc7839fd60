use reswire::frame::{FrameCodec, FrameStreamDecoder};
use reswire::message::{MessageKind, RequestEnvelope, ResponseDispatcher, ResponseEnvelope};
use serde_json::Value;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::{Mutex, broadcast, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// Errors reported by the transport, both as `Result`s and on the error
/// broadcast channel.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    #[error("connection refused by server")]
    Refused,

    #[error("host unreachable or not found")]
    HostUnreachable,

    #[error("server closed the connection")]
    PeerClosed,

    #[error("connect timed out")]
    Timeout,

    #[error("not connected to server")]
    NotConnected,

    #[error("disconnected before the response arrived")]
    Disconnected,

    #[error("request encoding failed: {0}")]
    Encode(String),

    #[error("framing error: {0}")]
    Framing(String),

    #[error("network error: {0}")]
    Network(String),
}

fn map_io_error(e: &io::Error) -> TransportError {
    match e.kind() {
        io::ErrorKind::ConnectionRefused => TransportError::Refused,
        io::ErrorKind::HostUnreachable | io::ErrorKind::NetworkUnreachable => {
            TransportError::HostUnreachable
        }
        io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::UnexpectedEof => TransportError::PeerClosed,
        io::ErrorKind::TimedOut => TransportError::Timeout,
        _ => TransportError::Network(e.to_string()),
    }
}

struct ConnectionHandle {
    generation: u64,
    outbound_tx: UnboundedSender<Vec<u8>>,
    reader: JoinHandle<()>,
}

struct Shared {
    dispatcher: Mutex<ResponseDispatcher<'static>>,
    conn: Mutex<Option<ConnectionHandle>>,
    generation: AtomicU64,
    state_tx: watch::Sender<bool>,
    error_tx: broadcast::Sender<TransportError>,
}

/// A reconnectable TCP connection speaking the length-prefixed JSON
/// protocol.
///
/// One read task per connection owns the frame decoder and drives response
/// dispatch; one write task owns the socket's write half and drains a
/// channel of whole frames, so two concurrent sends can never interleave
/// their bytes. Connection state changes are published on a watch channel
/// and transport errors on a broadcast channel, observable by any number of
/// listeners.
///
/// The protocol has no request ID, so at most one request may be in flight
/// at a time; see [`TcpClient::request`]. There is no automatic reconnect
/// or retry at this layer.
pub struct TcpClient {
    shared: Arc<Shared>,
}

impl TcpClient {
    pub fn new() -> Self {
        let (state_tx, _) = watch::channel(false);
        let (error_tx, _) = broadcast::channel(16);

        Self {
            shared: Arc::new(Shared {
                dispatcher: Mutex::new(ResponseDispatcher::new()),
                conn: Mutex::new(None),
                generation: AtomicU64::new(0),
                state_tx,
                error_tx,
            }),
        }
    }

    /// Connects to the server, waiting up to `connect_timeout`.
    ///
    /// Idempotent: when a connection is already up this returns `Ok` without
    /// a second handshake. On success the read and write tasks are spawned
    /// and the status watch flips to `true`.
    pub async fn connect(
        &self,
        host: &str,
        port: u16,
        connect_timeout: Duration,
    ) -> Result<(), TransportError> {
        {
            let conn = self.shared.conn.lock().await;
            if conn.is_some() {
                tracing::debug!(host, port, "already connected");
                return Ok(());
            }
        }

        // The conn lock is released during the handshake so that sends and
        // disconnects against the current state stay responsive for up to
        // `connect_timeout`.
        let addr = format!("{host}:{port}");
        let stream = match timeout(connect_timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(self.report(map_io_error(&e))),
            Err(_) => return Err(self.report(TransportError::Timeout)),
        };

        let mut conn = self.shared.conn.lock().await;
        if conn.is_some() {
            // Lost a connect race; keep the connection that won.
            tracing::debug!(host, port, "already connected");
            return Ok(());
        }

        // Distinguishes this connection's tasks from a predecessor's, so a
        // read task outliving a reconnect cannot tear down its successor.
        let generation = self.shared.generation.fetch_add(1, Ordering::Relaxed) + 1;

        let (read_half, write_half) = stream.into_split();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<Vec<u8>>();

        tokio::spawn(write_loop(
            write_half,
            outbound_rx,
            self.shared.clone(),
            generation,
        ));
        let reader = tokio::spawn(read_loop(read_half, self.shared.clone(), generation));

        *conn = Some(ConnectionHandle {
            generation,
            outbound_tx,
            reader,
        });
        // send_replace updates the value even with zero receivers; a plain
        // send would be dropped whenever nobody holds a status receiver,
        // leaving is_connected() stale.
        self.shared.state_tx.send_replace(true);

        tracing::info!(host, port, "connected to server");
        Ok(())
    }

    /// Tears the connection down unconditionally and immediately.
    ///
    /// The read task is aborted with no drain: a partially reassembled frame
    /// is discarded, and any pending response registration is cleared, which
    /// resolves an awaited [`TcpClient::request`] with
    /// [`TransportError::Disconnected`].
    pub async fn disconnect(&self) {
        let handle = self.shared.conn.lock().await.take();
        let Some(handle) = handle else {
            return;
        };

        handle.reader.abort();
        drop(handle);

        self.shared.dispatcher.lock().await.clear();
        self.shared.state_tx.send_replace(false);

        tracing::info!("disconnected from server");
    }

    pub fn is_connected(&self) -> bool {
        *self.shared.state_tx.borrow()
    }

    /// Watch channel carrying the current connected/disconnected state.
    pub fn connection_status(&self) -> watch::Receiver<bool> {
        self.shared.state_tx.subscribe()
    }

    /// Broadcast channel carrying transport errors as they occur.
    pub fn subscribe_errors(&self) -> broadcast::Receiver<TransportError> {
        self.shared.error_tx.subscribe()
    }

    /// Encodes `{"type": kind, "data": data}` and queues the whole frame for
    /// the writer task.
    ///
    /// Fails fast with [`TransportError::NotConnected`] (also published on
    /// the error broadcast) when no connection is up.
    pub async fn send_request(&self, kind: MessageKind, data: Value) -> Result<(), TransportError> {
        let conn = self.shared.conn.lock().await;
        let Some(handle) = conn.as_ref() else {
            return Err(self.report(TransportError::NotConnected));
        };

        let frame = FrameCodec::encode(&RequestEnvelope { kind, data })
            .map_err(|e| self.report(TransportError::Encode(e.to_string())))?;

        tracing::debug!(kind, bytes = frame.len(), "sending request");

        handle
            .outbound_tx
            .send(frame)
            .map_err(|_| self.report(TransportError::NotConnected))
    }

    /// Registers `on_response` as the sole handler for the next response of
    /// `kind`, superseding any previous registration.
    pub async fn await_response<F>(&self, kind: MessageKind, on_response: F)
    where
        F: FnOnce(ResponseEnvelope) + Send + 'static,
    {
        self.shared
            .dispatcher
            .lock()
            .await
            .await_once(kind, on_response);
    }

    /// Sends a request and awaits its paired response.
    ///
    /// Registers for `response_kind`, sends the `kind` request, and resolves
    /// when the response arrives. Disconnecting while the request is in
    /// flight resolves the future with [`TransportError::Disconnected`]
    /// instead of leaving it pending. Callers must keep request/response
    /// pairs strictly sequential; the protocol supports one in-flight
    /// request per connection.
    pub async fn request(
        &self,
        kind: MessageKind,
        response_kind: MessageKind,
        data: Value,
    ) -> Result<ResponseEnvelope, TransportError> {
        let (done_tx, done_rx) = oneshot::channel::<ResponseEnvelope>();

        self.shared
            .dispatcher
            .lock()
            .await
            .await_once(response_kind, move |envelope| {
                let _ = done_tx.send(envelope);
            });

        if let Err(e) = self.send_request(kind, data).await {
            self.shared.dispatcher.lock().await.clear();
            return Err(e);
        }

        done_rx.await.map_err(|_| TransportError::Disconnected)
    }

    fn report(&self, err: TransportError) -> TransportError {
        let _ = self.shared.error_tx.send(err.clone());
        err
    }
}

impl Default for TcpClient {
    fn default() -> Self {
        Self::new()
    }
}

async fn read_loop(mut read_half: OwnedReadHalf, shared: Arc<Shared>, generation: u64) {
    let mut decoder = FrameStreamDecoder::new();
    let mut chunk = vec![0u8; 8192];

    loop {
        match read_half.read(&mut chunk).await {
            Ok(0) => {
                tracing::info!("server closed the connection");
                let _ = shared.error_tx.send(TransportError::PeerClosed);
                break;
            }
            Ok(n) => {
                let mut fatal = false;

                for result in decoder.read_bytes(&chunk[..n]) {
                    match result {
                        Ok(payload) => match FrameCodec::decode(&payload) {
                            Ok(envelope) => {
                                shared.dispatcher.lock().await.deliver(envelope);
                            }
                            Err(e) => {
                                tracing::debug!(error = %e, "dropping undecodable frame");
                            }
                        },
                        Err(e) => {
                            // The decoder only errors on an implausible
                            // length field, which desynchronizes the stream.
                            tracing::error!(error = %e, "framing error, closing connection");
                            let _ = shared.error_tx.send(TransportError::Framing(e.to_string()));
                            fatal = true;
                            break;
                        }
                    }
                }

                if fatal {
                    break;
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "read failed");
                let _ = shared.error_tx.send(map_io_error(&e));
                break;
            }
        }
    }

    // The decoder dies with this task, so a partial frame buffered here can
    // never be completed by bytes from a later connection.
    teardown(&shared, generation).await;
}

async fn write_loop(
    mut write_half: OwnedWriteHalf,
    mut outbound_rx: UnboundedReceiver<Vec<u8>>,
    shared: Arc<Shared>,
    generation: u64,
) {
    while let Some(frame) = outbound_rx.recv().await {
        if let Err(e) = write_half.write_all(&frame).await {
            tracing::error!(error = %e, "write failed");
            let _ = shared.error_tx.send(map_io_error(&e));
            break;
        }
    }

    teardown(&shared, generation).await;
}

/// Clears connection state on behalf of a finished I/O task, but only if the
/// client still belongs to that task's connection.
async fn teardown(shared: &Arc<Shared>, generation: u64) {
    let mut conn = shared.conn.lock().await;
    match conn.as_ref() {
        Some(handle) if handle.generation == generation => {
            conn.take();
        }
        _ => return,
    }
    drop(conn);

    shared.dispatcher.lock().await.clear();
    shared.state_tx.send_replace(false);
}
