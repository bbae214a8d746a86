//! ConnectionManager: the listening socket, the accept loop, and the single
//! live client connection.
//!
//! # Lifecycle
//!
//! ```text
//! Idle ─bind─► Listening ─► Accepting ─accept─► Connected
//!                  ▲                                │ client gone / write failed
//!                  └──────────── Closing ◄──────────┘
//!
//! any state ─shutdown─► Stopped
//! ```
//!
//! Exactly one client is served at a time. While a client is connected the
//! listener is not polled; the next client waits in the OS backlog.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::application::DeviceRegistry;
use crate::domain::BridgeConfig;
use crate::infrastructure::network::receiver::run_receiver;
use crate::infrastructure::network::sender::{run_sender, ClientLink};

/// Pause after a failed `accept` before trying again.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Error type for the network layer.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("bind failed on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("network I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where the connection manager is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Listening,
    Accepting,
    Connected,
    Closing,
    Stopped,
}

/// Owns the listener and serves one client at a time.
pub struct ConnectionManager {
    bind_addr: SocketAddr,
    queue_capacity: usize,
    registry: Arc<DeviceRegistry>,
    link: Arc<ClientLink>,
    state_tx: watch::Sender<ConnectionState>,
}

impl ConnectionManager {
    pub fn new(
        config: &BridgeConfig,
        registry: Arc<DeviceRegistry>,
        link: Arc<ClientLink>,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Idle);
        Self {
            bind_addr: config.bind_addr,
            queue_capacity: config.event_queue_capacity,
            registry,
            link,
            state_tx,
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Watches state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    fn set_state(&self, state: ConnectionState) {
        debug!("connection state → {state:?}");
        self.state_tx.send_replace(state);
    }

    /// Binds the configured address (`Idle → Listening`).
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::BindFailed`]; the bridge cannot run without
    /// its listener.
    pub async fn bind(&self) -> Result<TcpListener, NetworkError> {
        let listener = TcpListener::bind(self.bind_addr)
            .await
            .map_err(|source| NetworkError::BindFailed {
                addr: self.bind_addr,
                source,
            })?;
        self.set_state(ConnectionState::Listening);
        info!("listening on {}", listener.local_addr()?);
        Ok(listener)
    }

    /// Binds and serves until `shutdown` becomes `true`.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> Result<(), NetworkError> {
        let listener = self.bind().await?;
        self.serve(listener, shutdown).await;
        Ok(())
    }

    /// Accept loop over an already bound listener.
    ///
    /// Accept errors are logged and retried. Returns once `shutdown` becomes
    /// `true`, after the live connection (if any) has been torn down.
    pub async fn serve(&self, listener: TcpListener, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                break;
            }

            self.set_state(ConnectionState::Accepting);
            info!("Ready to connect.");

            let accepted = tokio::select! {
                res = listener.accept() => res,
                _ = shutdown_requested(&mut shutdown) => break,
            };

            let (stream, peer) = match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    error!("accept error: {e}");
                    self.set_state(ConnectionState::Listening);
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    continue;
                }
            };

            let conn = ActiveConnection::start(
                stream,
                peer,
                Arc::clone(&self.registry),
                Arc::clone(&self.link),
                self.queue_capacity,
            );
            self.set_state(ConnectionState::Connected);
            info!("client {} connected (connection {})", conn.peer(), conn.id());

            let stop = conn.wait(&mut shutdown).await;

            self.set_state(ConnectionState::Closing);
            conn.close().await;
            info!("client {} disconnected (connection {})", conn.peer(), conn.id());

            if stop {
                break;
            }
            self.set_state(ConnectionState::Listening);
        }

        self.set_state(ConnectionState::Stopped);
        info!("connection manager stopped");
    }
}

/// Resolves once `true` is published; never resolves if the sender is gone.
async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

// ── Active connection ─────────────────────────────────────────────────────────

/// The accepted client socket and its receiver and sender tasks.
///
/// Each task owns one half of the transport; it is released only when both
/// have exited.
pub struct ActiveConnection {
    id: Uuid,
    peer: SocketAddr,
    link: Arc<ClientLink>,
    tasks: Mutex<Option<(JoinHandle<()>, JoinHandle<()>)>>,
    lost: watch::Receiver<bool>,
}

impl ActiveConnection {
    /// Splits `stream`, attaches a fresh queue to `link`, and spawns both
    /// tasks.
    pub fn start(
        stream: TcpStream,
        peer: SocketAddr,
        registry: Arc<DeviceRegistry>,
        link: Arc<ClientLink>,
        queue_capacity: usize,
    ) -> Self {
        let (read_half, write_half) = stream.into_split();
        Self::start_split(read_half, write_half, peer, registry, link, queue_capacity)
    }

    /// Like [`start`](Self::start), over an already split transport.
    pub fn start_split<R, W>(
        reader: R,
        writer: W,
        peer: SocketAddr,
        registry: Arc<DeviceRegistry>,
        link: Arc<ClientLink>,
        queue_capacity: usize,
    ) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let id = Uuid::new_v4();
        let queue = link.attach(queue_capacity);
        let (lost_tx, lost) = watch::channel(false);
        let lost_tx = Arc::new(lost_tx);

        let lost_on_read = Arc::clone(&lost_tx);
        let receiver = tokio::spawn(async move {
            match run_receiver(reader, &registry, id).await {
                Ok(frames) => debug!("connection {id}: end of stream after {frames} frame(s)"),
                Err(e) => warn!("connection {id}: read failed: {e}"),
            }
            lost_on_read.send_replace(true);
        });

        let sender = tokio::spawn(async move {
            match run_sender(writer, queue).await {
                Ok(frames) => debug!("connection {id}: sender stopped after {frames} frame(s)"),
                Err(e) => warn!("connection {id}: write failed: {e}"),
            }
            lost_tx.send_replace(true);
        });

        Self {
            id,
            peer,
            link,
            tasks: Mutex::new(Some((receiver, sender))),
            lost,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Waits until the client is gone or shutdown is requested. Returns
    /// `true` for shutdown.
    pub async fn wait(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        let mut lost = self.lost.clone();
        tokio::select! {
            _ = lost.wait_for(|gone| *gone) => false,
            _ = shutdown_requested(shutdown) => true,
        }
    }

    /// Tears the connection down.
    ///
    /// Detaches the hardware queue first, then stops both tasks and waits for
    /// them to exit. Safe to call any number of times, concurrently included;
    /// every call returns after teardown has completed, and only the first
    /// returns `true`.
    pub async fn close(&self) -> bool {
        let mut tasks = self.tasks.lock().await;
        let Some((receiver, sender)) = tasks.take() else {
            return false;
        };

        self.link.detach();
        receiver.abort();
        sender.abort();
        let _ = receiver.await;
        let _ = sender.await;
        debug!("connection {}: closed", self.id);
        true
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::TraceLog;
    use crate::infrastructure::midi_backend::mock::MockBackend;

    fn make_registry(link: &Arc<ClientLink>) -> Arc<DeviceRegistry> {
        let backend = MockBackend::new(&["Keys"], &["Synth"]);
        let sink: Arc<dyn crate::application::EventSink> = link.clone();
        Arc::new(DeviceRegistry::new(
            Arc::new(backend),
            sink,
            Arc::new(TraceLog::new(false)),
        ))
    }

    fn loopback_config() -> BridgeConfig {
        BridgeConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..BridgeConfig::default()
        }
    }

    async fn connected_pair() -> (TcpStream, TcpStream, SocketAddr) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server, peer) = listener.accept().await.unwrap();
        (client, server, peer)
    }

    #[test]
    fn test_initial_state_is_idle() {
        let link = Arc::new(ClientLink::new());
        let mgr = ConnectionManager::new(&loopback_config(), make_registry(&link), link);
        assert_eq!(mgr.state(), ConnectionState::Idle);
    }

    #[tokio::test]
    async fn test_bind_moves_to_listening() {
        let link = Arc::new(ClientLink::new());
        let mgr = ConnectionManager::new(&loopback_config(), make_registry(&link), link);

        let listener = mgr.bind().await.unwrap();

        assert_eq!(mgr.state(), ConnectionState::Listening);
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn test_bind_on_used_port_fails() {
        // Arrange: occupy a port
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = BridgeConfig {
            bind_addr: taken.local_addr().unwrap(),
            ..BridgeConfig::default()
        };
        let link = Arc::new(ClientLink::new());
        let mgr = ConnectionManager::new(&config, make_registry(&link), link);

        // Act
        let result = mgr.bind().await;

        // Assert
        assert!(matches!(result, Err(NetworkError::BindFailed { .. })));
        assert_eq!(mgr.state(), ConnectionState::Idle);
    }

    #[tokio::test]
    async fn test_shutdown_while_accepting_stops() {
        let link = Arc::new(ClientLink::new());
        let mgr = ConnectionManager::new(&loopback_config(), make_registry(&link), link);
        let listener = mgr.bind().await.unwrap();
        let (stop_tx, stop_rx) = watch::channel(false);
        let mut states = mgr.subscribe();

        let serve = mgr.serve(listener, stop_rx);
        let trigger = async {
            states
                .wait_for(|s| *s == ConnectionState::Accepting)
                .await
                .unwrap();
            stop_tx.send_replace(true);
        };
        tokio::join!(serve, trigger);

        assert_eq!(mgr.state(), ConnectionState::Stopped);
    }

    #[tokio::test]
    async fn test_close_is_idempotent_under_concurrency() {
        // Arrange
        let link = Arc::new(ClientLink::new());
        let registry = make_registry(&link);
        let (_client, server, peer) = connected_pair().await;
        let conn = ActiveConnection::start(server, peer, registry, Arc::clone(&link), 8);
        assert!(link.is_attached());

        // Act
        let (first, second) = tokio::join!(conn.close(), conn.close());

        // Assert
        assert!(first ^ second, "exactly one close performs teardown");
        assert!(!conn.close().await);
        assert!(!link.is_attached());
    }

    #[tokio::test]
    async fn test_client_hangup_is_observed() {
        let link = Arc::new(ClientLink::new());
        let registry = make_registry(&link);
        let (client, server, peer) = connected_pair().await;
        let conn = ActiveConnection::start(server, peer, registry, Arc::clone(&link), 8);
        let (_stop_tx, mut stop_rx) = watch::channel(false);

        drop(client);
        let shutdown = conn.wait(&mut stop_rx).await;

        assert!(!shutdown);
        assert!(conn.close().await);
    }

    #[tokio::test]
    async fn test_write_failure_ends_connection_like_a_hangup() {
        // Arrange: the reader never yields, the writer fails on first use
        let backend = MockBackend::new(&["Keys"], &["Synth"]);
        let link = Arc::new(ClientLink::new());
        let sink: Arc<dyn crate::application::EventSink> = link.clone();
        let registry = Arc::new(DeviceRegistry::new(
            Arc::new(backend.clone()),
            sink,
            Arc::new(TraceLog::new(false)),
        ));
        registry.open_all();
        let (_client_side, reader) = tokio::io::duplex(64);
        let writer = tokio_test::io::Builder::new()
            .write_error(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "peer gone"))
            .build();
        let peer: SocketAddr = "127.0.0.1:9".parse().unwrap();
        let conn = ActiveConnection::start_split(
            reader,
            writer,
            peer,
            registry,
            Arc::clone(&link),
            8,
        );
        let (_stop_tx, mut stop_rx) = watch::channel(false);

        // Act: hardware input makes the sender write
        assert!(backend.inject_input(0, 0x007F_3C90));
        let shutdown = tokio::time::timeout(Duration::from_secs(5), conn.wait(&mut stop_rx))
            .await
            .expect("write failure was not observed");

        // Assert
        assert!(!shutdown);
        assert_eq!(conn.peer(), peer);
        assert!(conn.close().await);
        assert!(!conn.close().await);
        assert!(!link.is_attached());
    }
}
