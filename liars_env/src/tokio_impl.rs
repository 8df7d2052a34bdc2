//! Production transport backed by Tokio TCP sockets.
//!
//! Every frame is one line of JSON. A client opens a connection per call,
//! writes a `LieRequest` line and reads back a single `WireReply` line.

use crate::error::EnvError;
use crate::network::QueryTransport;
use crate::service::LieService;
use crate::types::{AgentId, LieRequest, LieResponse, WireReply};
use async_trait::async_trait;
use serde::Serialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

const ACCEPT_BACKOFF_BASE_MS: u64 = 10;
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Client transport that reaches agents on a single host.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    /// Host all agent ports live on
    host: IpAddr,
}

impl TcpTransport {
    /// Creates a transport for agents listening on `host`.
    pub fn new(host: IpAddr) -> Self {
        Self { host }
    }

    /// Creates a transport for agents on the loopback interface.
    pub fn localhost() -> Self {
        Self::new(IpAddr::V4(Ipv4Addr::LOCALHOST))
    }

    /// Creates an Arc-wrapped transport for sharing across tasks.
    pub fn shared(host: IpAddr) -> Arc<Self> {
        Arc::new(Self::new(host))
    }

    pub fn host(&self) -> IpAddr {
        self.host
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::localhost()
    }
}

#[async_trait]
impl QueryTransport for TcpTransport {
    async fn query(&self, target: AgentId, request: LieRequest) -> Result<LieResponse, EnvError> {
        let addr = target.socket_addr(self.host);
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| EnvError::unreachable(target, e))?;

        let (reader, mut writer) = stream.into_split();
        write_frame(&mut writer, &request, |e| EnvError::unreachable(target, e)).await?;

        let mut reader = BufReader::new(reader);
        let mut line = String::new();
        let read = reader
            .read_line(&mut line)
            .await
            .map_err(|e| EnvError::unreachable(target, e))?;
        if read == 0 {
            return Err(EnvError::protocol(format!(
                "agent {} closed the connection without replying",
                target
            )));
        }

        match serde_json::from_str::<WireReply>(&line)? {
            WireReply::Ok(response) => Ok(response),
            WireReply::Error { message } => Err(EnvError::Remote {
                agent: target.to_string(),
                message,
            }),
        }
    }
}

/// Binds an OS-assigned port on `host`.
///
/// The returned `AgentId` is the bound port.
pub async fn bind(host: IpAddr) -> Result<(TcpListener, AgentId), EnvError> {
    let addr = SocketAddr::new(host, 0);
    let listener = TcpListener::bind(addr).await.map_err(|source| EnvError::Bind {
        addr: addr.to_string(),
        source,
    })?;
    let port = listener
        .local_addr()
        .map_err(|source| EnvError::Bind {
            addr: addr.to_string(),
            source,
        })?
        .port();
    Ok((listener, AgentId(port)))
}

/// Serves `service` on `listener` until `shutdown` fires (or its sender is dropped).
///
/// Each accepted connection runs in its own task. On shutdown the listener
/// is dropped, which releases the port, and open connections are aborted.
pub async fn serve<S: LieService>(
    listener: TcpListener,
    service: Arc<S>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut connections = JoinSet::new();
    let mut accept_failures = 0u32;

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    accept_failures = 0;
                    debug!("Accepted connection from {}", peer);
                    let service = Arc::clone(&service);
                    connections.spawn(async move {
                        if let Err(e) = handle_connection(stream, peer, service).await {
                            warn!("Connection error from {}: {}", peer, e);
                        }
                    });
                }
                Err(e) => {
                    accept_failures = accept_failures.saturating_add(1);
                    let delay = accept_backoff(accept_failures);
                    error!("Accept error ({} in a row), retrying in {:?}: {}", accept_failures, delay, e);
                    tokio::time::sleep(delay).await;
                }
            },
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }

    connections.abort_all();
}

/// Delay before retrying after `failures` consecutive accept errors.
fn accept_backoff(failures: u32) -> Duration {
    let millis = ACCEPT_BACKOFF_BASE_MS.saturating_mul(1 << failures.saturating_sub(1).min(10));
    Duration::from_millis(millis).min(ACCEPT_BACKOFF_MAX)
}

async fn handle_connection<S: LieService>(
    stream: TcpStream,
    peer: SocketAddr,
    service: Arc<S>,
) -> Result<(), EnvError> {
    let peer_label = peer.to_string();
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let read = reader
            .read_line(&mut line)
            .await
            .map_err(|e| EnvError::connection(&peer_label, e))?;
        if read == 0 {
            return Ok(());
        }

        let reply = match serde_json::from_str::<LieRequest>(&line) {
            Ok(request) => match service.lie_query(request).await {
                Ok(response) => WireReply::Ok(response),
                Err(e) => WireReply::Error {
                    message: e.to_string(),
                },
            },
            Err(e) => WireReply::Error {
                message: format!("malformed request: {}", e),
            },
        };

        write_frame(&mut writer, &reply, |e| EnvError::connection(&peer_label, e)).await?;
    }
}

async fn write_frame<W, T, F>(writer: &mut W, frame: &T, on_io: F) -> Result<(), EnvError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
    F: FnOnce(std::io::Error) -> EnvError,
{
    let mut line = serde_json::to_string(frame)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await.map_err(on_io)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedService(i32);

    #[async_trait]
    impl LieService for FixedService {
        async fn lie_query(&self, request: LieRequest) -> Result<LieResponse, EnvError> {
            if request.is_proxied() {
                return Err(EnvError::protocol("fixed service cannot proxy"));
            }
            Ok(LieResponse::direct(self.0))
        }
    }

    async fn start(value: i32) -> (AgentId, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
        let transport = TcpTransport::localhost();
        let (listener, id) = bind(transport.host()).await.unwrap();
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(serve(listener, Arc::new(FixedService(value)), stop_rx));
        (id, stop_tx, task)
    }

    #[tokio::test]
    async fn test_direct_query_round_trip() {
        let (id, stop_tx, task) = start(42).await;
        let transport = TcpTransport::localhost();

        let response = transport.query(id, LieRequest::direct()).await.unwrap();
        assert_eq!(response, LieResponse::direct(42));

        // Same agent answers repeated calls
        let again = transport.query(id, LieRequest::direct()).await.unwrap();
        assert_eq!(again.value, 42);

        stop_tx.send(()).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_service_error_becomes_remote_error() {
        let (id, stop_tx, task) = start(1).await;
        let transport = TcpTransport::localhost();

        let err = transport
            .query(id, LieRequest::proxied(vec![AgentId(1)]))
            .await
            .unwrap_err();
        match err {
            EnvError::Remote { agent, message } => {
                assert_eq!(agent, id.to_string());
                assert!(message.contains("cannot proxy"));
            }
            other => panic!("expected remote error, got {other:?}"),
        }

        stop_tx.send(()).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_releases_port() {
        let (id, stop_tx, task) = start(3).await;
        stop_tx.send(()).unwrap();
        task.await.unwrap();

        let transport = TcpTransport::localhost();
        let err = transport.query(id, LieRequest::direct()).await.unwrap_err();
        assert!(matches!(err, EnvError::Unreachable { .. }));
    }

    #[test]
    fn test_accept_backoff_grows_and_caps() {
        assert_eq!(accept_backoff(1), Duration::from_millis(10));
        assert_eq!(accept_backoff(2), Duration::from_millis(20));
        assert_eq!(accept_backoff(5), Duration::from_millis(160));
        assert_eq!(accept_backoff(8), ACCEPT_BACKOFF_MAX);
        assert_eq!(accept_backoff(u32::MAX), ACCEPT_BACKOFF_MAX);
    }

    #[tokio::test]
    async fn test_bind_assigns_distinct_ports() {
        let host = TcpTransport::localhost().host();
        let (_l1, a) = bind(host).await.unwrap();
        let (_l2, b) = bind(host).await.unwrap();
        assert_ne!(a, b);
        assert_ne!(a.port(), 0);
    }
}
