//! Cross-process transport over the `Mailbox` gRPC service.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::stream;
use matmul_types::mailbox_client::MailboxClient;
use matmul_types::mailbox_server::{Mailbox, MailboxServer};
use matmul_types::{Ack, Envelope};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::{Channel, Endpoint, Server};
use tonic::{Request, Response, Status, Streaming};
use tracing::{debug, error, info};

use crate::{Communicator, Error, Inbox, Tag, WorkerIdentity};

const INITIAL_BACKOFF: Duration = Duration::from_millis(50);
const MAX_BACKOFF: Duration = Duration::from_secs(1);
const MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

/// Server address wrapper for type-safe connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddr(pub String);

impl From<String> for ServerAddr {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ServerAddr {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for ServerAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Deadlines for a [`GrpcCommunicator`].
#[derive(Debug, Clone)]
pub struct GrpcOptions {
    /// How long to keep retrying the first connection to a peer.
    pub connect_timeout: Duration,
    /// Upper bound on a single receive; `None` waits forever.
    ///
    /// Applies to row and reduction receives. A worker waiting for the next
    /// round's dimension is not bounded by it, since that wait lasts as long
    /// as the coordinator takes to prepare its inputs.
    pub recv_timeout: Option<Duration>,
}

impl Default for GrpcOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            recv_timeout: None,
        }
    }
}

/// Worker endpoint that talks to its peers over gRPC.
///
/// `GrpcCommunicator` serves a `Mailbox` on its own peer address and feeds
/// every delivered envelope into a local [`Inbox`]. Outgoing messages are
/// streamed to the peer's mailbox; a send completes once the peer has
/// acknowledged buffering them.
///
/// # Connection Setup
///
/// Peers are started together but not necessarily at the same instant, so the
/// first send to a peer retries the connection:
/// 1. Tries to connect to the peer's address
/// 2. Backs off (50ms starting, doubles each attempt, capped at 1s)
/// 3. Gives up once `connect_timeout` has elapsed
///
/// After that, any failure is returned to the caller unchanged. Once the
/// mailbox server has stopped, receives that nothing buffered can satisfy
/// fail with [`Error::ConnectionClosed`].
pub struct GrpcCommunicator {
    identity: WorkerIdentity,
    peers: Vec<ServerAddr>,
    inbox: Arc<Inbox>,
    clients: Vec<tokio::sync::Mutex<Option<MailboxClient<Channel>>>>,
    options: GrpcOptions,
    server: JoinHandle<()>,
    serving: watch::Receiver<()>,
}

impl GrpcCommunicator {
    /// Binds this worker's mailbox on `peers[rank]` and starts serving it.
    ///
    /// # Arguments
    ///
    /// * `identity` - This worker's rank in the world
    /// * `peers` - One address per rank, ordered by rank
    /// * `options` - Connect and receive deadlines
    pub async fn bind(
        identity: WorkerIdentity,
        peers: Vec<ServerAddr>,
        options: GrpcOptions,
    ) -> Result<Self, Error> {
        check_peer_count(identity, &peers)?;
        let addr = peers[identity.rank()].0.clone();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| Error::Bind { addr, source })?;
        Self::with_listener(identity, listener, peers, options)
    }

    /// Serves the mailbox on an already bound listener.
    pub fn with_listener(
        identity: WorkerIdentity,
        listener: TcpListener,
        peers: Vec<ServerAddr>,
        options: GrpcOptions,
    ) -> Result<Self, Error> {
        check_peer_count(identity, &peers)?;

        let inbox = Arc::new(Inbox::new());
        let service = MailboxServer::new(MailboxService {
            inbox: Arc::clone(&inbox),
            total_workers: identity.total_workers(),
        })
        .max_decoding_message_size(MAX_MESSAGE_SIZE);

        let rank = identity.rank();
        // Dropped with the server task, however it ends.
        let (alive, serving) = watch::channel(());
        let server = tokio::spawn(async move {
            let _alive = alive;
            let incoming = TcpListenerStream::new(listener);
            if let Err(e) = Server::builder()
                .add_service(service)
                .serve_with_incoming(incoming)
                .await
            {
                error!(rank, error = %e, "mailbox server stopped");
            }
        });

        info!(rank, peer = %peers[rank], "mailbox serving");

        let clients = peers.iter().map(|_| tokio::sync::Mutex::new(None)).collect();
        Ok(Self {
            identity,
            peers,
            inbox,
            clients,
            options,
            server,
            serving,
        })
    }

    async fn take(
        &self,
        source: usize,
        tag: Tag,
        deadline: Option<Duration>,
    ) -> Result<Vec<i64>, Error> {
        self.identity.check_rank(source)?;
        let mut serving = self.serving.clone();
        tokio::select! {
            biased;
            payload = self.inbox.take_within(source, tag, deadline) => payload,
            _ = async { while serving.changed().await.is_ok() {} } => {
                error!(rank = self.identity.rank(), source, tag, "mailbox closed while receiving");
                Err(Error::ConnectionClosed)
            }
        }
    }

    async fn client(&self, dest: usize) -> Result<MailboxClient<Channel>, Error> {
        let mut slot = self.clients[dest].lock().await;
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        let client = self.connect(dest).await?;
        *slot = Some(client.clone());
        Ok(client)
    }

    async fn connect(&self, dest: usize) -> Result<MailboxClient<Channel>, Error> {
        let addr = &self.peers[dest];
        let endpoint = Endpoint::from_shared(format!("http://{}", addr.0))?;
        let started = Instant::now();
        let mut delay = INITIAL_BACKOFF;

        loop {
            match endpoint.connect().await {
                Ok(channel) => {
                    debug!(rank = self.identity.rank(), dest, "connected to peer");
                    return Ok(MailboxClient::new(channel)
                        .max_decoding_message_size(MAX_MESSAGE_SIZE)
                        .max_encoding_message_size(MAX_MESSAGE_SIZE));
                }
                Err(e) => {
                    let waited = started.elapsed();
                    if waited + delay > self.options.connect_timeout {
                        error!(rank = self.identity.rank(), dest, error = %e, "peer unreachable");
                        return Err(Error::Unreachable {
                            rank: dest,
                            addr: addr.0.clone(),
                            waited,
                        });
                    }
                    debug!(dest, ?delay, "peer not up yet, retrying");
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(MAX_BACKOFF);
                }
            }
        }
    }

    fn envelope(&self, tag: Tag, values: Vec<i64>) -> Envelope {
        Envelope {
            source: self.identity.rank() as u32,
            tag,
            values,
        }
    }
}

impl Drop for GrpcCommunicator {
    fn drop(&mut self) {
        self.server.abort();
    }
}

#[async_trait]
impl Communicator for GrpcCommunicator {
    fn identity(&self) -> WorkerIdentity {
        self.identity
    }

    async fn send(&self, dest: usize, tag: Tag, payload: Vec<i64>) -> Result<(), Error> {
        self.send_rows(dest, tag, vec![payload]).await
    }

    async fn recv(&self, source: usize, tag: Tag) -> Result<Vec<i64>, Error> {
        self.take(source, tag, self.options.recv_timeout).await
    }

    async fn recv_unbounded(&self, source: usize, tag: Tag) -> Result<Vec<i64>, Error> {
        self.take(source, tag, None).await
    }

    /// Streams all rows to the peer in one `Deliver` call.
    async fn send_rows(&self, dest: usize, tag: Tag, rows: Vec<Vec<i64>>) -> Result<(), Error> {
        self.identity.check_rank(dest)?;

        if dest == self.identity.rank() {
            for row in rows {
                self.inbox.push(dest, tag, row);
            }
            return Ok(());
        }

        let expected = rows.len() as u64;
        let envelopes: Vec<Envelope> = rows
            .into_iter()
            .map(|row| self.envelope(tag, row))
            .collect();

        let mut client = self.client(dest).await?;
        let ack = client.deliver(stream::iter(envelopes)).await?.into_inner();

        if ack.received != expected {
            return Err(Error::Protocol(format!(
                "rank {} buffered {} of {} messages",
                dest, ack.received, expected
            )));
        }
        Ok(())
    }
}

fn check_peer_count(identity: WorkerIdentity, peers: &[ServerAddr]) -> Result<(), Error> {
    if peers.len() != identity.total_workers() {
        return Err(Error::PeerCount {
            expected: identity.total_workers(),
            found: peers.len(),
        });
    }
    Ok(())
}

struct MailboxService {
    inbox: Arc<Inbox>,
    total_workers: usize,
}

#[tonic::async_trait]
impl Mailbox for MailboxService {
    async fn deliver(
        &self,
        request: Request<Streaming<Envelope>>,
    ) -> Result<Response<Ack>, Status> {
        let mut stream = request.into_inner();
        let mut received = 0;

        while let Some(envelope) = stream.message().await? {
            let source = envelope.source as usize;
            if source >= self.total_workers {
                return Err(Status::invalid_argument(format!(
                    "unknown source rank {}",
                    source
                )));
            }
            self.inbox.push(source, envelope.tag, envelope.values);
            received += 1;
        }

        Ok(Response::new(Ack { received }))
    }
}
