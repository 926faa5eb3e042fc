//! # Synchronous Session API
//!
//! Purpose: Expose a compact, blocking API for driving a CogServer
//! s-expression shell session over a single TCP connection.
//!
//! ## Design Principles
//! 1. **Facade Pattern**: `CogClient` hides sockets, framing, and the
//!    handshake behind open/send/receive/close.
//! 2. **Idempotent Open**: Opening an already-open session is a no-op; one
//!    lock guards the state transition, so racing opens connect once.
//! 3. **No Half-Open Sessions**: A failed handshake drops the socket before
//!    it is ever published; `connected` never reports a broken session.
//! 4. **Distinct Failure Kinds**: Callers match on what went wrong instead
//!    of inspecting message strings.

use std::fmt;
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Mutex;

use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tracing::{debug, warn};

use crate::uri::Endpoint;
use crate::wire::Wire;

/// Shell selector written immediately after connecting. The server answers
/// with its prompt and speaks s-expressions from then on.
const SEXPR_HANDSHAKE: &str = "sexpr\n";

/// Result type for the session client.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by the session client.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Connection identifier does not name a cogserver.
    #[error("invalid connection identifier '{0}': expected cog://host[:port]/space")]
    InvalidUri(String),
    /// Resolving, reaching, or greeting the server failed.
    #[error("unable to reach cogserver host {host}: {source}")]
    Connection {
        host: String,
        #[source]
        source: io::Error,
    },
    /// Operation needs an open session and there is none.
    #[error("not connected to the cogserver")]
    NotConnected,
    /// Read or write failure on an established session.
    #[error("i/o failure talking to the cogserver: {0}")]
    Transport(#[from] io::Error),
    /// Server closed the connection in the middle of an exchange.
    #[error("cogserver closed the connection")]
    PeerClosed,
}

impl ClientError {
    fn connection(host: &str, source: io::Error) -> ClientError {
        ClientError::Connection {
            host: host.to_string(),
            source,
        }
    }
}

/// Point-in-time view of a session, as reported by [`CogClient::stats`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CogStats {
    /// Connection identifier the client was created with.
    pub uri: String,
    /// Whether a session is open right now.
    pub connected: bool,
}

impl fmt::Display for CogStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.connected {
            writeln!(f, "connected to {}", self.uri)?;
        } else {
            writeln!(f, "not connected to {}", self.uri)?;
        }
        write!(f, "no counters collected")
    }
}

/// Blocking client for one CogServer session.
///
/// This is a facade over the wire layer. All methods take `&self`; the
/// session state lives behind a mutex, so a `CogClient` can be shared
/// across threads and exchanges are serialized.
pub struct CogClient {
    endpoint: Endpoint,
    wire: Mutex<Option<Wire>>,
}

impl CogClient {
    /// Creates a closed client for the given `cog://host[:port]/space`
    /// identifier. No network activity happens until [`CogClient::open`].
    pub fn new(uri: &str) -> ClientResult<CogClient> {
        let endpoint = Endpoint::parse(uri)?;
        Ok(CogClient {
            endpoint,
            wire: Mutex::new(None),
        })
    }

    /// Connects, selects the s-expression shell, and discards the greeting.
    ///
    /// Opening an open session returns `Ok` without touching the network.
    /// On any failure the session stays closed and the socket is dropped.
    pub fn open(&self) -> ClientResult<()> {
        let mut guard = self.wire.lock().expect("session lock poisoned");
        if guard.is_some() {
            return Ok(());
        }

        let mut wire = Wire::new(self.connect_stream()?);
        wire.send_text(SEXPR_HANDSHAKE).map_err(|err| match err {
            // A write this early means the server was never really there.
            ClientError::Transport(source) => ClientError::connection(&self.endpoint.host, source),
            other => other,
        })?;
        wire.read_frame(true)?;

        debug!(
            host = %self.endpoint.host,
            port = %self.endpoint.port,
            space = %self.endpoint.space,
            "cogserver session established"
        );
        *guard = Some(wire);
        Ok(())
    }

    /// Resolves the endpoint and opens a latency-tuned TCP stream.
    fn connect_stream(&self) -> ClientResult<TcpStream> {
        let host = &self.endpoint.host;
        let addr = resolve_first(&self.endpoint.authority())
            .map_err(|err| ClientError::connection(host, err))?;
        let domain = match addr {
            SocketAddr::V4(_) => Domain::IPV4,
            SocketAddr::V6(_) => Domain::IPV6,
        };
        let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))
            .map_err(|err| ClientError::connection(host, err))?;
        socket
            .connect(&addr.into())
            .map_err(|err| ClientError::connection(host, err))?;

        // Latency tuning is best-effort; a refused option never fails the open.
        if let Err(err) = socket.set_nodelay(true) {
            warn!(host = %host, error = %err, "could not disable nagle batching");
        }
        #[cfg(any(target_os = "android", target_os = "fuchsia", target_os = "linux"))]
        {
            if let Err(err) = socket.set_quickack(true) {
                warn!(host = %host, error = %err, "could not enable tcp quick acks");
            }
        }

        Ok(socket.into())
    }

    /// Reports whether a session is open. Never-opened, closed, and
    /// peer-closed sessions all read as `false`.
    pub fn connected(&self) -> bool {
        self.wire.lock().expect("session lock poisoned").is_some()
    }

    /// Closes the session, dropping the connection. Closing a closed
    /// session is a no-op.
    pub fn close(&self) {
        let mut guard = self.wire.lock().expect("session lock poisoned");
        if guard.take().is_some() {
            debug!(host = %self.endpoint.host, "cogserver session closed");
        }
    }

    /// Writes `text` to the server exactly as given.
    ///
    /// The protocol is line-oriented; the caller supplies the trailing
    /// newline as part of the command text.
    pub fn send(&self, text: &str) -> ClientResult<()> {
        let mut guard = self.wire.lock().expect("session lock poisoned");
        let wire = guard.as_mut().ok_or(ClientError::NotConnected)?;
        wire.send_text(text)
    }

    /// Blocks until one complete newline-terminated reply arrives and
    /// returns it, trailing newline included.
    ///
    /// A peer close tears the session down, so a later [`CogClient::open`]
    /// starts from a fresh connection.
    pub fn receive(&self) -> ClientResult<String> {
        let mut guard = self.wire.lock().expect("session lock poisoned");
        let wire = guard.as_mut().ok_or(ClientError::NotConnected)?;
        match wire.read_frame(false) {
            Err(ClientError::PeerClosed) => {
                // The descriptor is useless now; make `connected` say so.
                *guard = None;
                Err(ClientError::PeerClosed)
            }
            other => other,
        }
    }

    /// Waits until every prior send has reached the server.
    ///
    /// Writes are handed straight to the kernel, so there is nothing to
    /// flush and the fence completes immediately. Callers should still
    /// fence before observing server-side effects of earlier sends.
    pub fn barrier(&self) -> ClientResult<()> {
        Ok(())
    }

    /// Returns a snapshot of the session state.
    pub fn stats(&self) -> CogStats {
        CogStats {
            uri: self.endpoint.uri.clone(),
            connected: self.connected(),
        }
    }
}

/// Resolves `host:port` to the first address the resolver offers.
fn resolve_first(authority: &str) -> io::Result<SocketAddr> {
    // Only the first candidate is tried; there is no fallback loop.
    authority
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "host resolved to no addresses"))
}
