//! SSH session lifecycle: Connected -> Authenticated -> Closed.
//!
//! A `Session` exclusively owns the connected socket, the engine session that
//! runs over it, and a lease on the shared `TransportContext`. The three are
//! held together in one `Live` value so they can only be released together.
//! `close` takes that value out, which makes teardown run at most once no
//! matter how often `close` is called or whether `Drop` runs afterwards.

pub mod auth;
pub mod fingerprint;

use std::fmt;
use std::net::{Shutdown, TcpStream};
use std::path::Path;
use std::sync::{Arc, Weak};

use indicatif::ProgressBar;

use crate::config::ClientConfig;
use crate::error::ScpError;
use crate::net;
use crate::scp::{self, TransferDescriptor, TransferResult, DEFAULT_CHUNK_SIZE};
use crate::transport::{ContextLease, Engine, EngineSession, TransportContext};

use auth::Credential;
use fingerprint::{Fingerprint, HashAlgorithm};

/// Lifecycle state of a `Session`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    Authenticated,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionState::Connected => "connected",
            SessionState::Authenticated => "authenticated",
            SessionState::Closed => "closed",
        })
    }
}

/// Per-session settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub hash_algorithm: HashAlgorithm,
    pub chunk_size: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            hash_algorithm: HashAlgorithm::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

// Field order is drop order: engine session, then socket, then lease.
struct Live<E: Engine> {
    transport: E::Session,
    socket: Arc<TcpStream>,
    lease: ContextLease<E>,
}

/// An SSH connection to one remote host.
///
/// Not meant to be shared between threads; use `abort_handle` to interrupt a
/// blocked call from elsewhere.
pub struct Session<E: Engine> {
    live: Option<Live<E>>,
    state: SessionState,
    fingerprint: Fingerprint,
    peer: String,
    options: SessionOptions,
}

/// Dial `host:port` and open a session on the resulting socket.
///
/// The port is validated before any network I/O.
pub fn open<E: Engine>(
    ctx: &TransportContext<E>,
    host: &str,
    port: &str,
    config: &ClientConfig,
) -> Result<Session<E>, ScpError> {
    let port = net::parse_port(port)?;
    let socket = net::dial(host, port, &config.dial_options())?;
    Session::open(ctx, socket, config.session_options())
}

impl<E: Engine> Session<E> {
    /// Run the handshake on a connected socket.
    ///
    /// On failure the engine session, the socket and the context lease are
    /// released, in that order, before the error is returned.
    pub fn open(
        ctx: &TransportContext<E>,
        socket: TcpStream,
        options: SessionOptions,
    ) -> Result<Self, ScpError> {
        let peer = socket
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "<unknown>".to_string());

        // Locals drop in reverse declaration order on every early return
        // below: transport, socket, lease.
        let lease = ctx.acquire().map_err(|e| {
            ScpError::Handshake(format!("cannot initialize transport context: {}", e))
        })?;
        let socket = Arc::new(socket);
        let mut transport = lease
            .engine()
            .create_session(Arc::clone(&socket))
            .map_err(|e| ScpError::Handshake(format!("cannot create session: {}", e)))?;

        transport
            .handshake()
            .map_err(|e| ScpError::Handshake(e.message))?;

        let hash = transport
            .host_key_hash(options.hash_algorithm)
            .ok_or_else(|| {
                ScpError::Handshake(format!(
                    "server did not provide a {} host key hash",
                    options.hash_algorithm.name()
                ))
            })?;
        let fingerprint = Fingerprint::new(options.hash_algorithm, hash);
        tracing::info!(peer = %peer, fingerprint = %fingerprint, "SSH session established");

        Ok(Self {
            live: Some(Live {
                transport,
                socket,
                lease,
            }),
            state: SessionState::Connected,
            fingerprint,
            peer,
            options,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Remote address this session was opened against.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    fn live(&self) -> Result<&Live<E>, ScpError> {
        self.live.as_ref().ok_or(ScpError::SessionClosed)
    }

    /// Formatted host key fingerprint, e.g. `1A:2B:...`.
    pub fn host_key_fingerprint(&self) -> Result<String, ScpError> {
        self.live()?;
        Ok(self.fingerprint.to_string())
    }

    pub fn fingerprint(&self) -> Result<&Fingerprint, ScpError> {
        self.live()?;
        Ok(&self.fingerprint)
    }

    /// Authenticate a Connected session.
    ///
    /// A rejected credential leaves the session Connected, so the call can be
    /// retried on the same session.
    pub fn authenticate(&mut self, credential: &Credential) -> Result<(), ScpError> {
        let live = self.live()?;
        if self.state != SessionState::Connected {
            return Err(ScpError::InvalidState {
                operation: "authenticate",
                state: self.state,
            });
        }

        match live.transport.authenticate(credential) {
            Ok(()) => {
                self.state = SessionState::Authenticated;
                tracing::info!(peer = %self.peer, user = credential.user(), "Authenticated");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    peer = %self.peer,
                    user = credential.user(),
                    error = %e,
                    "Authentication rejected"
                );
                Err(ScpError::AuthFailed {
                    user: credential.user().to_string(),
                    reason: e.message,
                })
            }
        }
    }

    pub fn authenticate_password(&mut self, user: &str, password: &str) -> Result<(), ScpError> {
        self.authenticate(&Credential::password(user, password))
    }

    /// Upload one local file to `remote`.
    pub fn upload_file(
        &mut self,
        local: impl AsRef<Path>,
        remote: &str,
    ) -> Result<TransferResult, ScpError> {
        self.upload_file_with_progress(local, remote, &ProgressBar::hidden())
    }

    pub fn upload_file_with_progress(
        &mut self,
        local: impl AsRef<Path>,
        remote: &str,
        progress: &ProgressBar,
    ) -> Result<TransferResult, ScpError> {
        self.ensure_authenticated("upload")?;
        let descriptor = TransferDescriptor::from_local(local, remote)?;
        self.upload(&descriptor, progress)
    }

    /// Upload a pre-built descriptor.
    ///
    /// `&mut self` keeps a second transfer from starting while one is in
    /// flight on this session.
    pub fn upload(
        &mut self,
        descriptor: &TransferDescriptor,
        progress: &ProgressBar,
    ) -> Result<TransferResult, ScpError> {
        let live = self.ensure_authenticated("upload")?;
        tracing::info!(
            local = %descriptor.local_path.display(),
            remote = %descriptor.remote_path,
            size = descriptor.size,
            "Starting upload"
        );
        scp::send(&live.transport, descriptor, self.options.chunk_size, progress)
    }

    fn ensure_authenticated(&self, operation: &'static str) -> Result<&Live<E>, ScpError> {
        let live = self.live()?;
        if self.state != SessionState::Authenticated {
            return Err(ScpError::InvalidState {
                operation,
                state: self.state,
            });
        }
        Ok(live)
    }

    /// Handle that can shut the socket down from another thread.
    pub fn abort_handle(&self) -> Result<AbortHandle, ScpError> {
        let live = self.live()?;
        Ok(AbortHandle {
            socket: Arc::downgrade(&live.socket),
        })
    }

    /// Close the session. Safe to call in any state, any number of times.
    ///
    /// Disconnect failures are logged and otherwise ignored.
    pub fn close(&mut self) {
        self.state = SessionState::Closed;
        let Some(live) = self.live.take() else {
            return;
        };

        let Live {
            transport,
            socket,
            lease,
        } = live;
        if let Err(e) = transport.disconnect("normal shutdown") {
            tracing::warn!(peer = %self.peer, error = %e, "Disconnect failed during close");
        }
        drop(transport);
        drop(socket);
        drop(lease);
        tracing::debug!(peer = %self.peer, "Session closed");
    }
}

impl<E: Engine> Drop for Session<E> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<E: Engine> fmt::Debug for Session<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("peer", &self.peer)
            .field("state", &self.state)
            .field("fingerprint", &self.fingerprint.to_string())
            .finish()
    }
}

/// Out-of-band abort for a session's socket.
///
/// Holds only a weak reference, so it never keeps a closed session's socket
/// alive.
#[derive(Debug, Clone)]
pub struct AbortHandle {
    socket: Weak<TcpStream>,
}

impl AbortHandle {
    /// Shut the socket down. Returns `false` if the session is already gone.
    pub fn abort(&self) -> bool {
        match self.socket.upgrade() {
            Some(socket) => {
                if let Err(e) = socket.shutdown(Shutdown::Both) {
                    tracing::debug!(error = %e, "Socket shutdown failed");
                }
                true
            }
            None => false,
        }
    }
}
