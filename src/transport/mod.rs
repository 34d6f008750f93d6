//! Seam between the session layer and the secure-transport engine.
//!
//! The engine (handshake, key exchange, encryption, framing) is an external
//! collaborator. `Engine`, `EngineSession` and `SendChannel` describe the
//! handful of primitives the client consumes; `Ssh2Engine` implements them on
//! top of libssh2. Releasing an engine session or channel is its `Drop`.
//!
//! `TransportContext` replaces libssh2's process-wide init/exit pair with an
//! explicit reference-counted object: the first lease initializes the engine,
//! the last released lease shuts it down.

pub mod libssh2;

use std::net::TcpStream;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::session::auth::Credential;
use crate::session::fingerprint::HashAlgorithm;

pub use libssh2::Ssh2Engine;

/// Error reported by the transport engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    /// Engine-specific error code, 0 when the engine has none.
    pub code: i32,
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: 0,
            message: message.into(),
        }
    }

    pub fn with_code(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// A secure-transport engine.
pub trait Engine {
    type Session: EngineSession;

    /// Process-level engine initialization. Called on the first lease.
    fn init(&self) -> Result<(), TransportError>;

    /// Process-level engine teardown. Called when the last lease is released.
    fn shutdown(&self);

    /// Create an engine session bound to a connected socket.
    ///
    /// The socket is shared with the owning `Session`; the engine must not
    /// keep it alive past its own drop.
    fn create_session(&self, socket: Arc<TcpStream>) -> Result<Self::Session, TransportError>;
}

/// One engine session over a connected socket.
pub trait EngineSession {
    type Channel: SendChannel;

    fn handshake(&mut self) -> Result<(), TransportError>;

    /// Hash of the server's host key, `None` if the engine cannot provide it.
    fn host_key_hash(&self, algorithm: HashAlgorithm) -> Option<Vec<u8>>;

    fn authenticate(&self, credential: &Credential) -> Result<(), TransportError>;

    /// Open an SCP send channel for `remote`, declaring mode and exact size.
    fn open_send_channel(
        &self,
        remote: &str,
        mode: i32,
        size: u64,
    ) -> Result<Self::Channel, TransportError>;

    /// Send a protocol disconnect to the peer.
    fn disconnect(&self, description: &str) -> Result<(), TransportError>;
}

/// Write half of an SCP channel.
pub trait SendChannel {
    /// Write some prefix of `data`, returning how many bytes were accepted.
    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError>;

    fn send_eof(&mut self) -> Result<(), TransportError>;

    fn wait_eof(&mut self) -> Result<(), TransportError>;

    fn wait_closed(&mut self) -> Result<(), TransportError>;
}

struct ContextInner<E: Engine> {
    engine: E,
    live: Mutex<usize>,
}

impl<E: Engine> ContextInner<E> {
    fn counter(&self) -> MutexGuard<'_, usize> {
        // The guarded value is a plain counter, a panic elsewhere cannot
        // leave it half-updated.
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Reference-counted transport context shared by every `Session`.
pub struct TransportContext<E: Engine> {
    inner: Arc<ContextInner<E>>,
}

impl<E: Engine> Clone for TransportContext<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Engine> TransportContext<E> {
    pub fn new(engine: E) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                engine,
                live: Mutex::new(0),
            }),
        }
    }

    pub fn engine(&self) -> &E {
        &self.inner.engine
    }

    /// Number of outstanding leases.
    pub fn live_sessions(&self) -> usize {
        *self.inner.counter()
    }

    /// Take a lease, initializing the engine if this is the first one.
    pub fn acquire(&self) -> Result<ContextLease<E>, TransportError> {
        let mut live = self.inner.counter();
        if *live == 0 {
            tracing::debug!("Initializing transport context");
            self.inner.engine.init()?;
        }
        *live += 1;
        Ok(ContextLease {
            inner: Arc::clone(&self.inner),
        })
    }
}

/// A session's hold on the transport context. Released exactly once, on drop.
pub struct ContextLease<E: Engine> {
    inner: Arc<ContextInner<E>>,
}

impl<E: Engine> ContextLease<E> {
    pub fn engine(&self) -> &E {
        &self.inner.engine
    }
}

impl<E: Engine> Drop for ContextLease<E> {
    fn drop(&mut self) {
        let mut live = self.inner.counter();
        *live = live.saturating_sub(1);
        if *live == 0 {
            tracing::debug!("Last session released, shutting down transport context");
            self.inner.engine.shutdown();
        }
    }
}
