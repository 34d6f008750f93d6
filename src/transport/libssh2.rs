//! `Engine` implementation on the ssh2 crate (libssh2 bindings).
//!
//! # Thread safety
//!
//! libssh2 is not thread-safe per session. `Ssh2Session` is owned by exactly
//! one `Session`, which is driven from one thread at a time, so no locking
//! happens at this layer.

use std::io::Write;
use std::net::TcpStream;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use ssh2::{Channel, DisconnectCode, ErrorCode, HashType};

use crate::session::auth::Credential;
use crate::session::fingerprint::HashAlgorithm;
use crate::transport::{Engine, EngineSession, SendChannel, TransportError};

/// libssh2-backed transport engine.
#[derive(Debug, Clone, Default)]
pub struct Ssh2Engine {
    timeout: Option<Duration>,
}

impl Ssh2Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a blocking-call timeout to every session this engine creates.
    ///
    /// libssh2 polls the socket itself, so socket-level deadlines alone do
    /// not bound its waits.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Engine for Ssh2Engine {
    type Session = Ssh2Session;

    fn init(&self) -> Result<(), TransportError> {
        ssh2::init();
        Ok(())
    }

    fn shutdown(&self) {
        // The ssh2 crate initializes libssh2 once per process and never
        // exposes libssh2_exit, so there is nothing left to release here.
        tracing::trace!("libssh2 context released");
    }

    fn create_session(&self, socket: Arc<TcpStream>) -> Result<Ssh2Session, TransportError> {
        let mut session = ssh2::Session::new()?;
        session.set_tcp_stream(socket);
        if let Some(timeout) = self.timeout {
            let millis = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX);
            session.set_timeout(millis);
        }
        Ok(Ssh2Session { session })
    }
}

/// A libssh2 session bound to one socket.
pub struct Ssh2Session {
    session: ssh2::Session,
}

impl EngineSession for Ssh2Session {
    type Channel = Ssh2Channel;

    fn handshake(&mut self) -> Result<(), TransportError> {
        self.session.handshake()?;
        Ok(())
    }

    fn host_key_hash(&self, algorithm: HashAlgorithm) -> Option<Vec<u8>> {
        let hash_type = match algorithm {
            HashAlgorithm::Md5 => HashType::Md5,
            HashAlgorithm::Sha1 => HashType::Sha1,
            HashAlgorithm::Sha256 => HashType::Sha256,
        };
        self.session.host_key_hash(hash_type).map(|hash| hash.to_vec())
    }

    fn authenticate(&self, credential: &Credential) -> Result<(), TransportError> {
        match credential {
            Credential::Password { user, password } => {
                self.session.userauth_password(user, password)?;
            }
        }
        if self.session.authenticated() {
            Ok(())
        } else {
            Err(TransportError::new("server did not accept the credentials"))
        }
    }

    fn open_send_channel(
        &self,
        remote: &str,
        mode: i32,
        size: u64,
    ) -> Result<Ssh2Channel, TransportError> {
        let channel = self.session.scp_send(Path::new(remote), mode, size, None)?;
        Ok(Ssh2Channel { channel })
    }

    fn disconnect(&self, description: &str) -> Result<(), TransportError> {
        self.session
            .disconnect(Some(DisconnectCode::ByApplication), description, None)?;
        Ok(())
    }
}

/// An SCP send channel.
pub struct Ssh2Channel {
    channel: Channel,
}

impl SendChannel for Ssh2Channel {
    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        self.channel.write(data).map_err(|e| {
            TransportError::with_code(e.raw_os_error().unwrap_or(0), e.to_string())
        })
    }

    fn send_eof(&mut self) -> Result<(), TransportError> {
        self.channel.send_eof()?;
        Ok(())
    }

    fn wait_eof(&mut self) -> Result<(), TransportError> {
        self.channel.wait_eof()?;
        Ok(())
    }

    fn wait_closed(&mut self) -> Result<(), TransportError> {
        self.channel.wait_close()?;
        Ok(())
    }
}

impl From<ssh2::Error> for TransportError {
    fn from(err: ssh2::Error) -> Self {
        let code = match err.code() {
            ErrorCode::Session(code) => code,
            ErrorCode::SFTP(code) => code,
        };
        TransportError::with_code(code, err.message())
    }
}
