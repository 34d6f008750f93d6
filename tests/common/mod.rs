//! Scripted in-memory transport engine shared by the integration tests.
//!
//! `MockEngine` records every init/shutdown/create/release call in
//! `Counters` and stores uploaded files in a shared map so tests can compare
//! remote content with the source.

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use scpup::session::auth::Credential;
use scpup::session::fingerprint::HashAlgorithm;
use scpup::session::{Session, SessionOptions};
use scpup::transport::{Engine, EngineSession, SendChannel, TransportContext, TransportError};
use tempfile::TempDir;

pub const USER: &str = "deploy";
pub const PASSWORD: &str = "correct horse";

#[derive(Default, Debug)]
pub struct Counters {
    pub inits: AtomicUsize,
    pub shutdowns: AtomicUsize,
    pub sessions_created: AtomicUsize,
    pub sessions_released: AtomicUsize,
    pub disconnects: AtomicUsize,
    pub channels_opened: AtomicUsize,
    pub channels_released: AtomicUsize,
}

pub fn count(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::SeqCst);
}

/// How the mock engine behaves.
#[derive(Debug, Clone)]
pub struct Script {
    pub fail_handshake: bool,
    pub provide_host_key: bool,
    pub fail_disconnect: bool,
    pub fail_channel_open: bool,
    /// Most bytes accepted per channel write.
    pub max_write: usize,
    /// Fail the n-th write (1-based) of every channel.
    pub fail_write_at: Option<usize>,
    pub fail_send_eof: bool,
    pub fail_wait_closed: bool,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            fail_handshake: false,
            provide_host_key: true,
            fail_disconnect: false,
            fail_channel_open: false,
            max_write: usize::MAX,
            fail_write_at: None,
            fail_send_eof: false,
            fail_wait_closed: false,
        }
    }
}

/// A file as received by the mock server.
#[derive(Debug, Clone, Default)]
pub struct RemoteFile {
    pub mode: i32,
    pub declared_size: u64,
    pub data: Vec<u8>,
    pub eof: bool,
    pub closed: bool,
}

pub type RemoteStore = Arc<Mutex<HashMap<String, RemoteFile>>>;

#[derive(Clone, Default)]
pub struct MockEngine {
    pub counters: Arc<Counters>,
    pub script: Script,
    pub remote: RemoteStore,
}

impl MockEngine {
    pub fn with_script(script: Script) -> Self {
        Self {
            script,
            ..Self::default()
        }
    }

    pub fn remote_file(&self, path: &str) -> Option<RemoteFile> {
        self.remote.lock().unwrap().get(path).cloned()
    }
}

/// Deterministic fake host key hash of the algorithm's length.
pub fn fake_host_key(algorithm: HashAlgorithm) -> Vec<u8> {
    (0..algorithm.digest_len())
        .map(|i| (i as u8).wrapping_mul(29).wrapping_add(7))
        .collect()
}

impl Engine for MockEngine {
    type Session = MockSession;

    fn init(&self) -> Result<(), TransportError> {
        bump(&self.counters.inits);
        Ok(())
    }

    fn shutdown(&self) {
        bump(&self.counters.shutdowns);
    }

    fn create_session(&self, socket: Arc<TcpStream>) -> Result<MockSession, TransportError> {
        bump(&self.counters.sessions_created);
        Ok(MockSession {
            _socket: socket,
            counters: Arc::clone(&self.counters),
            script: self.script.clone(),
            remote: Arc::clone(&self.remote),
        })
    }
}

pub struct MockSession {
    _socket: Arc<TcpStream>,
    counters: Arc<Counters>,
    script: Script,
    remote: RemoteStore,
}

impl EngineSession for MockSession {
    type Channel = MockChannel;

    fn handshake(&mut self) -> Result<(), TransportError> {
        if self.script.fail_handshake {
            return Err(TransportError::with_code(-13, "banner exchange failed"));
        }
        Ok(())
    }

    fn host_key_hash(&self, algorithm: HashAlgorithm) -> Option<Vec<u8>> {
        self.script
            .provide_host_key
            .then(|| fake_host_key(algorithm))
    }

    fn authenticate(&self, credential: &Credential) -> Result<(), TransportError> {
        match credential {
            Credential::Password { user, password }
                if user == USER && password.as_str() == PASSWORD =>
            {
                Ok(())
            }
            _ => Err(TransportError::with_code(-18, "authentication error")),
        }
    }

    fn open_send_channel(
        &self,
        remote: &str,
        mode: i32,
        size: u64,
    ) -> Result<MockChannel, TransportError> {
        if self.script.fail_channel_open {
            return Err(TransportError::with_code(-28, "unable to open a ssh channel"));
        }
        bump(&self.counters.channels_opened);
        self.remote.lock().unwrap().insert(
            remote.to_string(),
            RemoteFile {
                mode,
                declared_size: size,
                ..RemoteFile::default()
            },
        );
        Ok(MockChannel {
            path: remote.to_string(),
            counters: Arc::clone(&self.counters),
            script: self.script.clone(),
            remote: Arc::clone(&self.remote),
            writes: 0,
        })
    }

    fn disconnect(&self, _description: &str) -> Result<(), TransportError> {
        bump(&self.counters.disconnects);
        if self.script.fail_disconnect {
            return Err(TransportError::new("socket already gone"));
        }
        Ok(())
    }
}

impl Drop for MockSession {
    fn drop(&mut self) {
        bump(&self.counters.sessions_released);
    }
}

pub struct MockChannel {
    path: String,
    counters: Arc<Counters>,
    script: Script,
    remote: RemoteStore,
    writes: usize,
}

impl MockChannel {
    fn with_file<T>(&self, f: impl FnOnce(&mut RemoteFile) -> T) -> T {
        let mut store = self.remote.lock().unwrap();
        f(store.get_mut(&self.path).expect("channel file registered"))
    }
}

impl SendChannel for MockChannel {
    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        self.writes += 1;
        if self.script.fail_write_at == Some(self.writes) {
            return Err(TransportError::with_code(-7, "unable to send channel data"));
        }
        let n = data.len().min(self.script.max_write);
        self.with_file(|file| file.data.extend_from_slice(&data[..n]));
        Ok(n)
    }

    fn send_eof(&mut self) -> Result<(), TransportError> {
        if self.script.fail_send_eof {
            return Err(TransportError::with_code(-7, "unable to send EOF"));
        }
        self.with_file(|file| file.eof = true);
        Ok(())
    }

    fn wait_eof(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn wait_closed(&mut self) -> Result<(), TransportError> {
        if self.script.fail_wait_closed {
            return Err(TransportError::with_code(-9, "timed out waiting for channel close"));
        }
        self.with_file(|file| file.closed = true);
        Ok(())
    }
}

impl Drop for MockChannel {
    fn drop(&mut self) {
        bump(&self.counters.channels_released);
    }
}

/// A connected loopback socket. Keep the listener alive for the test.
pub fn loopback_socket() -> (TcpStream, TcpListener) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let socket = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
    (socket, listener)
}

/// Open a Connected session over a loopback socket.
pub fn open_session(
    ctx: &TransportContext<MockEngine>,
    options: SessionOptions,
) -> (Session<MockEngine>, TcpListener) {
    let (socket, listener) = loopback_socket();
    let session = Session::open(ctx, socket, options).expect("session opens");
    (session, listener)
}

/// Open and authenticate a session.
pub fn authenticated_session(
    ctx: &TransportContext<MockEngine>,
    options: SessionOptions,
) -> (Session<MockEngine>, TcpListener) {
    let (mut session, listener) = open_session(ctx, options);
    session.authenticate_password(USER, PASSWORD).expect("authenticates");
    (session, listener)
}

/// Helper: create a file with given content in a temp directory.
pub fn create_file_in(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

/// Non-repeating-ish sample payload.
pub fn sample(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 256) as u8).collect()
}
