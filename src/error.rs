use std::path::PathBuf;
use thiserror::Error;

use crate::session::SessionState;

#[derive(Error, Debug)]
pub enum ScpError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid port '{value}': expected a number between 1 and 65535")]
    InvalidPort { value: String },

    #[error("Invalid remote target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("Cannot resolve {host}:{port}: {reason}")]
    Resolve {
        host: String,
        port: u16,
        reason: String,
    },

    #[error("Connection failed to {host}:{port}: {reason}")]
    ConnectionFailed {
        host: String,
        port: u16,
        reason: String,
    },

    #[error("SSH handshake failed: {0}")]
    Handshake(String),

    #[error("Authentication failed for user '{user}': {reason}")]
    AuthFailed { user: String, reason: String },

    #[error("Cannot {operation} while session is {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("Session closed")]
    SessionClosed,

    #[error("Unable to open SCP channel for '{remote}': {reason}")]
    ChannelOpen { remote: String, reason: String },

    #[error("Cannot read {}: {source}", path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Source is a directory, only single files can be uploaded: {}", path.display())]
    IsDirectory { path: PathBuf },

    #[error("Error writing '{remote}': {reason}")]
    RemoteWrite { remote: String, reason: String },

    #[error("Host key fingerprint mismatch: expected {expected}, got {actual}")]
    FingerprintMismatch { expected: String, actual: String },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl ScpError {
    /// Returns a user-friendly suggestion for how to fix the error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            ScpError::InvalidPort { .. } => Some("Pass the SSH port as a number, e.g. -P 22."),
            ScpError::InvalidTarget { .. } => {
                Some("Use the form [user@]host:/remote/path, e.g. deploy@example.com:/tmp/app.tar")
            }
            ScpError::Resolve { .. } => Some("Check the host name spelling and your DNS setup."),
            ScpError::ConnectionFailed { .. } => {
                Some("Check that the host is reachable and the port is correct.")
            }
            ScpError::AuthFailed { .. } => Some("Check the username and password."),
            ScpError::ChannelOpen { .. } => {
                Some("Check that the remote directory exists and is writable.")
            }
            ScpError::LocalIo { .. } => Some("Check the path exists and is readable."),
            ScpError::IsDirectory { .. } => {
                Some("Archive the directory first, then upload the archive.")
            }
            ScpError::FingerprintMismatch { .. } => Some(
                "The server's host key changed. Verify it out-of-band before reconnecting.",
            ),
            _ => None,
        }
    }

    /// Build a `LocalIo` error for `path`.
    pub(crate) fn local_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ScpError::LocalIo {
            path: path.into(),
            source,
        }
    }
}

impl From<toml::de::Error> for ScpError {
    fn from(err: toml::de::Error) -> Self {
        ScpError::Config(format!("Invalid config file: {}", err))
    }
}

impl From<serde_json::Error> for ScpError {
    fn from(err: serde_json::Error) -> Self {
        ScpError::Config(err.to_string())
    }
}
