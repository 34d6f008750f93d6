use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ScpError;
use crate::net::{DialOptions, DEFAULT_SSH_PORT};
use crate::scp::{DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE};
use crate::session::fingerprint::HashAlgorithm;
use crate::session::SessionOptions;

/// Verbosity level controlling tracing output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Suppress all output except errors
    Quiet,
    /// Normal output (info level)
    Normal,
    /// Verbose output (debug level)
    Verbose,
    /// Maximum output (trace level)
    Trace,
}

impl From<(bool, u8)> for Verbosity {
    /// Convert from (quiet_flag, verbose_count) to Verbosity.
    ///
    /// - quiet=true -> Quiet (regardless of verbose count)
    /// - verbose=0  -> Normal
    /// - verbose=1  -> Verbose
    /// - verbose=2+ -> Trace
    fn from((quiet, verbose_count): (bool, u8)) -> Self {
        if quiet {
            Verbosity::Quiet
        } else {
            match verbose_count {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::Trace,
            }
        }
    }
}

impl Verbosity {
    /// Return the tracing filter string for this verbosity level.
    pub fn as_tracing_filter(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "info",
            Verbosity::Verbose => "debug",
            Verbosity::Trace => "trace",
        }
    }
}

/// On-disk `config.toml` format. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub port: Option<u16>,
    pub connect_timeout_secs: Option<u64>,
    /// 0 disables the socket deadline.
    pub io_timeout_secs: Option<u64>,
    pub chunk_size: Option<usize>,
    pub fingerprint_hash: Option<HashAlgorithm>,
}

/// Resolved client settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub port: u16,
    pub connect_timeout: Duration,
    pub io_timeout: Option<Duration>,
    pub chunk_size: usize,
    pub fingerprint_hash: HashAlgorithm,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let dial = DialOptions::default();
        Self {
            port: DEFAULT_SSH_PORT,
            connect_timeout: dial.connect_timeout,
            io_timeout: dial.io_timeout,
            chunk_size: DEFAULT_CHUNK_SIZE,
            fingerprint_hash: HashAlgorithm::default(),
        }
    }
}

impl ClientConfig {
    /// Parse a TOML document on top of the defaults.
    pub fn from_toml(contents: &str) -> Result<Self, ScpError> {
        let file: ConfigFile = toml::from_str(contents)?;
        Self::default().merge(file)
    }

    /// Load `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ScpError> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    fn merge(mut self, file: ConfigFile) -> Result<Self, ScpError> {
        if let Some(port) = file.port {
            if port == 0 {
                return Err(ScpError::Config("port must be between 1 and 65535".into()));
            }
            self.port = port;
        }
        if let Some(secs) = file.connect_timeout_secs {
            if secs == 0 {
                return Err(ScpError::Config("connect_timeout_secs must be positive".into()));
            }
            self.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = file.io_timeout_secs {
            self.io_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(size) = file.chunk_size {
            self.chunk_size = validate_chunk_size(size)?;
        }
        if let Some(hash) = file.fingerprint_hash {
            self.fingerprint_hash = hash;
        }
        Ok(self)
    }

    pub fn dial_options(&self) -> DialOptions {
        DialOptions {
            connect_timeout: self.connect_timeout,
            io_timeout: self.io_timeout,
        }
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            hash_algorithm: self.fingerprint_hash,
            chunk_size: self.chunk_size,
        }
    }
}

/// Chunk size must be between one byte and [`MAX_CHUNK_SIZE`].
pub fn validate_chunk_size(size: usize) -> Result<usize, ScpError> {
    if size == 0 {
        return Err(ScpError::Config("chunk_size must be positive".into()));
    }
    if size > MAX_CHUNK_SIZE {
        return Err(ScpError::Config(format!(
            "chunk_size must be at most {} bytes, got {}",
            MAX_CHUNK_SIZE, size
        )));
    }
    Ok(size)
}
