//! Chunked SCP upload over an engine send channel.
//!
//! Resources are acquired in the order channel -> local file and released in
//! the reverse order on every exit path. A short write from the channel is
//! not an error: the unwritten tail of the chunk is retried until the whole
//! chunk is flushed.

use std::fs::{File, Metadata};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use bytesize::ByteSize;
use indicatif::ProgressBar;
use serde::Serialize;

use crate::error::ScpError;
use crate::transport::{EngineSession, SendChannel};

/// Default chunk size in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Largest accepted chunk size (1 MiB).
pub const MAX_CHUNK_SIZE: usize = 1024 * 1024;

/// Consecutive zero-byte writes tolerated before the channel is declared stuck.
pub const MAX_STALLED_WRITES: u32 = 64;

/// What is being uploaded, fixed at transfer start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferDescriptor {
    pub local_path: PathBuf,
    /// Remote path, passed to the engine verbatim.
    pub remote_path: String,
    /// Permission bits (`0o777` mask).
    pub mode: i32,
    pub size: u64,
}

impl TransferDescriptor {
    /// Build a descriptor from the local file's metadata.
    pub fn from_local(local: impl AsRef<Path>, remote: &str) -> Result<Self, ScpError> {
        let local = local.as_ref();
        let metadata =
            std::fs::metadata(local).map_err(|e| ScpError::local_io(local, e))?;
        if metadata.is_dir() {
            return Err(ScpError::IsDirectory {
                path: local.to_path_buf(),
            });
        }

        Ok(Self {
            local_path: local.to_path_buf(),
            remote_path: remote.to_string(),
            mode: permission_bits(&metadata),
            size: metadata.len(),
        })
    }
}

#[cfg(unix)]
fn permission_bits(metadata: &Metadata) -> i32 {
    use std::os::unix::fs::PermissionsExt;
    (metadata.permissions().mode() & 0o777) as i32
}

#[cfg(not(unix))]
fn permission_bits(metadata: &Metadata) -> i32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

/// Outcome of a completed upload.
#[derive(Debug, Clone, Serialize)]
pub struct TransferResult {
    pub local_path: PathBuf,
    pub remote_path: String,
    pub mode: i32,
    pub bytes: u64,
    pub elapsed: Duration,
}

impl TransferResult {
    /// Average throughput in bytes per second.
    pub fn throughput_bps(&self) -> u64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            (self.bytes as f64 / secs) as u64
        } else {
            0
        }
    }

    /// Print a human-readable completion summary to stderr.
    ///
    /// ```text
    /// Completed: app.tar -> /srv/app.tar (2.4 MB) in 1.2s @ 2.0 MB/s
    /// ```
    pub fn print_summary(&self, quiet: bool) {
        if quiet {
            return;
        }
        eprintln!(
            "Completed: {} -> {} ({}) in {:.1}s @ {}/s",
            self.local_path.display(),
            self.remote_path,
            ByteSize(self.bytes),
            self.elapsed.as_secs_f64(),
            ByteSize(self.throughput_bps()),
        );
    }
}

/// Upload `descriptor` over a new send channel on `transport`.
pub fn send<S: EngineSession>(
    transport: &S,
    descriptor: &TransferDescriptor,
    chunk_size: usize,
    progress: &ProgressBar,
) -> Result<TransferResult, ScpError> {
    let started = Instant::now();
    let remote = &descriptor.remote_path;

    let mut channel = transport
        .open_send_channel(remote, descriptor.mode, descriptor.size)
        .map_err(|e| ScpError::ChannelOpen {
            remote: remote.clone(),
            reason: e.message,
        })?;
    tracing::debug!(
        remote = %remote,
        mode = %format!("{:o}", descriptor.mode),
        size = descriptor.size,
        "Opened SCP channel"
    );

    // `channel` is dropped (released) on every early return below, after
    // `file` when both are live.
    let file = File::open(&descriptor.local_path)
        .map_err(|e| ScpError::local_io(&descriptor.local_path, e))?;

    // No point allocating more than the file can fill.
    let chunk_size = chunk_size.min(usize::try_from(descriptor.size.max(1)).unwrap_or(usize::MAX));
    progress.set_length(descriptor.size);
    let sent = stream_chunks(file.take(descriptor.size), &mut channel, chunk_size, progress)
    .map_err(|e| e.into_scp_error(descriptor))?;

    if sent != descriptor.size {
        return Err(ScpError::local_io(
            &descriptor.local_path,
            io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "file shrank during transfer: expected {} bytes, read {}",
                    descriptor.size, sent
                ),
            ),
        ));
    }

    finish(&mut channel).map_err(|e| ScpError::RemoteWrite {
        remote: remote.clone(),
        reason: e.message,
    })?;
    drop(channel);

    tracing::info!(remote = %remote, bytes = sent, "Upload complete");
    Ok(TransferResult {
        local_path: descriptor.local_path.clone(),
        remote_path: remote.clone(),
        mode: descriptor.mode,
        bytes: sent,
        elapsed: started.elapsed(),
    })
}

fn finish<C: SendChannel>(channel: &mut C) -> Result<(), crate::transport::TransportError> {
    channel.send_eof()?;
    channel.wait_eof()?;
    channel.wait_closed()?;
    Ok(())
}

/// Failure inside the streaming loop, before it is tied to a descriptor.
#[derive(Debug)]
pub enum StreamError {
    Read(io::Error),
    Write(String),
}

impl StreamError {
    fn into_scp_error(self, descriptor: &TransferDescriptor) -> ScpError {
        match self {
            StreamError::Read(e) => ScpError::local_io(&descriptor.local_path, e),
            StreamError::Write(reason) => ScpError::RemoteWrite {
                remote: descriptor.remote_path.clone(),
                reason,
            },
        }
    }
}

/// Copy `reader` into `channel` one chunk at a time until EOF.
///
/// Returns the number of bytes written. The reader is consumed (and dropped)
/// before this returns. `chunk_size` is clamped to `1..=MAX_CHUNK_SIZE`.
///
/// A write returning an error is a [`StreamError::Write`]. A write accepting
/// zero bytes is retried, but [`MAX_STALLED_WRITES`] zero-byte writes in a row
/// are also reported as [`StreamError::Write`] so a stuck channel cannot spin
/// forever.
pub fn stream_chunks<R: Read, C: SendChannel>(
    mut reader: R,
    channel: &mut C,
    chunk_size: usize,
    progress: &ProgressBar,
) -> Result<u64, StreamError> {
    let mut buf = vec![0u8; chunk_size.clamp(1, MAX_CHUNK_SIZE)];
    let mut total: u64 = 0;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(StreamError::Read(e)),
        };

        let mut pending = &buf[..n];
        let mut stalled = 0;
        while !pending.is_empty() {
            let written = channel
                .write(pending)
                .map_err(|e| StreamError::Write(e.message))?;
            if written == 0 {
                stalled += 1;
                if stalled >= MAX_STALLED_WRITES {
                    return Err(StreamError::Write(format!(
                        "channel accepted no data after {} attempts",
                        stalled
                    )));
                }
                continue;
            }
            stalled = 0;
            if written < pending.len() {
                tracing::trace!(written, remaining = pending.len() - written, "Short write");
            }
            pending = &pending[written.min(pending.len())..];
        }

        total += n as u64;
        progress.inc(n as u64);
    }

    Ok(total)
}
