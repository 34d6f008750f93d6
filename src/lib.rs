//! Minimal SCP upload client.
//!
//! ```no_run
//! use scpup::{open, ClientConfig, Ssh2Engine, TransportContext};
//!
//! # fn main() -> Result<(), scpup::ScpError> {
//! let ctx = TransportContext::new(Ssh2Engine::new());
//! let mut session = open(&ctx, "example.com", "22", &ClientConfig::default())?;
//! println!("host key: {}", session.host_key_fingerprint()?);
//! session.authenticate_password("deploy", "secret")?;
//! let result = session.upload_file("app.tar", "/srv/app.tar")?;
//! println!("sent {} bytes", result.bytes);
//! session.close();
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod net;
pub mod progress;
pub mod scp;
pub mod session;
pub mod transport;

pub use config::ClientConfig;
pub use error::ScpError;
pub use scp::{TransferDescriptor, TransferResult};
pub use session::auth::Credential;
pub use session::fingerprint::{format_fingerprint, HashAlgorithm};
pub use session::{open, AbortHandle, Session, SessionState};
pub use transport::{Ssh2Engine, TransportContext, TransportError};

/// A session over the libssh2 engine.
pub type SshSession = Session<Ssh2Engine>;
