//! Network plumbing below the SSH layer.

pub mod dial;

pub use dial::{dial, parse_port, DialOptions, DEFAULT_SSH_PORT};
