//! Parsing of `[user@]host:/remote/path` upload targets.

use crate::error::ScpError;

/// A parsed remote target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    pub user: Option<String>,
    pub host: String,
    pub path: String,
}

impl RemoteTarget {
    /// Parse `[user@]host:path`. IPv6 hosts go in brackets: `[::1]:path`.
    pub fn parse(target: &str) -> Result<Self, ScpError> {
        let invalid = |reason: &str| ScpError::InvalidTarget {
            target: target.to_string(),
            reason: reason.to_string(),
        };

        let (user, rest) = match target.split_once('@') {
            Some((user, rest)) => {
                if user.is_empty() {
                    return Err(invalid("empty user name"));
                }
                (Some(user.to_string()), rest)
            }
            None => (None, target),
        };

        let (host, path) = if let Some(bracketed) = rest.strip_prefix('[') {
            let (host, after) = bracketed
                .split_once(']')
                .ok_or_else(|| invalid("unterminated '[' in host"))?;
            let path = after
                .strip_prefix(':')
                .ok_or_else(|| invalid("missing ':' after host"))?;
            (host, path)
        } else {
            rest.split_once(':')
                .ok_or_else(|| invalid("missing ':' between host and path"))?
        };

        if host.is_empty() {
            return Err(invalid("empty host"));
        }
        if path.is_empty() {
            return Err(invalid("empty remote path"));
        }

        Ok(Self {
            user,
            host: host.to_string(),
            path: path.to_string(),
        })
    }

    /// The explicit user, or the current system user.
    pub fn effective_user(&self) -> Result<String, ScpError> {
        match &self.user {
            Some(user) => Ok(user.clone()),
            None => current_username(),
        }
    }
}

/// Get the current system username for SSH authentication fallback.
///
/// Uses environment variables: USERNAME on Windows, USER on Unix.
fn current_username() -> Result<String, ScpError> {
    std::env::var("USERNAME")
        .or_else(|_| std::env::var("USER"))
        .map_err(|_| {
            ScpError::Config(
                "Cannot determine username: neither USERNAME nor USER is set. \
                 Specify the user in the target (user@host:/path)."
                    .to_string(),
            )
        })
}
