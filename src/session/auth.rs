//! Credentials accepted by `Session::authenticate`.
//!
//! Only password authentication is implemented. The enum is non-exhaustive so
//! key-file or agent variants can be added without breaking callers.

use std::fmt;

use zeroize::Zeroizing;

/// Authentication credential for an SSH session.
#[derive(Clone)]
#[non_exhaustive]
pub enum Credential {
    /// Username + password authentication.
    Password {
        user: String,
        password: Zeroizing<String>,
    },
}

impl Credential {
    pub fn password(user: impl Into<String>, password: impl Into<String>) -> Self {
        Credential::Password {
            user: user.into(),
            password: Zeroizing::new(password.into()),
        }
    }

    /// The user this credential authenticates as.
    pub fn user(&self) -> &str {
        match self {
            Credential::Password { user, .. } => user,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Password { user, .. } => f
                .debug_struct("Password")
                .field("user", user)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}
