//! Host-identity fingerprints.
//!
//! The server's host key hash is captured once, right after the handshake,
//! and only ever shown in its colon-separated uppercase hex form
//! (`AB:CD:...`).

use std::fmt;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

/// Hash algorithm used for the host key fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Md5,
    #[default]
    Sha1,
    Sha256,
}

impl HashAlgorithm {
    /// Digest length in bytes.
    pub fn digest_len(&self) -> usize {
        match self {
            HashAlgorithm::Md5 => 16,
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Sha256 => 32,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Md5 => "MD5",
            HashAlgorithm::Sha1 => "SHA1",
            HashAlgorithm::Sha256 => "SHA256",
        }
    }
}

/// Format raw hash bytes as `AB:CD:EF`.
///
/// The output is allocated for exactly `3 * len - 1` characters. Empty input
/// yields an empty string.
pub fn format_fingerprint(hash: &[u8]) -> String {
    let mut out = String::with_capacity((hash.len() * 3).saturating_sub(1));
    for (i, byte) in hash.iter().enumerate() {
        if i > 0 {
            out.push(':');
        }
        // Writing into a String cannot fail.
        let _ = write!(out, "{:02X}", byte);
    }
    out
}

/// Compare two formatted fingerprints, ignoring case and surrounding
/// whitespace. The byte comparison runs in constant time.
pub fn fingerprints_match(expected: &str, actual: &str) -> bool {
    let expected = expected.trim().to_ascii_uppercase();
    let actual = actual.trim().to_ascii_uppercase();
    expected.len() == actual.len() && expected.as_bytes().ct_eq(actual.as_bytes()).into()
}

/// Host key hash captured at handshake time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    algorithm: HashAlgorithm,
    bytes: Vec<u8>,
}

impl Fingerprint {
    pub fn new(algorithm: HashAlgorithm, bytes: Vec<u8>) -> Self {
        Self { algorithm, bytes }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_fingerprint(&self.bytes))
    }
}
