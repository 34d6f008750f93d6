//! Upload against a real SSH server.
//!
//! Requires environment variables:
//! - SCP_TEST_HOST: hostname or IP of the test server
//! - SCP_TEST_PORT: SSH port (default 22)
//! - SCP_TEST_USER / SCP_TEST_PASSWORD: password credentials
//! - SCP_TEST_PATH: writable remote directory (default /tmp)
//!
//! Run with: cargo test --test real_server -- --ignored

use scpup::{ClientConfig, ScpError, SessionState, Ssh2Engine, TransportContext};
use std::fs;
use tempfile::TempDir;

struct Server {
    host: String,
    port: String,
    user: String,
    password: String,
    path: String,
}

fn server() -> Server {
    Server {
        host: std::env::var("SCP_TEST_HOST").expect("SCP_TEST_HOST not set"),
        port: std::env::var("SCP_TEST_PORT").unwrap_or_else(|_| "22".to_string()),
        user: std::env::var("SCP_TEST_USER").expect("SCP_TEST_USER not set"),
        password: std::env::var("SCP_TEST_PASSWORD").expect("SCP_TEST_PASSWORD not set"),
        path: std::env::var("SCP_TEST_PATH").unwrap_or_else(|_| "/tmp".to_string()),
    }
}

#[test]
#[ignore] // Requires SSH server: SCP_TEST_HOST, SCP_TEST_USER, SCP_TEST_PASSWORD env vars
fn upload_to_real_server() {
    let server = server();
    let ctx = TransportContext::new(Ssh2Engine::new());
    let config = ClientConfig::default();
    let mut session = scpup::open(&ctx, &server.host, &server.port, &config).unwrap();

    let fp = session.host_key_fingerprint().unwrap();
    assert_eq!(fp.split(':').count(), 20);

    let err = session
        .authenticate_password(&server.user, "definitely-not-the-password")
        .unwrap_err();
    assert!(matches!(err, ScpError::AuthFailed { .. }));
    assert_eq!(session.state(), SessionState::Connected);

    session
        .authenticate_password(&server.user, &server.password)
        .unwrap();

    let dir = TempDir::new().unwrap();
    let source = dir.path().join("scpup-test.bin");
    fs::write(&source, vec![0x42u8; 10_000]).unwrap();
    let remote = format!("{}/scpup-test.bin", server.path);

    let result = session.upload_file(&source, &remote).unwrap();
    assert_eq!(result.bytes, 10_000);

    session.close();
    session.close();
    assert_eq!(ctx.live_sessions(), 0);
}
