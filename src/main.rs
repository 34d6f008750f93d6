use clap::Parser;
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

use scpup::cli::args::{Cli, Commands, FingerprintArgs, SendArgs};
use scpup::cli::target::RemoteTarget;
use scpup::config::paths::default_config_path;
use scpup::config::types::validate_chunk_size;
use scpup::config::{ClientConfig, Verbosity};
use scpup::progress::create_upload_progress;
use scpup::session::fingerprint::fingerprints_match;
use scpup::{
    open, Credential, ScpError, SshSession, Ssh2Engine, TransferDescriptor, TransportContext,
};

/// Environment variable holding the password for non-interactive use.
const PASSWORD_ENV: &str = "SCPUP_PASSWORD";

/// Password prompts offered before giving up.
const MAX_PASSWORD_ATTEMPTS: u32 = 3;

fn main() {
    let cli = Cli::parse();

    // Convert CLI flags to verbosity level
    let verbosity = Verbosity::from((cli.quiet, cli.verbose));

    // RUST_LOG env var overrides CLI flags
    let filter = verbosity.as_tracing_filter();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr) // Keep stdout clean for output
        .init();

    tracing::debug!("Verbosity level: {:?}", verbosity);

    if let Err(err) = run(cli) {
        display_error(&err);
        std::process::exit(1);
    }
}

/// Execute the dispatched command.
fn run(cli: Cli) -> Result<(), ScpError> {
    let config = load_config(&cli)?;
    match cli.command {
        Commands::Fingerprint(args) => fingerprint(args, config),
        Commands::Send(args) => send(args, config, cli.quiet),
    }
}

fn load_config(cli: &Cli) -> Result<ClientConfig, ScpError> {
    match &cli.config {
        Some(path) => {
            if !path.exists() {
                return Err(ScpError::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            ClientConfig::load(path)
        }
        None => match default_config_path() {
            Ok(path) => ClientConfig::load(&path),
            Err(e) => {
                tracing::debug!("{}, using defaults", e);
                Ok(ClientConfig::default())
            }
        },
    }
}

fn context(config: &ClientConfig) -> TransportContext<Ssh2Engine> {
    TransportContext::new(Ssh2Engine::new().with_timeout(config.io_timeout))
}

fn fingerprint(args: FingerprintArgs, mut config: ClientConfig) -> Result<(), ScpError> {
    if let Some(hash) = args.hash {
        config.fingerprint_hash = hash.into();
    }
    let port = args.port.unwrap_or_else(|| config.port.to_string());

    let ctx = context(&config);
    let mut session = open(&ctx, &args.host, &port, &config)?;
    println!("{}", session.host_key_fingerprint()?);
    session.close();
    Ok(())
}

fn send(args: SendArgs, mut config: ClientConfig, quiet: bool) -> Result<(), ScpError> {
    if let Some(hash) = args.hash {
        config.fingerprint_hash = hash.into();
    }
    if let Some(size) = args.chunk_size {
        config.chunk_size = validate_chunk_size(size)?;
    }

    let target = RemoteTarget::parse(&args.target)?;
    // Local problems are reported before any network I/O.
    let descriptor = TransferDescriptor::from_local(&args.source, &target.path)?;
    let user = target.effective_user()?;
    let port = args.port.unwrap_or_else(|| config.port.to_string());

    let ctx = context(&config);
    let mut session = open(&ctx, &target.host, &port, &config)?;

    let actual = session.host_key_fingerprint()?;
    if let Some(expected) = &args.expect_fingerprint {
        if !fingerprints_match(expected, &actual) {
            return Err(ScpError::FingerprintMismatch {
                expected: expected.clone(),
                actual,
            });
        }
        tracing::debug!("Host key fingerprint matches the pinned value");
    } else {
        tracing::info!(
            "Host key fingerprint ({}): {}",
            config.fingerprint_hash.name(),
            actual
        );
    }

    authenticate(&mut session, &user, &target.host)?;

    let progress = create_upload_progress(descriptor.size, quiet || args.json);
    let result = session.upload(&descriptor, &progress);
    progress.finish_and_clear();
    let result = result?;
    session.close();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        result.print_summary(quiet);
    }
    Ok(())
}

/// Authenticate with the password from the environment, or prompt for it.
///
/// A rejected prompt answer is retried on the same session.
fn authenticate(session: &mut SshSession, user: &str, host: &str) -> Result<(), ScpError> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        let password = Zeroizing::new(password);
        return session.authenticate(&Credential::password(user, password.as_str()));
    }

    let mut attempt = 1;
    loop {
        let password = rpassword::prompt_password(format!("Password for {}@{}: ", user, host))
            .map(Zeroizing::new)
            .map_err(|e| ScpError::AuthFailed {
                user: user.to_string(),
                reason: format!("cannot read password: {}", e),
            })?;

        match session.authenticate(&Credential::password(user, password.as_str())) {
            Ok(()) => return Ok(()),
            Err(err @ ScpError::AuthFailed { .. }) if attempt < MAX_PASSWORD_ATTEMPTS => {
                eprintln!("{}", err);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Display an ScpError with optional suggestion hint to stderr.
fn display_error(err: &ScpError) {
    eprintln!("error: {}", err);
    if let Some(suggestion) = err.suggestion() {
        eprintln!("  hint: {}", suggestion);
    }
}
