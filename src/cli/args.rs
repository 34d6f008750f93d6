use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::session::fingerprint::HashAlgorithm;

#[derive(Parser, Debug)]
#[command(name = "scpup", version, about = "Upload a file over SCP")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v for verbose, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode: suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: <config dir>/scpup/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the host key fingerprint of a server
    Fingerprint(FingerprintArgs),

    /// Upload a single file
    Send(SendArgs),
}

/// Arguments for the `scpup fingerprint` command.
#[derive(clap::Args, Debug)]
pub struct FingerprintArgs {
    /// Host name or address
    pub host: String,

    /// SSH port
    #[arg(short = 'P', long)]
    pub port: Option<String>,

    /// Host key hash algorithm
    #[arg(long, value_enum)]
    pub hash: Option<HashArg>,
}

/// Arguments for the `scpup send` command.
#[derive(clap::Args, Debug)]
pub struct SendArgs {
    /// Local file to upload
    pub source: PathBuf,

    /// Remote target: [user@]host:/remote/path
    pub target: String,

    /// SSH port
    #[arg(short = 'P', long)]
    pub port: Option<String>,

    /// Bytes read and written per loop iteration
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Abort unless the server's fingerprint matches (AA:BB:...)
    #[arg(long)]
    pub expect_fingerprint: Option<String>,

    /// Host key hash algorithm
    #[arg(long, value_enum)]
    pub hash: Option<HashArg>,

    /// Print the transfer result as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

/// `--hash` values.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashArg {
    Md5,
    Sha1,
    Sha256,
}

impl From<HashArg> for HashAlgorithm {
    fn from(arg: HashArg) -> Self {
        match arg {
            HashArg::Md5 => HashAlgorithm::Md5,
            HashArg::Sha1 => HashAlgorithm::Sha1,
            HashArg::Sha256 => HashAlgorithm::Sha256,
        }
    }
}
