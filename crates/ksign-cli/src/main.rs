//! ksign CLI - canonicalize, inspect and sign JSON documents.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use ksign_canonical::CanonicalProfile;
use ksign_core::{KsiCommandSigner, SignerConfig};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{canonicalize, prepare, sign};

#[derive(Parser)]
#[command(name = "ksign")]
#[command(about = "Canonical JSON and KSI signing CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show canonical bytes for input JSON
    Canonicalize {
        /// Input JSON file (or stdin if not provided)
        input: Option<String>,
        /// Canonicalization profile
        #[arg(long, default_value = "ksign-ordinal-v1")]
        profile: CanonicalProfile,
    },
    /// Show the exact payload that would be signed for a document
    Prepare {
        /// Input JSON file (or stdin if not provided)
        input: Option<String>,
        /// Canonicalization profile
        #[arg(long, default_value = "ksign-ordinal-v1")]
        profile: CanonicalProfile,
        /// Print the payload digest instead of the payload
        #[arg(long)]
        digest: bool,
    },
    /// Sign a document with the ksi tool and print the signed document
    Sign {
        /// Input JSON file (or stdin if not provided)
        input: Option<String>,
        #[command(flatten)]
        ksi: KsiOptions,
    },
}

/// Aggregator and signing tool settings for `sign`.
#[derive(Args)]
pub struct KsiOptions {
    /// KSI aggregator endpoint
    #[arg(long, env = "AGGR_URL", default_value = SignerConfig::DEFAULT_AGGREGATOR_URL)]
    aggr_url: String,
    /// KSI aggregator user
    #[arg(long, env = "AGGR_USER", default_value = "anon")]
    aggr_user: String,
    /// KSI aggregator key
    #[arg(long, env = "AGGR_PASSWORD", default_value = "anon", hide_env_values = true)]
    aggr_password: String,
    /// Signing tool to run
    #[arg(long, env = "KSI_BIN", default_value = KsiCommandSigner::DEFAULT_PROGRAM)]
    ksi_bin: PathBuf,
    /// Extra argument placed before the `sign` subcommand (repeatable)
    #[arg(long = "ksi-arg", allow_hyphen_values = true)]
    ksi_args: Vec<String>,
    /// Seconds to wait for the signing tool before killing it
    #[arg(long, env = "KSI_TIMEOUT_SECS", default_value_t = 30)]
    ksi_timeout_secs: u64,
    /// Canonicalization profile
    #[arg(long, env = "CANONICAL_PROFILE", default_value = "ksign-ordinal-v1")]
    profile: CanonicalProfile,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Canonicalize { input, profile } => canonicalize::run(input, profile),
        Commands::Prepare {
            input,
            profile,
            digest,
        } => prepare::run(input, profile, digest),
        Commands::Sign { input, ksi } => sign::run(input, ksi),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
