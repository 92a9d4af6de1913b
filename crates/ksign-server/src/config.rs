//! Process configuration, read once from flags and environment.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::builder::NonEmptyStringValueParser;
use clap::{Args, Parser, ValueEnum};
use ksign_canonical::{CanonicalProfile, Canonicalizer};
use ksign_core::{KsiCommandSigner, Pipeline, SignerConfig};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per event.
    Json,
}

/// Server configuration.
#[derive(Clone, Parser)]
#[command(name = "ksign-server")]
#[command(about = "Canonicalize JSON documents and attach KSI signatures over HTTP")]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, env = "KSIGN_HOST", default_value = "127.0.0.1")]
    pub host: String,
    /// Port to listen on
    #[arg(long, env = "KSIGN_PORT", default_value_t = 5000)]
    pub port: u16,
    /// Shared secret callers must present
    #[arg(long, env = "SECRET", hide_env_values = true, value_parser = NonEmptyStringValueParser::new())]
    pub secret: String,
    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value = "text")]
    pub log_format: LogFormat,
    #[command(flatten)]
    pub ksi: KsiArgs,
}

/// Signing backend and canonicalization settings.
#[derive(Clone, Args)]
pub struct KsiArgs {
    /// KSI aggregator endpoint
    #[arg(long, env = "AGGR_URL", default_value = SignerConfig::DEFAULT_AGGREGATOR_URL)]
    pub aggr_url: String,
    /// KSI aggregator user
    #[arg(long, env = "AGGR_USER", default_value = "anon")]
    pub aggr_user: String,
    /// KSI aggregator key
    #[arg(long, env = "AGGR_PASSWORD", default_value = "anon", hide_env_values = true)]
    pub aggr_password: String,
    /// Signing tool to run
    #[arg(long, env = "KSI_BIN", default_value = KsiCommandSigner::DEFAULT_PROGRAM)]
    pub ksi_bin: PathBuf,
    /// Seconds to wait for the signing tool before killing it
    #[arg(long, env = "KSI_TIMEOUT_SECS", default_value_t = 30)]
    pub ksi_timeout_secs: u64,
    /// Canonicalization profile (ksign-ordinal-v1 or jcs-rfc8785)
    #[arg(long, env = "CANONICAL_PROFILE", default_value = "ksign-ordinal-v1")]
    pub canonical_profile: CanonicalProfile,
}

impl KsiArgs {
    /// Aggregator connection settings.
    pub fn signer_config(&self) -> SignerConfig {
        SignerConfig::new(&self.aggr_url, &self.aggr_user, &self.aggr_password)
            .with_timeout(Duration::from_secs(self.ksi_timeout_secs))
    }

    /// Command signer for the configured tool.
    pub fn signer(&self) -> KsiCommandSigner {
        KsiCommandSigner::new(self.signer_config()).with_program(self.ksi_bin.as_os_str())
    }

    /// Pipeline wired to the command signer.
    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(
            Canonicalizer::new(self.canonical_profile),
            Arc::new(self.signer()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let config = ServerConfig::try_parse_from([
            "ksign-server",
            "--secret",
            "S",
            "--port",
            "8080",
            "--aggr-url",
            "http://aggr.example/gt-signingservice",
            "--aggr-user",
            "alice",
            "--aggr-password",
            "pw",
            "--ksi-timeout-secs",
            "5",
            "--canonical-profile",
            "jcs-rfc8785",
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.ksi.canonical_profile, CanonicalProfile::Rfc8785);
        let signer = config.ksi.signer_config();
        assert_eq!(signer.aggregator_url, "http://aggr.example/gt-signingservice");
        assert_eq!(signer.aggregator_user, "alice");
        assert_eq!(signer.aggregator_key, "pw");
        assert_eq!(signer.timeout, Duration::from_secs(5));
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert!(ServerConfig::try_parse_from(["ksign-server", "--secret", ""]).is_err());
    }

    #[test]
    fn unknown_profile_is_rejected() {
        assert!(ServerConfig::try_parse_from([
            "ksign-server",
            "--secret",
            "S",
            "--canonical-profile",
            "sorted-ish"
        ])
        .is_err());
    }
}
