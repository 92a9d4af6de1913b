use std::fmt;
use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use base64::Engine;
use ksign_canonical::CanonicalBytes;

/// Produces a signature for canonical payload bytes.
///
/// Implementations are blocking. Async callers should run them on a
/// blocking-capable thread (e.g. `tokio::task::spawn_blocking`).
///
/// [`KsiCommandSigner`](crate::KsiCommandSigner) is the bundled
/// implementation. Other backends (an HTTP aggregator client, an HSM, a test
/// double) report their own failures through [`SignatureError::Backend`].
pub trait Signer: Send + Sync {
    /// Signs `payload`, returning an opaque token.
    fn sign(&self, payload: &CanonicalBytes) -> Result<SignatureToken, SignatureError>;
}

/// Opaque base64 signature blob as returned by the signing backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureToken(String);

impl SignatureToken {
    /// Wraps an already-encoded token.
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// Encodes raw signature bytes with the standard base64 alphabet.
    pub fn from_signature_bytes(bytes: &[u8]) -> Self {
        Self(base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    /// Borrows the encoded token.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the token, returning the encoded string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SignatureToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Failure to obtain a signature.
///
/// Callers treat every variant the same way; the variants exist for logs.
#[derive(thiserror::Error, Debug)]
pub enum SignatureError {
    /// Backend program could not be started.
    #[error("failed to launch signing backend `{program}`: {source}")]
    Launch {
        /// Program that was launched.
        program: String,
        /// Underlying spawn error.
        #[source]
        source: io::Error,
    },
    /// Backend exited unsuccessfully.
    #[error("signing backend exited with {status}")]
    Failed {
        /// Exit status reported by the OS.
        status: ExitStatus,
    },
    /// Backend did not finish in time and was killed.
    #[error("signing backend timed out after {after:?}")]
    TimedOut {
        /// Configured timeout.
        after: Duration,
    },
    /// Backend exited successfully without writing a signature.
    #[error("signing backend produced no signature")]
    EmptyOutput,
    /// I/O failure while staging the payload or collecting output.
    #[error("I/O error around signing backend: {0}")]
    Io(#[from] io::Error),
    /// Failure reported by a [`Signer`] implementation other than the
    /// command signer, which never produces this variant.
    #[error("signing backend error: {0}")]
    Backend(String),
}
