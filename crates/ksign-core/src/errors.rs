use thiserror::Error;

/// Pipeline error types.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Canonical encoding of the document failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] ksign_canonical::CanonicalizationError),
    /// The signing backend did not produce a signature.
    #[error("signature error: {0}")]
    Signature(#[from] crate::signer::SignatureError),
}
