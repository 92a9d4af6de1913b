//! Signing pipeline for ksign.
//!
//! This crate provides:
//! - The preprocessor that gives a document its signable shape
//! - The [`Signer`] capability and a `ksi` command-line implementation
//! - The [`Pipeline`] that composes preprocessing, canonicalization and signing
//!
//! Core invariants:
//! - The signed bytes are the canonical form of the preprocessed document
//! - `updatedAttributes` names every top-level field of the final document,
//!   including `ksiSignature`, before the signature exists
//! - A signing failure never yields a document
//!
#![deny(missing_docs)]

/// Error types for pipeline operations.
pub mod errors;
/// Command-line KSI signing backend.
pub mod ksi;
/// The signing pipeline.
pub mod pipeline;
/// Document preprocessing before canonicalization.
pub mod preprocess;
/// Signer capability and signature types.
pub mod signer;

pub use errors::PipelineError;
pub use ksi::{KsiCommandSigner, SignerConfig};
pub use pipeline::{prepare_payload, Pipeline, PreparedPayload, SignedDocument};
pub use preprocess::{
    preprocess, updated_attributes, SIGNATURE_FIELD, UPDATED_ATTRIBUTES_FIELD, VOLATILE_FIELD,
};
pub use signer::{SignatureError, SignatureToken, Signer};
