//! Canonical data model primitives for ksign payloads.
//!
//! A [`Document`] is a JSON object with unique keys at every depth; the
//! [`Canonicalizer`] turns it into [`CanonicalBytes`], a byte string that is a
//! pure function of the document's content. Two documents that differ only in
//! member order or whitespace canonicalize to identical bytes.
//!
#![deny(missing_docs)]

/// Canonicalization profiles and the byte encoder.
pub mod canonicalizer;
/// Digest primitives for canonical payloads.
pub mod digest;
/// Strict JSON document model.
pub mod document;

pub use canonicalizer::{CanonicalBytes, CanonicalProfile, CanonicalizationError, Canonicalizer};
pub use digest::{Digest, DigestAlg};
pub use document::{parse_strict, Document, StrictValue};
