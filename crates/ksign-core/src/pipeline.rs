use std::sync::Arc;
use std::time::Instant;

use ksign_canonical::{CanonicalBytes, CanonicalizationError, Canonicalizer, Document};
use serde_json::Value;

use crate::errors::PipelineError;
use crate::preprocess::{preprocess, SIGNATURE_FIELD};
use crate::signer::Signer;

/// A preprocessed document and the exact bytes that get signed.
#[derive(Debug, Clone)]
pub struct PreparedPayload {
    /// Document after preprocessing, without a signature.
    pub document: Document,
    /// Canonical bytes of `document`.
    pub bytes: CanonicalBytes,
}

/// Final signed document in canonical form.
#[derive(Debug, Clone)]
pub struct SignedDocument {
    document: Document,
    bytes: CanonicalBytes,
}

impl SignedDocument {
    /// The signed document, parsed back from its canonical bytes.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Canonical bytes of the signed document.
    pub fn canonical_bytes(&self) -> &CanonicalBytes {
        &self.bytes
    }

    /// Consumes the wrapper, returning the document.
    pub fn into_document(self) -> Document {
        self.document
    }

    /// `{"signed_data":<canonical document>}`; a single-key wrapper around
    /// canonical bytes is itself canonical.
    pub fn envelope_bytes(&self) -> Vec<u8> {
        let document = self.bytes.as_bytes();
        let mut out = Vec::with_capacity(document.len() + 16);
        out.extend_from_slice(br#"{"signed_data":"#);
        out.extend_from_slice(document);
        out.push(b'}');
        out
    }
}

/// Preprocesses and canonicalizes `document`; these are the bytes a signer receives.
pub fn prepare_payload(
    canonicalizer: &Canonicalizer,
    document: Document,
) -> Result<PreparedPayload, CanonicalizationError> {
    let document = preprocess(document);
    let bytes = canonicalizer.canonicalize(&document)?;
    Ok(PreparedPayload { document, bytes })
}

/// Preprocess → canonicalize → sign → attach → canonicalize.
///
/// Holds no per-request state; share one instance behind an `Arc`.
pub struct Pipeline {
    canonicalizer: Canonicalizer,
    signer: Arc<dyn Signer>,
}

impl Pipeline {
    /// Creates a pipeline around a canonicalizer and a signer.
    pub fn new(canonicalizer: Canonicalizer, signer: Arc<dyn Signer>) -> Self {
        Self {
            canonicalizer,
            signer,
        }
    }

    /// Canonicalizer used for both passes.
    pub fn canonicalizer(&self) -> &Canonicalizer {
        &self.canonicalizer
    }

    /// Preprocesses and canonicalizes `document` without signing it.
    pub fn prepare(&self, document: Document) -> Result<PreparedPayload, PipelineError> {
        Ok(prepare_payload(&self.canonicalizer, document)?)
    }

    /// Signs `document` and returns it with `ksiSignature` attached.
    ///
    /// A signing failure aborts the whole operation; no partially signed or
    /// unsigned document is returned in its place.
    pub fn sign_document(&self, document: Document) -> Result<SignedDocument, PipelineError> {
        let PreparedPayload {
            mut document,
            bytes,
        } = self.prepare(document)?;

        let span = tracing::info_span!(
            "sign_document",
            payload_digest = %bytes.digest(),
            payload_len = bytes.len(),
            profile = %self.canonicalizer.profile(),
        );
        let _entered = span.enter();

        let started = Instant::now();
        let token = self.signer.sign(&bytes).map_err(|err| {
            tracing::error!(error = %err, "signing failed");
            PipelineError::Signature(err)
        })?;
        document.insert(SIGNATURE_FIELD, Value::String(token.into_string()));

        let bytes = self.canonicalizer.canonicalize(&document)?;
        let document = Document::parse(bytes.as_bytes())?;

        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            signed_len = bytes.len(),
            "document signed"
        );
        Ok(SignedDocument { document, bytes })
    }
}
