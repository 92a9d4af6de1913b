use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::digest::Digest;
use crate::document::Document;

/// Error returned when parsing or canonicalization fails.
#[derive(thiserror::Error, Debug)]
pub enum CanonicalizationError {
    /// Input was not syntactically valid JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
    /// Provided JSON does not have the required shape.
    #[error("invalid JSON structure: {0}")]
    InvalidStructure(String),
    /// A duplicate object member was detected.
    #[error("duplicate key detected at {0}")]
    DuplicateKey(String),
    /// Non-finite number (NaN/Infinity) detected.
    #[error("non-finite number detected at {0}")]
    NonFiniteNumber(String),
    /// Profile name is not one of the supported profiles.
    #[error("unknown canonicalization profile: {0}")]
    UnknownProfile(String),
    /// Generic failure.
    #[error("other error: {0}")]
    Other(String),
}

/// Canonicalization rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CanonicalProfile {
    /// Keys sorted by UTF-8 byte order, scalars in serde_json's standard form.
    #[default]
    Ordinal,
    /// RFC 8785 JSON Canonicalization Scheme.
    Rfc8785,
}

impl CanonicalProfile {
    /// Stable profile identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalProfile::Ordinal => "ksign-ordinal-v1",
            CanonicalProfile::Rfc8785 => "jcs-rfc8785",
        }
    }
}

impl fmt::Display for CanonicalProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CanonicalProfile {
    type Err = CanonicalizationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ksign-ordinal-v1" | "ordinal" => Ok(CanonicalProfile::Ordinal),
            "jcs-rfc8785" | "rfc8785" | "jcs" => Ok(CanonicalProfile::Rfc8785),
            other => Err(CanonicalizationError::UnknownProfile(other.to_string())),
        }
    }
}

/// Canonical UTF-8 bytes of a JSON value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Borrows the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consumes the wrapper, returning the raw bytes.
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }

    /// Byte length.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// SHA-256 digest of the bytes.
    pub fn digest(&self) -> Digest {
        Digest::sha256(&self.0)
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Canonicalizer that emits deterministic bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Canonicalizer {
    profile: CanonicalProfile,
}

impl Canonicalizer {
    /// Creates a new canonicalizer for the provided profile.
    pub fn new(profile: CanonicalProfile) -> Self {
        Self { profile }
    }

    /// Profile in use.
    pub fn profile(&self) -> CanonicalProfile {
        self.profile
    }

    /// Produces canonical bytes for a document.
    pub fn canonicalize(&self, document: &Document) -> Result<CanonicalBytes, CanonicalizationError> {
        let mut out = Vec::new();
        match self.profile {
            CanonicalProfile::Ordinal => {
                out.push(b'{');
                write_members(document.as_map(), &mut out)?;
                out.push(b'}');
            }
            CanonicalProfile::Rfc8785 => {
                let value = Value::Object(document.as_map().clone());
                out = jcs(&value)?;
            }
        }
        Ok(CanonicalBytes(out))
    }

    /// Produces canonical bytes for any JSON value.
    pub fn canonicalize_value(&self, value: &Value) -> Result<CanonicalBytes, CanonicalizationError> {
        let bytes = match self.profile {
            CanonicalProfile::Ordinal => {
                let mut out = Vec::new();
                write_ordinal(value, &mut out)?;
                out
            }
            CanonicalProfile::Rfc8785 => jcs(value)?,
        };
        Ok(CanonicalBytes(bytes))
    }
}

fn jcs(value: &Value) -> Result<Vec<u8>, CanonicalizationError> {
    let canonical = canonical_json::to_string(value)
        .map_err(|err| CanonicalizationError::Other(err.to_string()))?;
    Ok(canonical.into_bytes())
}

fn write_ordinal(value: &Value, out: &mut Vec<u8>) -> Result<(), CanonicalizationError> {
    match value {
        Value::Object(map) => {
            out.push(b'{');
            write_members(map, out)?;
            out.push(b'}');
        }
        Value::Array(items) => {
            out.push(b'[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(b',');
                }
                write_ordinal(item, out)?;
            }
            out.push(b']');
        }
        scalar => write_scalar(scalar, out)?,
    }
    Ok(())
}

fn write_members(
    map: &serde_json::Map<String, Value>,
    out: &mut Vec<u8>,
) -> Result<(), CanonicalizationError> {
    // Byte-wise order, independent of the map's iteration order.
    let mut members: Vec<(&String, &Value)> = map.iter().collect();
    members.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

    for (idx, (key, child)) in members.into_iter().enumerate() {
        if idx > 0 {
            out.push(b',');
        }
        serde_json::to_writer(&mut *out, key)
            .map_err(|err| CanonicalizationError::Other(err.to_string()))?;
        out.push(b':');
        write_ordinal(child, out)?;
    }
    Ok(())
}

fn write_scalar(value: &Value, out: &mut Vec<u8>) -> Result<(), CanonicalizationError> {
    serde_json::to_writer(&mut *out, value).map_err(|err| CanonicalizationError::Other(err.to_string()))
}
