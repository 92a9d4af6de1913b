use ksign_canonical::{parse_strict, Document, StrictValue};
use serde::Deserialize;
use serde_json::Value;
use subtle::ConstantTimeEq;

use crate::error::{AppError, MISSING_DATA};

/// Body of a signing request: `{"secret": "...", "data": {...}}`.
///
/// Duplicate keys anywhere in the body, unknown envelope fields, and
/// non-string secrets are rejected while parsing.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignEnvelope {
    secret: Option<String>,
    data: Option<StrictValue>,
}

impl SignEnvelope {
    /// Parses a request body. Only the object form `{"secret", "data"}` is
    /// accepted; serde would otherwise also take a positional array.
    pub fn from_slice(body: &[u8]) -> Result<Self, AppError> {
        let invalid = |reason: String| AppError::Validation(format!("Invalid request body: {reason}"));
        match parse_strict(body).map_err(|err| invalid(err.to_string()))? {
            value @ Value::Object(_) => {
                serde_json::from_value(value).map_err(|err| invalid(err.to_string()))
            }
            _ => Err(invalid("expected a JSON object".into())),
        }
    }

    /// Checks the submitted secret against `expected` in constant time.
    pub fn authenticate(&self, expected: &str) -> Result<(), AppError> {
        let provided = self.secret.as_deref().unwrap_or_default();
        if provided.is_empty() || provided.as_bytes().ct_eq(expected.as_bytes()).unwrap_u8() != 1 {
            return Err(AppError::Authentication);
        }
        Ok(())
    }

    /// Extracts the document to sign; it must be a non-empty object.
    pub fn into_document(self) -> Result<Document, AppError> {
        match self.data {
            None | Some(StrictValue(Value::Null)) => Err(AppError::Validation(MISSING_DATA.into())),
            Some(StrictValue(Value::Object(map))) if map.is_empty() => {
                Err(AppError::Validation(MISSING_DATA.into()))
            }
            Some(StrictValue(value @ Value::Object(_))) => Document::try_from(value)
                .map_err(|err| AppError::Validation(err.to_string())),
            Some(_) => Err(AppError::Validation("`data` must be a JSON object.".into())),
        }
    }
}
