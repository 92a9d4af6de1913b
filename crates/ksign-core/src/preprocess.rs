//! Structural transforms applied before a document is canonicalized.

use ksign_canonical::Document;
use serde_json::Value;

/// Field regenerated by callers on every save; never part of the signed payload.
pub const VOLATILE_FIELD: &str = "dateModified";
/// Field listing the top-level names of the final signed document.
pub const UPDATED_ATTRIBUTES_FIELD: &str = "updatedAttributes";
/// Field that receives the signature token.
pub const SIGNATURE_FIELD: &str = "ksiSignature";

/// Normalizes a document into the shape that gets signed.
///
/// Drops [`VOLATILE_FIELD`], then inserts [`UPDATED_ATTRIBUTES_FIELD`] as a
/// placeholder and recomputes it over the resulting key set plus
/// [`SIGNATURE_FIELD`]. The descriptor therefore names itself and the
/// signature field, which is the key set of the document once signed.
///
/// Running this over an already-signed document is not idempotent: the old
/// signature and descriptor are carried into the new payload.
pub fn preprocess(mut document: Document) -> Document {
    if document.remove(VOLATILE_FIELD).is_some() {
        tracing::debug!(field = VOLATILE_FIELD, "removed volatile field");
    }

    document.insert(UPDATED_ATTRIBUTES_FIELD, Value::String(String::new()));
    let descriptor = updated_attributes(&document);
    tracing::debug!(updated_attributes = %descriptor, "computed attribute descriptor");
    document.insert(UPDATED_ATTRIBUTES_FIELD, Value::String(descriptor));

    document
}

/// Sorted, comma-joined top-level field names of `document` plus [`SIGNATURE_FIELD`].
pub fn updated_attributes(document: &Document) -> String {
    let mut names: Vec<&str> = document
        .keys()
        .map(String::as_str)
        .chain(std::iter::once(SIGNATURE_FIELD))
        .collect();
    names.sort_unstable_by(|a, b| a.as_bytes().cmp(b.as_bytes()));
    names.dedup();
    names.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        Document::try_from(value).unwrap()
    }

    #[test]
    fn descriptor_covers_final_key_set() {
        let out = preprocess(doc(json!({"b": 1, "a": 2})));
        assert_eq!(
            out.get(UPDATED_ATTRIBUTES_FIELD),
            Some(&json!("a,b,ksiSignature,updatedAttributes"))
        );
        assert!(!out.contains_key(SIGNATURE_FIELD));
    }

    #[test]
    fn descriptor_matches_keys_after_preprocessing() {
        let out = preprocess(doc(json!({"zeta": 1, "Alpha": 2, "dateModified": "x"})));
        let mut expected: Vec<String> = out.keys().cloned().collect();
        expected.push(SIGNATURE_FIELD.to_string());
        expected.sort();
        assert_eq!(
            out.get(UPDATED_ATTRIBUTES_FIELD).and_then(Value::as_str),
            Some(expected.join(",").as_str())
        );
    }

    #[test]
    fn volatile_field_is_removed() {
        let out = preprocess(doc(json!({"title": "t", "dateModified": "2024-01-01"})));
        assert!(!out.contains_key(VOLATILE_FIELD));
        assert_eq!(
            out.get(UPDATED_ATTRIBUTES_FIELD),
            Some(&json!("ksiSignature,title,updatedAttributes"))
        );
    }

    #[test]
    fn empty_document_still_gets_descriptor() {
        let out = preprocess(Document::new());
        assert_eq!(out.len(), 1);
        assert_eq!(
            out.get(UPDATED_ATTRIBUTES_FIELD),
            Some(&json!("ksiSignature,updatedAttributes"))
        );
    }

    #[test]
    fn resigning_does_not_repeat_signature_field() {
        let signed = doc(json!({
            "a": 1,
            "ksiSignature": "AAAA",
            "updatedAttributes": "a,ksiSignature,updatedAttributes"
        }));
        let out = preprocess(signed);
        assert_eq!(
            out.get(UPDATED_ATTRIBUTES_FIELD),
            Some(&json!("a,ksiSignature,updatedAttributes"))
        );
        // The stale signature stays in the payload.
        assert_eq!(out.get(SIGNATURE_FIELD), Some(&json!("AAAA")));
    }
}
