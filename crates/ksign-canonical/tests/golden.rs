use ksign_canonical::{
    CanonicalProfile, Canonicalizer, Digest, DigestAlg, Document,
};
use serde_json::json;

const SHUFFLED_A: &str = r#"{
    "title": "Quarterly report",
    "meta": {"tags": ["b", "a"], "author": {"last": "Tamm", "first": "Mari"}},
    "count": 3,
    "flags": {"z": false, "a": true}
}"#;

const SHUFFLED_B: &str = r#"{"flags":{"a":true,"z":false},"count":3,
  "meta" : { "author" : { "first" : "Mari" , "last" : "Tamm" } , "tags" : [ "b" , "a" ] },
  "title":"Quarterly report"}"#;

#[test]
fn digest_serializes_to_golden_json() {
    let digest = Digest {
        alg: DigestAlg::Sha256,
        b64: "Zm9vYmFy".into(),
    };

    assert_eq!(
        serde_json::to_string(&digest).unwrap(),
        r#"{"alg":"sha-256","b64":"Zm9vYmFy"}"#
    );
}

#[test]
fn digest_of_empty_object_is_stable() {
    let bytes = Canonicalizer::default().canonicalize(&Document::new()).unwrap();
    let digest = bytes.digest();
    // sha256("{}")
    assert_eq!(digest.b64, "RBNvo1WzZ4oRRq0W9-hknpT7T8If536DEMBg9hyq_4o");
    assert_eq!(digest.to_string(), format!("sha-256:{}", digest.b64));
}

#[test]
fn canonicalizer_produces_ordered_bytes() {
    let canonicalizer = Canonicalizer::new(CanonicalProfile::Ordinal);
    let value = json!({"b": 1, "a": {"nested": 2}});
    let result = canonicalizer.canonicalize_value(&value).unwrap();
    assert_eq!(result.as_bytes(), br#"{"a":{"nested":2},"b":1}"#);
}

#[test]
fn reordered_documents_share_canonical_bytes() {
    let canonicalizer = Canonicalizer::default();
    let a = Document::parse(SHUFFLED_A.as_bytes()).unwrap();
    let b = Document::parse(SHUFFLED_B.as_bytes()).unwrap();

    let bytes_a = canonicalizer.canonicalize(&a).unwrap();
    let bytes_b = canonicalizer.canonicalize(&b).unwrap();
    assert_eq!(bytes_a, bytes_b);
    assert_eq!(
        bytes_a.as_bytes(),
        br#"{"count":3,"flags":{"a":true,"z":false},"meta":{"author":{"first":"Mari","last":"Tamm"},"tags":["b","a"]},"title":"Quarterly report"}"#
    );
}

#[test]
fn canonical_output_has_no_insignificant_whitespace() {
    let doc = Document::parse(SHUFFLED_B.as_bytes()).unwrap();
    let bytes = Canonicalizer::default().canonicalize(&doc).unwrap();
    let text = std::str::from_utf8(bytes.as_bytes()).unwrap();

    assert!(!text.ends_with('\n'));
    for separator in [": ", ", ", " :", " ,"] {
        assert!(!text.contains(separator), "found {separator:?} in {text}");
    }
    // The only space left is inside the "Quarterly report" string.
    assert_eq!(text.matches(' ').count(), 1);
}

#[test]
fn canonical_bytes_parse_back_to_same_document() {
    let canonicalizer = Canonicalizer::default();
    let doc = Document::parse(SHUFFLED_A.as_bytes()).unwrap();
    let bytes = canonicalizer.canonicalize(&doc).unwrap();
    let reparsed = Document::parse(bytes.as_bytes()).unwrap();
    assert_eq!(reparsed, doc);
    assert_eq!(canonicalizer.canonicalize(&reparsed).unwrap(), bytes);
}

#[test]
fn profiles_agree_on_ascii_integer_documents() {
    let doc = Document::parse(SHUFFLED_A.as_bytes()).unwrap();
    let ordinal = Canonicalizer::new(CanonicalProfile::Ordinal)
        .canonicalize(&doc)
        .unwrap();
    let jcs = Canonicalizer::new(CanonicalProfile::Rfc8785)
        .canonicalize(&doc)
        .unwrap();
    assert_eq!(ordinal, jcs);
}
