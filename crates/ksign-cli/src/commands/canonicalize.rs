//! Canonicalize command implementation.

use ksign_canonical::{parse_strict, CanonicalProfile, Canonicalizer};

use super::read_input;
use crate::output;

pub fn run(input: Option<String>, profile: CanonicalProfile) -> Result<(), Box<dyn std::error::Error>> {
    let canonicalizer = Canonicalizer::new(profile);

    // Any JSON value is accepted here, not only objects.
    let value = parse_strict(&read_input(input)?).map_err(|e| format!("Invalid JSON: {}", e))?;

    let result = canonicalizer
        .canonicalize_value(&value)
        .map_err(|e| format!("Canonicalization failed: {}", e))?;

    output::print_bytes(result.as_bytes())?;
    Ok(())
}
