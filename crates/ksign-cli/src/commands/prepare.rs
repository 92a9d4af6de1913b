//! Prepare command implementation.

use ksign_canonical::{CanonicalProfile, Canonicalizer};
use ksign_core::prepare_payload;

use super::read_document;
use crate::output;

pub fn run(
    input: Option<String>,
    profile: CanonicalProfile,
    digest: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let payload = prepare_payload(&Canonicalizer::new(profile), read_document(input)?)
        .map_err(|e| format!("Canonicalization failed: {}", e))?
        .bytes;

    if digest {
        println!("{}", output::format_digest(&payload.digest()));
    } else {
        output::print_bytes(payload.as_bytes())?;
    }
    Ok(())
}
