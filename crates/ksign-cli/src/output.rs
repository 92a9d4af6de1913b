//! Output formatting utilities.

use ksign_canonical::Digest;
use std::io::{self, Write};

/// Writes raw bytes to stdout followed by a newline.
pub fn print_bytes(bytes: &[u8]) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(bytes)?;
    stdout.write_all(b"\n")?;
    stdout.flush()
}

/// Formats a digest as compact JSON.
pub fn format_digest(digest: &Digest) -> String {
    serde_json::to_string(digest).unwrap_or_else(|_| digest.to_string())
}
