//! Subcommand implementations.

pub mod canonicalize;
pub mod prepare;
pub mod sign;

use ksign_canonical::Document;
use std::io::{self, Read};

/// Reads JSON from a file, or from stdin when `input` is `None`.
pub fn read_input(input: Option<String>) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    if let Some(path) = input {
        Ok(std::fs::read(&path).map_err(|e| format!("Failed to read file {}: {}", path, e))?)
    } else {
        let mut buffer = Vec::new();
        io::stdin().read_to_end(&mut buffer)?;
        Ok(buffer)
    }
}

/// Reads and strictly parses a document.
pub fn read_document(input: Option<String>) -> Result<Document, Box<dyn std::error::Error>> {
    let bytes = read_input(input)?;
    let document = Document::parse(&bytes).map_err(|e| format!("Invalid document: {}", e))?;
    Ok(document)
}
