//! Sign command implementation.

use std::sync::Arc;
use std::time::Duration;

use ksign_canonical::Canonicalizer;
use ksign_core::{KsiCommandSigner, Pipeline, SignerConfig};

use super::read_document;
use crate::output;
use crate::KsiOptions;

impl KsiOptions {
    fn pipeline(&self) -> Pipeline {
        let config = SignerConfig::new(&self.aggr_url, &self.aggr_user, &self.aggr_password)
            .with_timeout(Duration::from_secs(self.ksi_timeout_secs));
        let signer = KsiCommandSigner::new(config)
            .with_program(self.ksi_bin.as_os_str())
            .with_leading_args(&self.ksi_args);
        Pipeline::new(Canonicalizer::new(self.profile), Arc::new(signer))
    }
}

pub fn run(input: Option<String>, ksi: KsiOptions) -> Result<(), Box<dyn std::error::Error>> {
    let document = read_document(input)?;
    let signed = ksi
        .pipeline()
        .sign_document(document)
        .map_err(|e| format!("Signing failed: {}", e))?;

    output::print_bytes(&signed.envelope_bytes())?;
    Ok(())
}
