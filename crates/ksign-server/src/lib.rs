//! # ksign-server
//!
//! HTTP front end for the ksign signing pipeline.
//!
//! ## Routes
//!
//! - `GET /` liveness greeting
//! - `GET /healthcheck` plain `Ok`
//! - `POST /sign` (and `/sign/`) takes `{"secret", "data"}`, returns
//!   `{"signed_data": <document>}` with `ksiSignature` attached
//!
//! Error bodies are `{"error": "<message>"}`: 400 for malformed requests,
//! 401 for a bad secret, 502 when the signing backend fails.

pub mod config;
pub mod envelope;
pub mod error;
pub mod server;

pub use config::{KsiArgs, LogFormat, ServerConfig};
pub use envelope::SignEnvelope;
pub use error::AppError;
pub use server::{router, run, AppState};
