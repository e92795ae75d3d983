//! Receive path error types.
//!
//! None of these abort the pipeline; they are recorded on the message.

use meshtastic_crypto::CryptoError;
use serde::Serialize;
use thiserror::Error;

/// Reasons a received message is only partially decoded
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ReceiveError {
    /// Wrong channel key or corrupted ciphertext
    #[error("unable to decrypt - psk? ({0})")]
    Decryption(String),

    /// Malformed protobuf or JSON
    #[error("decode failure: {0}")]
    Decode(String),

    /// Reverse geocoding lookup failed
    #[error("geocoder failure: {0}")]
    Geocode(String),
}

impl From<CryptoError> for ReceiveError {
    fn from(e: CryptoError) -> Self {
        ReceiveError::Decryption(e.to_string())
    }
}

impl From<prost::DecodeError> for ReceiveError {
    fn from(e: prost::DecodeError) -> Self {
        ReceiveError::Decode(e.to_string())
    }
}

impl From<serde_json::Error> for ReceiveError {
    fn from(e: serde_json::Error) -> Self {
        ReceiveError::Decode(e.to_string())
    }
}
