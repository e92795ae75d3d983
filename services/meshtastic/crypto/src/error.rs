//! Crypto error types.

use thiserror::Error;

/// Key and cipher errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// PSK is not valid base64 or has an unusable length
    #[error("invalid key format: {0}")]
    InvalidKeyFormat(String),

    /// Ciphertext could not be turned back into plaintext
    #[error("decryption failure: {0}")]
    DecryptionFailure(String),
}
