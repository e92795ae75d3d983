//! Channel PSK management and AES-CTR payload encryption.
//!
//! Meshtastic channel traffic is encrypted with AES in counter mode, keyed by
//! the channel's pre-shared key and seeded with a nonce derived from the
//! packet id and sender. There is no authentication tag: a wrong key yields
//! garbage, not an error, so callers detect key mismatches by failing to
//! decode the plaintext.
//!
//! ## Features
//!
//! - **Key Canonicalization**: padded, url-safe tolerant base64 decoding
//! - **Default Channel Key**: the `AQ==` sentinel expands to the public key
//! - **Key Table**: channel name lookup with `LongFast` fallback
//! - **AES-128/256-CTR**: selected by key length; an empty key disables encryption

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cipher;
pub mod error;
pub mod keys;

// Re-export main types
pub use cipher::{decrypt, encrypt, nonce, CryptoEngine, NONCE_LEN};
pub use error::CryptoError;
pub use keys::{
    canonicalize, KeyTable, DEFAULT_CHANNEL, DEFAULT_KEY, DEFAULT_PSK_B64, DEFAULT_PSK_SENTINEL,
};
