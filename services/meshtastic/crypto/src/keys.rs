//! Pre-shared key canonicalization and per-channel lookup.

use crate::error::CryptoError;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use std::collections::BTreeMap;
use tracing::debug;

/// Public key of the default channel, base64
pub const DEFAULT_PSK_B64: &str = "1PG7OiApB1nwvP+rz05pAQ==";

/// One-byte PSK meaning "use the default key"
pub const DEFAULT_PSK_SENTINEL: &str = "AQ==";

/// Decoded default channel key
pub const DEFAULT_KEY: [u8; 16] = [
    0xd4, 0xf1, 0xbb, 0x3a, 0x20, 0x29, 0x07, 0x59, 0xf0, 0xbc, 0xff, 0xab, 0xcf, 0x4e, 0x69, 0x01,
];

/// Channel used when a lookup misses
pub const DEFAULT_CHANNEL: &str = "LongFast";

/// Decode a base64 PSK into raw key bytes.
///
/// Accepts url-safe characters and missing padding. The one-byte sentinel
/// `0x01` expands to [`DEFAULT_KEY`]. The result is 0, 16 or 32 bytes long.
pub fn canonicalize(psk: &str) -> Result<Vec<u8>, CryptoError> {
    let mut normalized: String = psk
        .trim()
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    while normalized.len() % 4 != 0 {
        normalized.push('=');
    }

    let key = BASE64_STANDARD
        .decode(normalized.as_bytes())
        .map_err(|e| CryptoError::InvalidKeyFormat(format!("{psk:?}: {e}")))?;

    let key = if key == [0x01] {
        DEFAULT_KEY.to_vec()
    } else {
        key
    };

    match key.len() {
        0 | 16 | 32 => Ok(key),
        n => Err(CryptoError::InvalidKeyFormat(format!(
            "{psk:?} decodes to {n} bytes, expected 0, 16 or 32"
        ))),
    }
}

/// Canonicalized PSKs by channel name.
///
/// Always holds a [`DEFAULT_CHANNEL`] entry; lookups for unknown channels
/// fall back to it. Read-only after construction and cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyTable {
    keys: BTreeMap<String, Vec<u8>>,
}

impl KeyTable {
    /// Table containing only the default channel with the public key
    pub fn new() -> Self {
        let mut keys = BTreeMap::new();
        keys.insert(DEFAULT_CHANNEL.to_string(), DEFAULT_KEY.to_vec());
        Self { keys }
    }

    /// Build from channel name → base64 PSK pairs.
    ///
    /// Every key is canonicalized up front so a bad entry fails here rather
    /// than on the first packet of that channel.
    pub fn from_config<'a, I>(psks: I) -> Result<Self, CryptoError>
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mut table = Self::new();
        for (channel, psk) in psks {
            table.insert(channel, psk)?;
        }
        Ok(table)
    }

    /// Add or replace the key of `channel`
    pub fn insert(&mut self, channel: &str, psk: &str) -> Result<(), CryptoError> {
        let key = canonicalize(psk)?;
        debug!("Registered key for channel {} ({} bytes)", channel, key.len());
        self.keys.insert(channel.to_string(), key);
        Ok(())
    }

    /// Key for `channel`, falling back to the default channel's key
    pub fn resolve(&self, channel: &str) -> &[u8] {
        self.keys
            .get(channel)
            .or_else(|| self.keys.get(DEFAULT_CHANNEL))
            .map(Vec::as_slice)
            .unwrap_or(&DEFAULT_KEY)
    }

    /// True when `channel` has its own entry
    pub fn contains(&self, channel: &str) -> bool {
        self.keys.contains_key(channel)
    }

    /// Configured channel names
    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }
}

impl Default for KeyTable {
    fn default() -> Self {
        Self::new()
    }
}
