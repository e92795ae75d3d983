//! AES-CTR payload encryption keyed by channel PSK.

use crate::error::CryptoError;
use crate::keys::KeyTable;
use aes::{Aes128, Aes256};
use ctr::cipher::{KeyIvInit, StreamCipher};

type Aes128Ctr = ctr::Ctr128BE<Aes128>;
type Aes256Ctr = ctr::Ctr128BE<Aes256>;

/// Nonce (initial counter block) size in bytes
pub const NONCE_LEN: usize = 16;

/// Build the CTR initial counter block for a packet.
///
/// Layout: packet id (LE u32, zero padded to 8 bytes) then sender node
/// number (LE u32, zero padded to 8 bytes).
pub fn nonce(packet_id: u32, from_node: u32) -> [u8; NONCE_LEN] {
    let mut out = [0u8; NONCE_LEN];
    out[0..4].copy_from_slice(&packet_id.to_le_bytes());
    out[8..12].copy_from_slice(&from_node.to_le_bytes());
    out
}

fn apply_keystream(key: &[u8], nonce: &[u8; NONCE_LEN], buf: &mut [u8]) -> Result<(), String> {
    match key.len() {
        0 => Ok(()),
        16 => Aes128Ctr::new_from_slices(key, nonce)
            .map_err(|e| e.to_string())?
            .try_apply_keystream(buf)
            .map_err(|e| e.to_string()),
        32 => Aes256Ctr::new_from_slices(key, nonce)
            .map_err(|e| e.to_string())?
            .try_apply_keystream(buf)
            .map_err(|e| e.to_string()),
        n => Err(format!("unsupported key length {n}")),
    }
}

/// Encrypt `plaintext`. An empty key returns the plaintext unchanged.
pub fn encrypt(key: &[u8], nonce: &[u8; NONCE_LEN], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut buf = plaintext.to_vec();
    apply_keystream(key, nonce, &mut buf).map_err(CryptoError::InvalidKeyFormat)?;
    Ok(buf)
}

/// Decrypt `ciphertext`. An empty key returns the ciphertext unchanged.
///
/// Succeeding says nothing about the key being right; see the crate docs.
pub fn decrypt(key: &[u8], nonce: &[u8; NONCE_LEN], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut buf = ciphertext.to_vec();
    apply_keystream(key, nonce, &mut buf).map_err(CryptoError::DecryptionFailure)?;
    Ok(buf)
}

/// Channel-aware cipher over a [`KeyTable`].
#[derive(Debug, Clone, Default)]
pub struct CryptoEngine {
    keys: KeyTable,
}

impl CryptoEngine {
    /// Create an engine over `keys`
    pub fn new(keys: KeyTable) -> Self {
        Self { keys }
    }

    /// Underlying key table
    pub fn keys(&self) -> &KeyTable {
        &self.keys
    }

    /// True when `channel` resolves to a non-empty key
    pub fn is_encrypted(&self, channel: &str) -> bool {
        !self.keys.resolve(channel).is_empty()
    }

    /// Encrypt a serialized `Data` for `channel`
    pub fn encrypt_packet(
        &self,
        channel: &str,
        packet_id: u32,
        from_node: u32,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        encrypt(self.keys.resolve(channel), &nonce(packet_id, from_node), plaintext)
    }

    /// Decrypt a packet's `encrypted` field heard on `channel`
    pub fn decrypt_packet(
        &self,
        channel: &str,
        packet_id: u32,
        from_node: u32,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        decrypt(self.keys.resolve(channel), &nonce(packet_id, from_node), ciphertext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::DEFAULT_KEY;
    use std::collections::HashSet;

    // Data { portnum: TEXT_MESSAGE_APP, payload: "SYN" }
    const SYN_DATA: [u8; 7] = [0x08, 0x01, 0x12, 0x03, b'S', b'Y', b'N'];

    #[test]
    fn test_nonce_layout() {
        let n = nonce(0x1234_5678, 0x0000_0b0b);
        assert_eq!(
            n,
            [
                0x78, 0x56, 0x34, 0x12, 0, 0, 0, 0, 0x0b, 0x0b, 0, 0, 0, 0, 0, 0
            ]
        );
    }

    #[test]
    fn test_nonce_is_injective() {
        let mut seen = HashSet::new();
        for id in [0u32, 1, 0xff, 0x100, u32::MAX] {
            for from in [0u32, 1, 0xff, 0x100, u32::MAX] {
                assert!(seen.insert(nonce(id, from)));
            }
        }
    }

    #[test]
    fn test_aes128_known_vector() {
        let ct = encrypt(&DEFAULT_KEY, &nonce(0x1234_5678, 0x0b0b), &SYN_DATA).unwrap();
        assert_eq!(ct, vec![0x80, 0x09, 0x8f, 0xe1, 0x79, 0xdb, 0xc3]);
    }

    #[test]
    fn test_aes256_known_vector() {
        let key: Vec<u8> = (0u8..32).collect();
        let ct = encrypt(&key, &nonce(0x1234_5678, 0x0b0b), &SYN_DATA).unwrap();
        assert_eq!(ct, vec![0x41, 0xa1, 0xa5, 0x6b, 0x2d, 0x8c, 0x13]);
    }

    #[test]
    fn test_roundtrip_both_key_sizes() {
        let n = nonce(42, 7);
        let plaintext: Vec<u8> = (0u8..=200).collect();
        for key in [vec![3u8; 16], vec![9u8; 32]] {
            let ct = encrypt(&key, &n, &plaintext).unwrap();
            assert_ne!(ct, plaintext);
            assert_eq!(decrypt(&key, &n, &ct).unwrap(), plaintext);
        }
    }

    #[test]
    fn test_empty_key_passthrough() {
        let n = nonce(1, 2);
        assert_eq!(encrypt(&[], &n, b"clear").unwrap(), b"clear".to_vec());
        assert_eq!(decrypt(&[], &n, b"clear").unwrap(), b"clear".to_vec());
    }

    #[test]
    fn test_bad_key_length() {
        let n = nonce(1, 2);
        assert!(matches!(
            encrypt(&[0u8; 8], &n, b"x"),
            Err(CryptoError::InvalidKeyFormat(_))
        ));
        assert!(matches!(
            decrypt(&[0u8; 8], &n, b"x"),
            Err(CryptoError::DecryptionFailure(_))
        ));
    }

    #[test]
    fn test_engine_uses_channel_key() {
        let mut keys = KeyTable::new();
        keys.insert("Clear", "").unwrap();
        let engine = CryptoEngine::new(keys);

        assert!(engine.is_encrypted("LongFast"));
        assert!(!engine.is_encrypted("Clear"));

        let ct = engine.encrypt_packet("LongFast", 0x1234_5678, 0x0b0b, &SYN_DATA).unwrap();
        assert_eq!(ct, vec![0x80, 0x09, 0x8f, 0xe1, 0x79, 0xdb, 0xc3]);
        assert_eq!(
            engine.decrypt_packet("Unknown", 0x1234_5678, 0x0b0b, &ct).unwrap(),
            SYN_DATA.to_vec()
        );
    }
}
