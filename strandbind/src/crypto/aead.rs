// AEAD for encrypted handshake records: ChaCha20-Poly1305 (RFC 8439) or
// AES-256-GCM.
//
// The suite is a deployment setting shared by both peers; it is never
// negotiated in-band.

// Both aes-gcm and chacha20poly1305 re-export the same `aead` traits.
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::Aes256Gcm;
use chacha20poly1305::ChaCha20Poly1305;
use zeroize::Zeroizing;

use crate::error::{Result, StrandBindError};

/// Length of the authentication tag appended by both suites.
pub const AEAD_TAG_LEN: usize = 16;

/// Cipher suite used to protect encrypted handshake records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CipherSuite {
    Aes256Gcm,
    #[default]
    ChaCha20Poly1305,
}

impl CipherSuite {
    /// Short name used in log fields.
    pub fn name(self) -> &'static str {
        match self {
            CipherSuite::Aes256Gcm => "AES-256-GCM",
            CipherSuite::ChaCha20Poly1305 => "ChaCha20-Poly1305",
        }
    }
}

/// A 32-byte record key bound to its suite. Wiped on drop.
pub struct AeadKey {
    suite: CipherSuite,
    key: Zeroizing<[u8; 32]>,
}

impl AeadKey {
    pub fn new(suite: CipherSuite, key: [u8; 32]) -> Self {
        Self {
            suite,
            key: Zeroizing::new(key),
        }
    }

    pub fn suite(&self) -> CipherSuite {
        self.suite
    }

    /// Returns ciphertext || 16-byte tag.
    pub fn encrypt(&self, nonce: &[u8; 12], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        let payload = Payload { msg: plaintext, aad };
        match self.suite {
            CipherSuite::ChaCha20Poly1305 => seal::<ChaCha20Poly1305>(&self.key, nonce, payload),
            CipherSuite::Aes256Gcm => seal::<Aes256Gcm>(&self.key, nonce, payload),
        }
        .map_err(|e| StrandBindError::Encryption(format!("{}: {e}", self.suite.name())))
    }

    /// `ciphertext` carries the tag. Fails on any key, nonce, aad or tag mismatch.
    pub fn decrypt(&self, nonce: &[u8; 12], ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        let payload = Payload {
            msg: ciphertext,
            aad,
        };
        match self.suite {
            CipherSuite::ChaCha20Poly1305 => open::<ChaCha20Poly1305>(&self.key, nonce, payload),
            CipherSuite::Aes256Gcm => open::<Aes256Gcm>(&self.key, nonce, payload),
        }
        .map_err(|e| StrandBindError::Decryption(format!("{}: {e}", self.suite.name())))
    }
}

impl std::fmt::Debug for AeadKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AeadKey")
            .field("suite", &self.suite)
            .finish_non_exhaustive()
    }
}

fn seal<C: Aead + KeyInit>(key: &[u8; 32], nonce: &[u8; 12], payload: Payload<'_, '_>) -> std::result::Result<Vec<u8>, String> {
    let cipher = C::new_from_slice(key).map_err(|e| e.to_string())?;
    cipher
        .encrypt(nonce.as_slice().into(), payload)
        .map_err(|e| e.to_string())
}

fn open<C: Aead + KeyInit>(key: &[u8; 32], nonce: &[u8; 12], payload: Payload<'_, '_>) -> std::result::Result<Vec<u8>, String> {
    let cipher = C::new_from_slice(key).map_err(|e| e.to_string())?;
    cipher
        .decrypt(nonce.as_slice().into(), payload)
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUITES: [CipherSuite; 2] = [CipherSuite::ChaCha20Poly1305, CipherSuite::Aes256Gcm];

    #[test]
    fn roundtrip_with_aad() {
        for suite in SUITES {
            let key = AeadKey::new(suite, [0x99u8; 32]);
            let nonce = [1u8; 12];
            let ct = key.encrypt(&nonce, b"secret payload", b"header").unwrap();
            assert_eq!(ct.len(), b"secret payload".len() + AEAD_TAG_LEN);
            assert_eq!(key.decrypt(&nonce, &ct, b"header").unwrap(), b"secret payload");
        }
    }

    #[test]
    fn wrong_aad_fails() {
        for suite in SUITES {
            let key = AeadKey::new(suite, [0xAAu8; 32]);
            let ct = key.encrypt(&[2u8; 12], b"data", b"good aad").unwrap();
            assert!(matches!(
                key.decrypt(&[2u8; 12], &ct, b"bad aad"),
                Err(StrandBindError::Decryption(_))
            ));
        }
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let key = AeadKey::new(CipherSuite::ChaCha20Poly1305, [0xBBu8; 32]);
        let mut ct = key.encrypt(&[3u8; 12], b"data", b"").unwrap();
        ct[0] ^= 0xFF;
        assert!(key.decrypt(&[3u8; 12], &ct, b"").is_err());
    }

    #[test]
    fn wrong_key_fails() {
        let enc = AeadKey::new(CipherSuite::Aes256Gcm, [0x11u8; 32]);
        let dec = AeadKey::new(CipherSuite::Aes256Gcm, [0x22u8; 32]);
        let ct = enc.encrypt(&[0u8; 12], b"secret", b"").unwrap();
        assert!(dec.decrypt(&[0u8; 12], &ct, b"").is_err());
    }

    #[test]
    fn suites_do_not_interoperate() {
        let chacha = AeadKey::new(CipherSuite::ChaCha20Poly1305, [0x66u8; 32]);
        let aes = AeadKey::new(CipherSuite::Aes256Gcm, [0x66u8; 32]);
        let ct = chacha.encrypt(&[0u8; 12], b"msg", b"").unwrap();
        assert!(aes.decrypt(&[0u8; 12], &ct, b"").is_err());
        assert_eq!(aes.suite(), CipherSuite::Aes256Gcm);
    }
}
