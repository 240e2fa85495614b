// SHA-256 hashing and HMAC-SHA256.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::error::{Result, StrandBindError};

/// Output length of every hash and MAC in the fixed suite.
pub const HASH_LEN: usize = 32;

type HmacSha256 = Hmac<Sha256>;

/// SHA-256 hash of `data`, returning a 32-byte digest.
pub fn hash_sha256(data: &[u8]) -> [u8; HASH_LEN] {
    Sha256::digest(data).into()
}

/// HMAC-SHA256 of `data` under `key`.
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<[u8; HASH_LEN]> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|e| StrandBindError::KeyDerivation(format!("hmac init: {e}")))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().into())
}

/// Verify an HMAC-SHA256 tag in constant time.
pub fn verify_hmac_sha256(key: &[u8], data: &[u8], tag: &[u8]) -> Result<()> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|e| StrandBindError::KeyDerivation(format!("hmac init: {e}")))?;
    mac.update(data);
    mac.verify_slice(tag)
        .map_err(|_| StrandBindError::SignatureVerification)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_known_vector() {
        let hash = hash_sha256(b"");
        assert_eq!(
            hex::encode(hash),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn hmac_rfc4231_case_2() {
        let tag = hmac_sha256(b"Jefe", b"what do ya want for nothing?").unwrap();
        assert_eq!(
            hex::encode(tag),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn hmac_verify_rejects_other_key() {
        let tag = hmac_sha256(b"key one", b"data").unwrap();
        verify_hmac_sha256(b"key one", b"data", &tag).unwrap();
        assert!(verify_hmac_sha256(b"key two", b"data", &tag).is_err());
    }
}
