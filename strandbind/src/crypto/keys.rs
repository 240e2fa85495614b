// Ed25519 long-term identity keys: generation, signing, verification.

use std::fmt;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

use crate::error::{Result, StrandBindError};

/// A 32-byte Ed25519 public key as carried on the wire and in trust data.
pub type PublicKey = [u8; 32];

/// A 64-byte Ed25519 signature.
pub type SignatureBytes = [u8; 64];

/// A long-term Ed25519 identity keypair.
///
/// Created once per party and shared read-only (typically behind an `Arc`)
/// by every concurrent handshake that party runs.
pub struct IdentityKeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl IdentityKeyPair {
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut OsRng))
    }

    /// Deterministic keypair from a 32-byte secret seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(seed))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        Self {
            verifying_key: signing_key.verifying_key(),
            signing_key,
        }
    }

    /// The 32-byte Ed25519 public key.
    pub fn public_key_bytes(&self) -> PublicKey {
        self.verifying_key.to_bytes()
    }

    pub fn sign(&self, data: &[u8]) -> SignatureBytes {
        self.signing_key.sign(data).to_bytes()
    }

    /// Verify a signature against this keypair's public key.
    pub fn verify(&self, data: &[u8], signature: &SignatureBytes) -> Result<()> {
        let sig = Signature::from_bytes(signature);
        self.verifying_key
            .verify(data, &sig)
            .map_err(|_| StrandBindError::SignatureVerification)
    }
}

impl fmt::Debug for IdentityKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityKeyPair")
            .field("public_key", &hex::encode(self.public_key_bytes()))
            .finish_non_exhaustive()
    }
}

/// Verify a signature given raw public key bytes, message, and signature bytes.
///
/// Uses strict verification so that small-order keys and malleable
/// signatures are rejected.
pub fn verify_signature(
    pubkey_bytes: &PublicKey,
    message: &[u8],
    signature: &SignatureBytes,
) -> Result<()> {
    let vk = VerifyingKey::from_bytes(pubkey_bytes)
        .map_err(|e| StrandBindError::InvalidKey(format!("{e}")))?;
    let sig = Signature::from_bytes(signature);
    vk.verify_strict(message, &sig)
        .map_err(|_| StrandBindError::SignatureVerification)
}
