// X25519 ephemeral Diffie-Hellman for one handshake instance.

use rand::rngs::OsRng;
use subtle::ConstantTimeEq;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::error::{Result, StrandBindError};

/// An X25519 ephemeral keypair, owned by exactly one handshake instance.
///
/// The secret is wiped when the keypair is dropped.
pub struct EphemeralKeyPair {
    secret: StaticSecret,
    public: PublicKey,
}

impl EphemeralKeyPair {
    /// Generate a new random ephemeral keypair.
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Create from existing secret bytes (used in deterministic tests).
    pub fn from_secret_bytes(bytes: [u8; 32]) -> Self {
        let secret = StaticSecret::from(bytes);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// The 32-byte public DH value sent in Hello.
    pub fn public_key_bytes(&self) -> [u8; 32] {
        *self.public.as_bytes()
    }

    /// Perform Diffie-Hellman with the peer's public value.
    ///
    /// An all-zero output means the peer sent a low-order point; it is
    /// rejected rather than fed into the key schedule.
    pub fn diffie_hellman(&self, peer_public: &[u8; 32]) -> Result<Zeroizing<[u8; 32]>> {
        let peer_pk = PublicKey::from(*peer_public);
        let shared = self.secret.diffie_hellman(&peer_pk);
        let out = Zeroizing::new(*shared.as_bytes());
        if bool::from(out.ct_eq(&[0u8; 32])) {
            return Err(StrandBindError::LowOrderPoint);
        }
        Ok(out)
    }
}
