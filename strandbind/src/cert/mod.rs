// Identity certificate: binds an Identity to an Ed25519 public key under an
// issuer signature (self-signed or issued by a separate authority key).

pub mod builder;
pub mod serializer;
pub mod validator;

use crate::crypto::hash::hash_sha256;
use crate::crypto::keys::{PublicKey, SignatureBytes};
use crate::error::Result;
use crate::identity::Identity;

/// A signed (Identity, PublicKey) binding with a validity window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    /// The identity this certificate names.
    pub identity: Identity,
    /// The subject's Ed25519 public key.
    pub public_key: PublicKey,
    /// Unix timestamp (seconds), start of validity.
    pub valid_from: u64,
    /// Unix timestamp (seconds), end of validity.
    pub valid_until: u64,
    /// The issuer's Ed25519 public key. Equal to `public_key` when self-signed.
    pub issuer_public_key: PublicKey,
    /// Ed25519 signature over [`Certificate::signable_bytes`].
    pub signature: SignatureBytes,
}

impl Certificate {
    /// The canonical certificate format version.
    pub const VERSION: u8 = 1;

    /// Produce the byte content that is signed (everything except the signature field).
    /// This MUST match the order used by the serializer.
    pub fn signable_bytes(&self) -> Vec<u8> {
        let name = self.identity.as_bytes();
        let mut buf = Vec::with_capacity(1 + 1 + name.len() + 32 + 16 + 32);
        buf.push(Self::VERSION);
        buf.push(name.len() as u8);
        buf.extend_from_slice(name);
        buf.extend_from_slice(&self.public_key);
        buf.extend_from_slice(&self.valid_from.to_be_bytes());
        buf.extend_from_slice(&self.valid_until.to_be_bytes());
        buf.extend_from_slice(&self.issuer_public_key);
        buf
    }

    /// Whether the issuer key is the subject key.
    pub fn is_self_signed(&self) -> bool {
        self.issuer_public_key == self.public_key
    }

    /// Encoded certificate blob, as carried in the Certificate handshake message.
    pub fn to_bytes(&self) -> Vec<u8> {
        serializer::serialize(self)
    }

    /// SHA-256 over the encoded blob; the value a DANE certificate record attests.
    pub fn binding_hash(&self) -> [u8; 32] {
        hash_sha256(&self.to_bytes())
    }
}

/// Decode a certificate blob into the (identity, public key) pair it binds.
///
/// Decoding alone does not verify anything; see [`validator`].
pub fn read_certificate(blob: &[u8]) -> Result<(Identity, PublicKey)> {
    let cert = serializer::deserialize(blob)?;
    Ok((cert.identity, cert.public_key))
}
