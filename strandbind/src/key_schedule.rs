// Key schedule: HKDF-SHA256 extract / expand-label over the DH shared secret
// and transcript hashes.
//
//   handshake_secret = HKDF-Extract(salt = 0^32, ikm = dh_shared_secret)
//   c_hs_traffic     = DeriveSecret(handshake_secret, "c hs traffic", H(ClientHello..ServerHello))
//   s_hs_traffic     = DeriveSecret(handshake_secret, "s hs traffic", H(ClientHello..ServerHello))
//   finished_key     = ExpandLabel(hs_traffic, "finished")
//   master_secret    = DeriveSecret(handshake_secret, "master", H(ClientHello..server Finished))
//
// Every function here is pure; callers supply the transcript hash for the
// prefix that applies at the point of derivation.

use std::fmt;

use hkdf::Hkdf;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::hash::HASH_LEN;
use crate::error::{Result, StrandBindError};

/// Prefix mixed into every label so secrets cannot collide with other protocols.
const LABEL_PREFIX: &[u8] = b"strandbind ";

pub const LABEL_CLIENT_HANDSHAKE_TRAFFIC: &str = "c hs traffic";
pub const LABEL_SERVER_HANDSHAKE_TRAFFIC: &str = "s hs traffic";
pub const LABEL_MASTER: &str = "master";
pub const LABEL_FINISHED: &str = "finished";
pub const LABEL_KEY: &str = "key";
pub const LABEL_IV: &str = "iv";

/// A 32-byte secret. Compared in constant time, wiped on drop, redacted in `Debug`.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Secret([u8; HASH_LEN]);

impl Secret {
    pub fn from_bytes(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for Secret {}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

/// HKDF-Extract: turn the DH shared secret into the handshake secret.
pub fn extract(dh_shared_secret: &[u8], salt: &[u8]) -> Secret {
    let (prk, _) = Hkdf::<Sha256>::extract(Some(salt), dh_shared_secret);
    let mut out = [0u8; HASH_LEN];
    out.copy_from_slice(&prk);
    Secret(out)
}

/// HKDF-Expand-Label into an arbitrary-length output buffer.
pub fn hkdf_expand_label(
    secret: &Secret,
    label: &str,
    context: &[u8],
    out: &mut [u8],
) -> Result<()> {
    let full_label_len = LABEL_PREFIX.len() + label.len();
    if out.len() > u16::MAX as usize
        || full_label_len > u8::MAX as usize
        || context.len() > u8::MAX as usize
    {
        return Err(StrandBindError::KeyDerivation(format!(
            "expand-label parameters out of range for {label:?}"
        )));
    }

    // info = u16(len) || u8(len(label)) || label || u8(len(context)) || context
    let mut info = Vec::with_capacity(4 + full_label_len + context.len());
    info.extend_from_slice(&(out.len() as u16).to_be_bytes());
    info.push(full_label_len as u8);
    info.extend_from_slice(LABEL_PREFIX);
    info.extend_from_slice(label.as_bytes());
    info.push(context.len() as u8);
    info.extend_from_slice(context);

    let hk = Hkdf::<Sha256>::from_prk(secret.as_bytes())
        .map_err(|e| StrandBindError::KeyDerivation(format!("prk: {e}")))?;
    hk.expand(&info, out)
        .map_err(|e| StrandBindError::KeyDerivation(format!("HKDF expand error: {e}")))
}

/// Derive a 32-byte secret bound to `label` and a transcript hash `context`.
pub fn derive_secret(secret: &Secret, label: &str, context: &[u8]) -> Result<Secret> {
    let mut out = [0u8; HASH_LEN];
    hkdf_expand_label(secret, label, context, &mut out)?;
    Ok(Secret(out))
}

/// Expand a secret under `label` with empty context (used for Finished keys).
pub fn expand_label(secret: &Secret, label: &str) -> Result<Secret> {
    derive_secret(secret, label, &[])
}

/// Record protection key and IV derived from one direction's traffic secret.
pub fn traffic_key_iv(traffic_secret: &Secret) -> Result<([u8; 32], [u8; 12])> {
    let mut key = [0u8; 32];
    let mut iv = [0u8; 12];
    hkdf_expand_label(traffic_secret, LABEL_KEY, &[], &mut key)?;
    hkdf_expand_label(traffic_secret, LABEL_IV, &[], &mut iv)?;
    Ok((key, iv))
}

/// Per-handshake secrets derived once the Hello exchange is complete.
///
/// Owned by exactly one handshake instance and dropped (wiped) when the
/// instance completes or aborts.
#[derive(Debug)]
pub struct HandshakeSecrets {
    handshake_secret: Secret,
    client_traffic: Secret,
    server_traffic: Secret,
}

impl HandshakeSecrets {
    /// Run extract + the two traffic derivations over the Hello transcript hash.
    pub fn derive(dh_shared_secret: &[u8], hello_transcript_hash: &[u8]) -> Result<Self> {
        let handshake_secret = extract(dh_shared_secret, &[0u8; HASH_LEN]);
        let client_traffic = derive_secret(
            &handshake_secret,
            LABEL_CLIENT_HANDSHAKE_TRAFFIC,
            hello_transcript_hash,
        )?;
        let server_traffic = derive_secret(
            &handshake_secret,
            LABEL_SERVER_HANDSHAKE_TRAFFIC,
            hello_transcript_hash,
        )?;
        Ok(Self {
            handshake_secret,
            client_traffic,
            server_traffic,
        })
    }

    /// Initiator-to-responder handshake traffic secret.
    pub fn client_traffic(&self) -> &Secret {
        &self.client_traffic
    }

    /// Responder-to-initiator handshake traffic secret.
    pub fn server_traffic(&self) -> &Secret {
        &self.server_traffic
    }

    pub fn client_finished_key(&self) -> Result<Secret> {
        expand_label(&self.client_traffic, LABEL_FINISHED)
    }

    pub fn server_finished_key(&self) -> Result<Secret> {
        expand_label(&self.server_traffic, LABEL_FINISHED)
    }

    /// Master secret over the transcript through the responder's Finished.
    pub fn master_secret(&self, transcript_hash: &[u8]) -> Result<Secret> {
        derive_secret(&self.handshake_secret, LABEL_MASTER, transcript_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let dh = [0x42u8; 32];
        let th = [0x17u8; 32];
        let a = HandshakeSecrets::derive(&dh, &th).unwrap();
        let b = HandshakeSecrets::derive(&dh, &th).unwrap();
        assert_eq!(a.client_traffic(), b.client_traffic());
        assert_eq!(a.server_traffic(), b.server_traffic());
        assert_eq!(a.master_secret(&th).unwrap(), b.master_secret(&th).unwrap());
    }

    #[test]
    fn directions_and_labels_are_separated() {
        let s = HandshakeSecrets::derive(&[1u8; 32], &[2u8; 32]).unwrap();
        assert_ne!(s.client_traffic(), s.server_traffic());
        assert_ne!(
            s.client_finished_key().unwrap(),
            s.server_finished_key().unwrap()
        );
        assert_ne!(&s.client_finished_key().unwrap(), s.client_traffic());
    }

    #[test]
    fn context_changes_output() {
        let secret = extract(&[9u8; 32], &[0u8; 32]);
        let a = derive_secret(&secret, LABEL_MASTER, &[1u8; 32]).unwrap();
        let b = derive_secret(&secret, LABEL_MASTER, &[2u8; 32]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn rfc5869_extract_vector() {
        // RFC 5869 test case 1 PRK.
        let ikm = [0x0bu8; 22];
        let salt: Vec<u8> = (0x00u8..=0x0c).collect();
        let prk = extract(&ikm, &salt);
        assert_eq!(
            hex::encode(prk.as_bytes()),
            "077709362c2e32df0ddc3f0dc47bba6390b6c73bb50f9c3122ec844ad7c2b3e5"
        );
    }

    #[test]
    fn traffic_key_and_iv_differ_per_direction() {
        let s = HandshakeSecrets::derive(&[5u8; 32], &[6u8; 32]).unwrap();
        let (ck, civ) = traffic_key_iv(s.client_traffic()).unwrap();
        let (sk, siv) = traffic_key_iv(s.server_traffic()).unwrap();
        assert_ne!(ck, sk);
        assert_ne!(civ, siv);
    }

    #[test]
    fn secret_debug_is_redacted() {
        let s = Secret::from_bytes([0xAB; 32]);
        assert_eq!(format!("{s:?}"), "Secret(<redacted>)");
    }
}
