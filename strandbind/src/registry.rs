// DANE-style binding registry.
//
// An identity owner enrolls once with a symmetric credential, then publishes
// the hash of its raw public key or certificate through a credential-MACed
// update. The registry signs each accepted record; clients resolve the signed
// attestation and check it against the registry's known public key.
//
//   owner --AuthenticatedUpdate{record, HMAC(credential)}--> registry
//   client --resolve(identity)--> SignedAttestation{record, Ed25519(registry)}

use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::cert::Certificate;
use crate::crypto::hash::{hash_sha256, hmac_sha256, verify_hmac_sha256};
use crate::crypto::keys::{verify_signature, IdentityKeyPair, PublicKey, SignatureBytes};
use crate::error::{Result, StrandBindError};
use crate::identity::Identity;

const ATTESTATION_CONTEXT: &[u8] = b"strandbind attestation v1\0";
const UPDATE_CONTEXT: &[u8] = b"strandbind update v1\0";

/// What a binding hash covers. Values follow the DANE selector field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RecordType {
    /// SHA-256 over the full encoded certificate.
    Certificate = 0,
    /// SHA-256 over the 32-byte raw public key.
    RawPublicKey = 1,
}

impl TryFrom<u8> for RecordType {
    type Error = StrandBindError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(RecordType::Certificate),
            1 => Ok(RecordType::RawPublicKey),
            other => Err(StrandBindError::Decode(format!(
                "unknown record type 0x{other:02x}"
            ))),
        }
    }
}

/// The record published for an identity: `(identity, record type, hash)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingRecord {
    pub identity: Identity,
    pub record_type: RecordType,
    pub binding_hash: [u8; 32],
}

impl BindingRecord {
    /// Record attesting a raw public key.
    pub fn raw_key(identity: Identity, public_key: &PublicKey) -> Self {
        Self {
            identity,
            record_type: RecordType::RawPublicKey,
            binding_hash: hash_sha256(public_key),
        }
    }

    /// Record attesting a certificate.
    pub fn certificate(identity: Identity, cert: &Certificate) -> Self {
        Self {
            identity,
            record_type: RecordType::Certificate,
            binding_hash: cert.binding_hash(),
        }
    }

    /// `[name_len:1][name][record_type:1][hash:32]`
    pub fn encode(&self) -> Vec<u8> {
        let name = self.identity.as_bytes();
        let mut buf = Vec::with_capacity(1 + name.len() + 1 + 32);
        buf.push(name.len() as u8);
        buf.extend_from_slice(name);
        buf.push(self.record_type as u8);
        buf.extend_from_slice(&self.binding_hash);
        buf
    }

    fn signed_content(&self, context: &[u8]) -> Vec<u8> {
        let mut buf = context.to_vec();
        buf.extend_from_slice(&self.encode());
        buf
    }
}

/// A binding record signed by the registry authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedAttestation {
    pub record: BindingRecord,
    pub signature: SignatureBytes,
}

impl SignedAttestation {
    /// Check the registry signature under the registry's known public key.
    pub fn verify(&self, registry_key: &PublicKey) -> Result<()> {
        verify_signature(
            registry_key,
            &self.record.signed_content(ATTESTATION_CONTEXT),
            &self.signature,
        )
        .map_err(|_| StrandBindError::AttestationSignature(self.record.identity.to_string()))
    }
}

/// Symmetric credential an identity owner uses to authorise updates.
pub struct Credential(Zeroizing<[u8; 32]>);

impl Credential {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        Self(Zeroizing::new(bytes))
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    fn as_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl Clone for Credential {
    fn clone(&self) -> Self {
        Self(Zeroizing::new(*self.0))
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// A binding record authenticated by the owner's credential (the update path).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUpdate {
    pub record: BindingRecord,
    pub mac: [u8; 32],
}

impl AuthenticatedUpdate {
    pub fn new(record: BindingRecord, credential: &Credential) -> Result<Self> {
        let mac = hmac_sha256(credential.as_bytes(), &record.signed_content(UPDATE_CONTEXT))?;
        Ok(Self { record, mac })
    }

    fn verify(&self, credential: &Credential) -> Result<()> {
        verify_hmac_sha256(
            credential.as_bytes(),
            &self.record.signed_content(UPDATE_CONTEXT),
            &self.mac,
        )
        .map_err(|_| StrandBindError::UpdateRejected(self.record.identity.to_string()))
    }
}

/// Lookup interface onto a DANE-style registry.
pub trait Registry: Send + Sync {
    /// Fetch the current signed attestation for `identity`, if one is published.
    fn resolve(&self, identity: &Identity) -> Option<SignedAttestation>;
}

#[derive(Default)]
struct RegistryState {
    credentials: HashMap<Identity, Credential>,
    attestations: HashMap<Identity, SignedAttestation>,
}

/// In-process registry authority.
///
/// Holds exactly one credential per enrolled identity and signs only
/// records whose update MAC verifies under that identity's credential.
pub struct InMemoryRegistry {
    signing_key: IdentityKeyPair,
    state: RwLock<RegistryState>,
}

impl InMemoryRegistry {
    pub fn new(signing_key: IdentityKeyPair) -> Self {
        Self {
            signing_key,
            state: RwLock::new(RegistryState::default()),
        }
    }

    pub fn generate() -> Self {
        Self::new(IdentityKeyPair::generate())
    }

    /// The key clients use to check attestations.
    pub fn public_key(&self) -> PublicKey {
        self.signing_key.public_key_bytes()
    }

    /// Create the TrustRecord for `identity`. Each identity enrolls once.
    pub fn enroll(&self, identity: Identity, credential: Credential) -> Result<()> {
        let mut state = self.state.write();
        if state.credentials.contains_key(&identity) {
            return Err(StrandBindError::AlreadyEnrolled(identity.to_string()));
        }
        tracing::debug!(identity = %identity, "registry enrollment");
        state.credentials.insert(identity, credential);
        Ok(())
    }

    /// Verify an owner update, sign the record, and publish it.
    pub fn submit_update(&self, update: &AuthenticatedUpdate) -> Result<SignedAttestation> {
        let identity = &update.record.identity;
        let mut state = self.state.write();
        let credential = state
            .credentials
            .get(identity)
            .ok_or_else(|| StrandBindError::NotEnrolled(identity.to_string()))?;
        if let Err(e) = update.verify(credential) {
            tracing::warn!(identity = %identity, "registry update rejected");
            return Err(e);
        }

        let signature = self
            .signing_key
            .sign(&update.record.signed_content(ATTESTATION_CONTEXT));
        let attestation = SignedAttestation {
            record: update.record.clone(),
            signature,
        };
        tracing::debug!(
            identity = %identity,
            record_type = ?update.record.record_type,
            "registry published binding"
        );
        state
            .attestations
            .insert(identity.clone(), attestation.clone());
        Ok(attestation)
    }
}

impl Registry for InMemoryRegistry {
    fn resolve(&self, identity: &Identity) -> Option<SignedAttestation> {
        self.state.read().attestations.get(identity).cloned()
    }
}
