// Trust binding verifier: decides whether an offered raw key or certificate is
// an authorised binding for an identity under the deployment's trust model.
//
// Exactly three models exist and the choice is made once, when the verifier
// is built. Every path fails closed.

pub mod table;

use std::fmt;
use std::sync::Arc;

use subtle::ConstantTimeEq;

use crate::cert::validator::validate_self_signed;
use crate::cert::{serializer, Certificate};
use crate::crypto::hash::hash_sha256;
use crate::crypto::keys::PublicKey;
use crate::error::{Result, StrandBindError};
use crate::identity::Identity;
use crate::registry::{RecordType, Registry, SignedAttestation};

pub use table::{TrustSnapshot, TrustTable};

/// The trust model under which a peer was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrustModel {
    /// Raw public key attested by a signed DANE-style record.
    DaneRawKey,
    /// Self-signed certificate whose hash is attested by a DANE-style record.
    DaneCertificate,
    /// Raw public key listed in a pre-configured trust table.
    Pinned,
}

impl TrustModel {
    pub fn label(self) -> &'static str {
        match self {
            TrustModel::DaneRawKey => "dane-raw-key",
            TrustModel::DaneCertificate => "dane-certificate",
            TrustModel::Pinned => "pinned",
        }
    }
}

impl fmt::Display for TrustModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Credential material a peer presented in its Certificate message.
#[derive(Debug, Clone, Copy)]
pub enum OfferedCredential<'a> {
    RawKey(&'a PublicKey),
    /// Encoded certificate blob, exactly as received.
    Certificate(&'a [u8]),
}

impl OfferedCredential<'_> {
    fn kind(&self) -> &'static str {
        match self {
            OfferedCredential::RawKey(_) => "raw key",
            OfferedCredential::Certificate(_) => "certificate",
        }
    }
}

/// A binding the verifier accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedPeer {
    pub identity: Identity,
    pub public_key: PublicKey,
    pub certificate: Option<Certificate>,
    pub model: TrustModel,
}

/// The deployment's binding strategy.
#[derive(Clone)]
pub enum BindingVerifier {
    DaneRawKey {
        registry: Arc<dyn Registry>,
        registry_key: PublicKey,
    },
    DaneCertificate {
        registry: Arc<dyn Registry>,
        registry_key: PublicKey,
    },
    Pinned {
        table: TrustTable,
    },
}

impl BindingVerifier {
    pub fn dane_raw_key(registry: Arc<dyn Registry>, registry_key: PublicKey) -> Self {
        BindingVerifier::DaneRawKey {
            registry,
            registry_key,
        }
    }

    pub fn dane_certificate(registry: Arc<dyn Registry>, registry_key: PublicKey) -> Self {
        BindingVerifier::DaneCertificate {
            registry,
            registry_key,
        }
    }

    pub fn pinned(table: TrustTable) -> Self {
        BindingVerifier::Pinned { table }
    }

    pub fn model(&self) -> TrustModel {
        match self {
            BindingVerifier::DaneRawKey { .. } => TrustModel::DaneRawKey,
            BindingVerifier::DaneCertificate { .. } => TrustModel::DaneCertificate,
            BindingVerifier::Pinned { .. } => TrustModel::Pinned,
        }
    }

    /// Is `offered` an authorised binding for `identity`?
    ///
    /// `now` (unix seconds) is used for certificate validity windows.
    pub fn verify(
        &self,
        identity: &Identity,
        offered: OfferedCredential<'_>,
        now: u64,
    ) -> Result<VerifiedPeer> {
        let result = match self {
            BindingVerifier::DaneRawKey {
                registry,
                registry_key,
            } => verify_dane_raw_key(registry.as_ref(), registry_key, identity, offered),
            BindingVerifier::DaneCertificate {
                registry,
                registry_key,
            } => verify_dane_certificate(registry.as_ref(), registry_key, identity, offered, now),
            BindingVerifier::Pinned { table } => verify_pinned(&table.snapshot(), identity, offered),
        };

        match &result {
            Ok(peer) => tracing::debug!(
                identity = %identity,
                model = %self.model(),
                public_key = %hex::encode(peer.public_key),
                "binding accepted"
            ),
            Err(e) => tracing::debug!(
                identity = %identity,
                model = %self.model(),
                kind = %e.kind(),
                error = %e,
                "binding rejected"
            ),
        }
        result
    }
}

impl fmt::Debug for BindingVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingVerifier::DaneRawKey { registry_key, .. }
            | BindingVerifier::DaneCertificate { registry_key, .. } => f
                .debug_struct("BindingVerifier")
                .field("model", &self.model())
                .field("registry_key", &hex::encode(registry_key))
                .finish_non_exhaustive(),
            BindingVerifier::Pinned { table } => f
                .debug_struct("BindingVerifier")
                .field("model", &self.model())
                .field("table", table)
                .finish(),
        }
    }
}

// ── DANE ───────────────────────────────────────────────────────────────

/// Resolve and authenticate the attestation for `identity`, requiring `expected` record type.
fn resolve_attestation(
    registry: &dyn Registry,
    registry_key: &PublicKey,
    identity: &Identity,
    expected: RecordType,
) -> Result<SignedAttestation> {
    let attestation = registry
        .resolve(identity)
        .ok_or_else(|| StrandBindError::MissingAttestation(identity.to_string()))?;
    attestation.verify(registry_key)?;

    if attestation.record.identity != *identity {
        return Err(StrandBindError::binding(
            identity,
            format!("attestation names {}", attestation.record.identity),
        ));
    }
    if attestation.record.record_type != expected {
        return Err(StrandBindError::binding(
            identity,
            format!(
                "attested record type {:?}, expected {expected:?}",
                attestation.record.record_type
            ),
        ));
    }
    Ok(attestation)
}

fn hash_matches(attested: &[u8; 32], data: &[u8]) -> bool {
    hash_sha256(data).ct_eq(attested).into()
}

fn verify_dane_raw_key(
    registry: &dyn Registry,
    registry_key: &PublicKey,
    identity: &Identity,
    offered: OfferedCredential<'_>,
) -> Result<VerifiedPeer> {
    let OfferedCredential::RawKey(key) = offered else {
        return Err(StrandBindError::binding(
            identity,
            format!("dane-raw-key expects a raw key, got {}", offered.kind()),
        ));
    };
    let attestation = resolve_attestation(registry, registry_key, identity, RecordType::RawPublicKey)?;
    if !hash_matches(&attestation.record.binding_hash, key) {
        return Err(StrandBindError::binding(
            identity,
            "offered key does not match attested hash",
        ));
    }
    Ok(VerifiedPeer {
        identity: identity.clone(),
        public_key: *key,
        certificate: None,
        model: TrustModel::DaneRawKey,
    })
}

fn verify_dane_certificate(
    registry: &dyn Registry,
    registry_key: &PublicKey,
    identity: &Identity,
    offered: OfferedCredential<'_>,
    now: u64,
) -> Result<VerifiedPeer> {
    let OfferedCredential::Certificate(blob) = offered else {
        return Err(StrandBindError::binding(
            identity,
            format!("dane-certificate expects a certificate, got {}", offered.kind()),
        ));
    };
    let attestation = resolve_attestation(registry, registry_key, identity, RecordType::Certificate)?;
    if !hash_matches(&attestation.record.binding_hash, blob) {
        return Err(StrandBindError::binding(
            identity,
            "offered certificate does not match attested hash",
        ));
    }

    let cert = serializer::deserialize(blob)?;
    if cert.identity != *identity {
        return Err(StrandBindError::binding(
            identity,
            format!("certificate names {}", cert.identity),
        ));
    }
    validate_self_signed(&cert, now)?;

    Ok(VerifiedPeer {
        identity: identity.clone(),
        public_key: cert.public_key,
        certificate: Some(cert),
        model: TrustModel::DaneCertificate,
    })
}

// ── Pinned ─────────────────────────────────────────────────────────────

fn verify_pinned(
    snapshot: &TrustSnapshot,
    identity: &Identity,
    offered: OfferedCredential<'_>,
) -> Result<VerifiedPeer> {
    let OfferedCredential::RawKey(key) = offered else {
        return Err(StrandBindError::binding(
            identity,
            format!("pinned expects a raw key, got {}", offered.kind()),
        ));
    };
    let authorised = snapshot
        .lookup_binding(identity)
        .ok_or_else(|| StrandBindError::binding(identity, "identity not in trust table"))?;
    if !authorised.iter().any(|k| bool::from(k.ct_eq(key))) {
        return Err(StrandBindError::binding(
            identity,
            "offered key is not authorised in trust table",
        ));
    }
    Ok(VerifiedPeer {
        identity: identity.clone(),
        public_key: *key,
        certificate: None,
        model: TrustModel::Pinned,
    })
}
