// Handshake configuration: local identities, trust verifiers and policies.

use std::fmt;
use std::sync::Arc;

use crate::cert::Certificate;
use crate::crypto::aead::CipherSuite;
use crate::crypto::keys::IdentityKeyPair;
use crate::error::{Result, StrandBindError};
use crate::handshake::messages::CertificatePayload;
use crate::identity::Identity;
use crate::trust::BindingVerifier;

/// How a party presents its long-term key.
#[derive(Debug, Clone)]
pub enum LocalCredential {
    /// The bare 32-byte public key.
    RawKey,
    /// A certificate over the key (self-signed for DANE-certificate deployments).
    Certificate(Certificate),
}

/// An identity this party owns, with the key pair that proves it.
///
/// The key pair is shared read-only by every concurrent handshake.
#[derive(Clone)]
pub struct LocalIdentity {
    identity: Identity,
    keypair: Arc<IdentityKeyPair>,
    credential: LocalCredential,
}

impl LocalIdentity {
    /// Present the key pair as a raw public key.
    pub fn raw_key(identity: Identity, keypair: Arc<IdentityKeyPair>) -> Self {
        Self {
            identity,
            keypair,
            credential: LocalCredential::RawKey,
        }
    }

    /// Present the key pair through `certificate`, which must name `identity`
    /// and certify this key pair's public key.
    pub fn with_certificate(
        identity: Identity,
        keypair: Arc<IdentityKeyPair>,
        certificate: Certificate,
    ) -> Result<Self> {
        if certificate.identity != identity {
            return Err(StrandBindError::Config(format!(
                "certificate names {}, local identity is {identity}",
                certificate.identity
            )));
        }
        if certificate.public_key != keypair.public_key_bytes() {
            return Err(StrandBindError::Config(format!(
                "certificate for {identity} does not certify the local key pair"
            )));
        }
        Ok(Self {
            identity,
            keypair,
            credential: LocalCredential::Certificate(certificate),
        })
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn keypair(&self) -> &IdentityKeyPair {
        &self.keypair
    }

    pub fn credential(&self) -> &LocalCredential {
        &self.credential
    }

    /// Certificate message payload. A client presenting a raw key also
    /// claims its identity; a server's identity was fixed by the Hello.
    pub(crate) fn payload(&self, claim_identity: bool) -> CertificatePayload {
        match &self.credential {
            LocalCredential::Certificate(cert) => CertificatePayload::Certificate(cert.to_bytes()),
            LocalCredential::RawKey if claim_identity => CertificatePayload::RawKeyWithIdentity {
                public_key: self.keypair.public_key_bytes(),
                identity: self.identity.clone(),
            },
            LocalCredential::RawKey => CertificatePayload::RawKey(self.keypair.public_key_bytes()),
        }
    }
}

impl fmt::Debug for LocalIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalIdentity")
            .field("identity", &self.identity)
            .field("keypair", &self.keypair)
            .field("credential", &self.credential)
            .finish()
    }
}

/// What a responder does with a ClientHello that names no identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServerNamePolicy {
    /// Reject the handshake with `IdentityRejected`.
    #[default]
    Strict,
    /// Serve the responder's first configured identity.
    ///
    /// The initiator still verifies the served identity against the one it
    /// expected, so a mismatch surfaces there as a binding failure.
    ServeDefault,
}

/// Initiator-side configuration.
#[derive(Debug, Clone)]
pub struct InitiatorConfig {
    /// Identity the initiator intends to reach. The responder's credential is
    /// always verified against this identity.
    pub expected_peer: Identity,
    /// Whether the ClientHello names `expected_peer`. When `false` the
    /// requested-identity field is left absent.
    pub send_requested_identity: bool,
    /// Trust model used to verify the responder.
    pub verifier: BindingVerifier,
    /// Present this identity to the responder (mutual variants).
    pub client_identity: Option<LocalIdentity>,
    pub cipher_suite: CipherSuite,
}

impl InitiatorConfig {
    pub fn new(expected_peer: Identity, verifier: BindingVerifier) -> Self {
        Self {
            expected_peer,
            send_requested_identity: true,
            verifier,
            client_identity: None,
            cipher_suite: CipherSuite::default(),
        }
    }

    pub fn with_client_identity(mut self, identity: LocalIdentity) -> Self {
        self.client_identity = Some(identity);
        self
    }

    /// Send the ClientHello with the requested-identity field absent.
    pub fn without_requested_identity(mut self) -> Self {
        self.send_requested_identity = false;
        self
    }

    pub fn with_cipher_suite(mut self, suite: CipherSuite) -> Self {
        self.cipher_suite = suite;
        self
    }
}

/// Responder-side configuration. Shared (behind an `Arc`) by every
/// handshake an acceptor spawns.
#[derive(Debug, Clone)]
pub struct ResponderConfig {
    /// Identities this responder owns. The first is the default identity.
    pub identities: Vec<LocalIdentity>,
    pub name_policy: ServerNamePolicy,
    /// When set, the client must authenticate and is verified with this model.
    pub client_verifier: Option<BindingVerifier>,
    pub cipher_suite: CipherSuite,
}

impl ResponderConfig {
    pub fn new(identity: LocalIdentity) -> Self {
        Self {
            identities: vec![identity],
            name_policy: ServerNamePolicy::default(),
            client_verifier: None,
            cipher_suite: CipherSuite::default(),
        }
    }

    /// Own an additional identity (virtual hosting).
    pub fn with_identity(mut self, identity: LocalIdentity) -> Self {
        self.identities.push(identity);
        self
    }

    pub fn with_name_policy(mut self, policy: ServerNamePolicy) -> Self {
        self.name_policy = policy;
        self
    }

    pub fn require_client_auth(mut self, verifier: BindingVerifier) -> Self {
        self.client_verifier = Some(verifier);
        self
    }

    pub fn with_cipher_suite(mut self, suite: CipherSuite) -> Self {
        self.cipher_suite = suite;
        self
    }

    /// Pick the identity to serve for a ClientHello's requested identity.
    pub fn select_identity(&self, requested: Option<&Identity>) -> Result<&LocalIdentity> {
        match requested {
            Some(name) => self
                .identities
                .iter()
                .find(|local| local.identity() == name)
                .ok_or_else(|| StrandBindError::IdentityRejected(name.to_string())),
            None => match self.name_policy {
                ServerNamePolicy::Strict => Err(StrandBindError::IdentityRejected(
                    "no requested identity".into(),
                )),
                ServerNamePolicy::ServeDefault => self
                    .identities
                    .first()
                    .ok_or_else(|| StrandBindError::Config("responder owns no identity".into())),
            },
        }
    }
}
