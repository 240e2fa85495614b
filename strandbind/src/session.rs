// Session record: the terminal artifact of a completed handshake.

use crate::cert::Certificate;
use crate::crypto::aead::CipherSuite;
use crate::crypto::keys::PublicKey;
use crate::handshake::state::{Role, SessionStatus};
use crate::identity::Identity;
use crate::key_schedule::Secret;
use crate::trust::{TrustModel, VerifiedPeer};

/// Everything the application layer needs to authorise traffic on the
/// established session. Built only on reaching `Complete`; immutable after.
///
/// In server-only variants the responder's record has no authenticated
/// peer. Check [`SessionRecord::authenticated_peer`] rather than assuming
/// mutual authentication.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    role: Role,
    local_identity: Option<Identity>,
    peer: Option<VerifiedPeer>,
    cipher_suite: CipherSuite,
    transcript_hash: [u8; 32],
    master_secret: Secret,
    status: SessionStatus,
}

impl SessionRecord {
    pub(crate) fn new(
        role: Role,
        local_identity: Option<Identity>,
        peer: Option<VerifiedPeer>,
        cipher_suite: CipherSuite,
        transcript_hash: [u8; 32],
        master_secret: Secret,
    ) -> Self {
        Self {
            role,
            local_identity,
            peer,
            cipher_suite,
            transcript_hash,
            master_secret,
            status: SessionStatus::Complete,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// The identity this side proved, if it authenticated at all.
    pub fn local_identity(&self) -> Option<&Identity> {
        self.local_identity.as_ref()
    }

    /// The peer's verified binding. `None` when the peer did not authenticate.
    pub fn authenticated_peer(&self) -> Option<&VerifiedPeer> {
        self.peer.as_ref()
    }

    pub fn peer_identity(&self) -> Option<&Identity> {
        self.peer.as_ref().map(|p| &p.identity)
    }

    pub fn peer_public_key(&self) -> Option<&PublicKey> {
        self.peer.as_ref().map(|p| &p.public_key)
    }

    pub fn peer_certificate(&self) -> Option<&Certificate> {
        self.peer.as_ref().and_then(|p| p.certificate.as_ref())
    }

    /// Trust model under which the peer was accepted.
    pub fn trust_model(&self) -> Option<TrustModel> {
        self.peer.as_ref().map(|p| p.model)
    }

    pub fn cipher_suite(&self) -> CipherSuite {
        self.cipher_suite
    }

    /// Transcript hash over every handshake message, through the last Finished.
    pub fn transcript_hash(&self) -> &[u8; 32] {
        &self.transcript_hash
    }

    pub fn master_secret(&self) -> &Secret {
        &self.master_secret
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }
}
