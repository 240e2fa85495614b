// Responder (server) role.

use std::sync::Arc;

use crate::cert::read_certificate;
use crate::crypto::x25519::EphemeralKeyPair;
use crate::error::{Result, StrandBindError};
use crate::handshake::config::{LocalIdentity, ResponderConfig};
use crate::handshake::messages::{CertificatePayload, Frame, HandshakeMessage, Hello, CLIENT_MARKER};
use crate::handshake::state::{HandshakePhase, Role, SessionStatus};
use crate::handshake::{
    finished_mac, fresh_nonce, offered, out_of_phase, sign_transcript, unexpected, verify_finished,
    verify_transcript_signature, HandshakeEvent, Progress, TrafficKeys,
};
use crate::key_schedule::Secret;
use crate::session::SessionRecord;
use crate::transcript::Transcript;
use crate::trust::VerifiedPeer;

/// Server side of one handshake attempt.
pub struct Responder {
    config: Arc<ResponderConfig>,
    phase: HandshakePhase,
    status: SessionStatus,
    transcript: Transcript,
    local: Option<LocalIdentity>,
    keys: Option<TrafficKeys>,
    master_secret: Option<Secret>,
    peer: Option<VerifiedPeer>,
    session: Option<SessionRecord>,
}

impl Responder {
    /// Accepts a `ResponderConfig` or an `Arc` shared across instances.
    pub fn new(config: impl Into<Arc<ResponderConfig>>) -> Self {
        Self {
            config: config.into(),
            phase: HandshakePhase::Start,
            status: SessionStatus::Pending,
            transcript: Transcript::new(),
            local: None,
            keys: None,
            master_secret: None,
            peer: None,
            session: None,
        }
    }

    pub fn phase(&self) -> HandshakePhase {
        self.phase
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn session(&self) -> Option<&SessionRecord> {
        self.session.as_ref()
    }

    /// The identity selected for this connection, once the ClientHello is processed.
    pub fn served_identity(&self) -> Option<&LocalIdentity> {
        self.local.as_ref()
    }

    /// Process one message from the initiator.
    ///
    /// Any error aborts the instance and is returned; afterwards every call
    /// returns `AlreadyAborted`.
    pub fn handle(&mut self, data: &[u8], now: u64) -> Result<Progress> {
        match self.phase {
            HandshakePhase::Aborted => return Err(StrandBindError::AlreadyAborted),
            HandshakePhase::Complete => {
                return Err(StrandBindError::UnexpectedMessage {
                    expected: "no further messages",
                    got: Frame::decode(data).map(|f| f.label()).unwrap_or("malformed"),
                })
            }
            _ => {}
        }
        self.step(data, now).map_err(|e| self.fail(e))
    }

    /// Abort on a failure reported from outside the engine. No-op once the
    /// instance is terminal. Returns `reason`.
    pub fn abort(&mut self, reason: StrandBindError) -> StrandBindError {
        if self.phase.is_terminal() {
            return reason;
        }
        self.fail(reason)
    }

    fn step(&mut self, data: &[u8], now: u64) -> Result<Progress> {
        let frame = Frame::decode(data)?;
        match self.phase {
            HandshakePhase::Start => self.on_client_hello(frame, data),
            HandshakePhase::KeysDerived if self.config.client_verifier.is_some() => {
                self.on_certificate(frame, now)
            }
            HandshakePhase::KeysDerived => self.on_finished(frame),
            HandshakePhase::PeerAuthVerified => self.on_certificate_verify(frame),
            HandshakePhase::PeerSignatureVerified => self.on_finished(frame),
            phase => Err(out_of_phase(phase, "KeysDerived")),
        }
    }

    fn on_client_hello(&mut self, frame: Frame, data: &[u8]) -> Result<Progress> {
        let hello = match frame {
            Frame::ClientHello(hello) => hello,
            other => {
                return Err(StrandBindError::UnexpectedMessage {
                    expected: "ClientHello",
                    got: other.label(),
                })
            }
        };
        if hello.marker != CLIENT_MARKER {
            return Err(StrandBindError::ReflectedHello);
        }

        let local = self
            .config
            .select_identity(hello.requested_identity.as_ref())?
            .clone();
        if hello.requested_identity.is_none() {
            tracing::debug!(
                identity = %local.identity(),
                "no requested identity, serving default"
            );
        }

        self.transcript.append(data);
        let ephemeral = EphemeralKeyPair::generate();
        let server_hello = Frame::ServerHello(Hello {
            nonce: fresh_nonce(),
            dh_public: ephemeral.public_key_bytes(),
            marker: 0,
            requested_identity: None,
        })
        .encode();
        self.transcript.append(&server_hello);

        let shared = ephemeral.diffie_hellman(&hello.dh_public)?;
        drop(ephemeral);
        let mut keys = TrafficKeys::derive(
            Role::Responder,
            self.config.cipher_suite,
            &shared[..],
            &self.transcript.hash(),
        )?;

        let mut outgoing = vec![server_hello];
        let certificate = HandshakeMessage::Certificate(local.payload(false));
        outgoing.push(keys.seal(&mut self.transcript, &certificate)?);
        let verify = sign_transcript(Role::Responder, local.keypair(), &self.transcript);
        outgoing.push(keys.seal(&mut self.transcript, &verify)?);
        let finished = finished_mac(&keys.secrets.server_finished_key()?, &self.transcript)?;
        outgoing.push(keys.seal(&mut self.transcript, &finished)?);

        self.master_secret = Some(keys.secrets.master_secret(&self.transcript.hash())?);
        self.keys = Some(keys);
        self.local = Some(local);
        self.enter(HandshakePhase::KeysDerived);
        Ok(Progress {
            outgoing,
            events: Vec::new(),
        })
    }

    fn on_certificate(&mut self, frame: Frame, now: u64) -> Result<Progress> {
        let keys = self
            .keys
            .as_mut()
            .ok_or_else(|| out_of_phase(self.phase, "PeerAuthVerified"))?;
        let (message, plaintext) = keys.open(frame, "Certificate")?;
        let HandshakeMessage::Certificate(payload) = &message else {
            return Err(unexpected("Certificate", &message));
        };
        let verifier = self
            .config
            .client_verifier
            .as_ref()
            .ok_or_else(|| out_of_phase(self.phase, "PeerAuthVerified"))?;

        let claimed = match payload {
            CertificatePayload::RawKeyWithIdentity { identity, .. } => identity.clone(),
            CertificatePayload::Certificate(blob) => read_certificate(blob)?.0,
            CertificatePayload::RawKey(_) => {
                return Err(StrandBindError::binding(
                    "<unclaimed>",
                    "client raw key carries no identity",
                ))
            }
        };
        let peer = verifier.verify(&claimed, offered(payload), now)?;

        self.transcript.append(&plaintext);
        self.peer = Some(peer);
        self.enter(HandshakePhase::PeerAuthVerified);
        Ok(Progress::default())
    }

    fn on_certificate_verify(&mut self, frame: Frame) -> Result<Progress> {
        let keys = self
            .keys
            .as_mut()
            .ok_or_else(|| out_of_phase(self.phase, "PeerSignatureVerified"))?;
        let (message, plaintext) = keys.open(frame, "CertificateVerify")?;
        let HandshakeMessage::CertificateVerify { signature } = &message else {
            return Err(unexpected("CertificateVerify", &message));
        };
        let peer = self
            .peer
            .as_ref()
            .ok_or_else(|| out_of_phase(self.phase, "PeerSignatureVerified"))?;

        verify_transcript_signature(Role::Initiator, &peer.public_key, &self.transcript, signature)?;

        self.transcript.append(&plaintext);
        self.enter(HandshakePhase::PeerSignatureVerified);
        Ok(Progress::default())
    }

    fn on_finished(&mut self, frame: Frame) -> Result<Progress> {
        let phase = self.phase;
        let keys = self
            .keys
            .as_mut()
            .ok_or_else(|| out_of_phase(phase, "Complete"))?;
        let (message, plaintext) = keys.open(frame, "Finished")?;
        let HandshakeMessage::Finished { mac } = &message else {
            return Err(unexpected("Finished", &message));
        };
        verify_finished(&keys.secrets.client_finished_key()?, &self.transcript, mac)?;
        self.transcript.append(&plaintext);

        let master_secret = self
            .master_secret
            .take()
            .ok_or_else(|| out_of_phase(phase, "Complete"))?;

        let mut progress = Progress::default();
        if let Some(peer) = &self.peer {
            self.status.advance(SessionStatus::Authenticated)?;
            progress
                .events
                .push(HandshakeEvent::PeerAuthenticated(peer.clone()));
        }
        self.status.advance(SessionStatus::Complete)?;

        let record = SessionRecord::new(
            Role::Responder,
            self.local.as_ref().map(|local| local.identity().clone()),
            self.peer.take(),
            self.config.cipher_suite,
            self.transcript.hash(),
            master_secret,
        );
        self.keys = None;
        self.enter(HandshakePhase::Complete);

        self.session = Some(record.clone());
        progress.events.push(HandshakeEvent::Complete(record));
        Ok(progress)
    }

    fn enter(&mut self, next: HandshakePhase) {
        tracing::debug!(
            role = Role::Responder.label(),
            identity = ?self.local.as_ref().map(|l| l.identity().as_str()),
            from = self.phase.label(),
            to = next.label(),
            "handshake phase"
        );
        self.phase = next;
    }

    /// Move to `Aborted` and drop every secret this instance holds.
    fn fail(&mut self, error: StrandBindError) -> StrandBindError {
        tracing::warn!(
            role = Role::Responder.label(),
            identity = ?self.local.as_ref().map(|l| l.identity().as_str()),
            phase = self.phase.label(),
            kind = %error.kind(),
            error = %error,
            "handshake aborted"
        );
        self.phase = HandshakePhase::Aborted;
        self.keys = None;
        self.master_secret = None;
        self.peer = None;
        error
    }
}

impl std::fmt::Debug for Responder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Responder")
            .field("served", &self.local.as_ref().map(|l| l.identity()))
            .field("phase", &self.phase)
            .field("status", &self.status)
            .field("messages", &self.transcript.len())
            .finish_non_exhaustive()
    }
}
