// Initiator (client) role.

use crate::crypto::x25519::EphemeralKeyPair;
use crate::error::{Result, StrandBindError};
use crate::handshake::config::InitiatorConfig;
use crate::handshake::messages::{CertificatePayload, Frame, HandshakeMessage, Hello, CLIENT_MARKER};
use crate::handshake::state::{HandshakePhase, Role, SessionStatus};
use crate::handshake::{
    finished_mac, fresh_nonce, offered, out_of_phase, sign_transcript, unexpected, verify_finished,
    verify_transcript_signature, HandshakeEvent, Progress, TrafficKeys,
};
use crate::session::SessionRecord;
use crate::transcript::Transcript;
use crate::trust::VerifiedPeer;

/// Client side of one handshake attempt.
///
/// # Example
/// ```ignore
/// let mut initiator = Initiator::new(config);
/// transport.send(initiator.start()?);
/// while initiator.session().is_none() {
///     let progress = initiator.handle(&transport.receive()?, now)?;
///     for message in progress.outgoing { transport.send(message); }
/// }
/// ```
pub struct Initiator {
    config: InitiatorConfig,
    phase: HandshakePhase,
    status: SessionStatus,
    transcript: Transcript,
    ephemeral: Option<EphemeralKeyPair>,
    keys: Option<TrafficKeys>,
    peer: Option<VerifiedPeer>,
    session: Option<SessionRecord>,
}

impl Initiator {
    pub fn new(config: InitiatorConfig) -> Self {
        Self {
            config,
            phase: HandshakePhase::Start,
            status: SessionStatus::Pending,
            transcript: Transcript::new(),
            ephemeral: None,
            keys: None,
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

    /// The session record, once the handshake is complete.
    pub fn session(&self) -> Option<&SessionRecord> {
        self.session.as_ref()
    }

    pub fn config(&self) -> &InitiatorConfig {
        &self.config
    }

    /// Produce the ClientHello. Fresh nonce and ephemeral key per call site;
    /// an instance starts exactly once.
    pub fn start(&mut self) -> Result<Vec<u8>> {
        match self.phase {
            HandshakePhase::Start => {}
            HandshakePhase::Aborted => return Err(StrandBindError::AlreadyAborted),
            // A finished session stays finished.
            HandshakePhase::Complete => return Err(out_of_phase(self.phase, "SentHello")),
            phase => return Err(self.fail(out_of_phase(phase, "SentHello"))),
        }

        let ephemeral = EphemeralKeyPair::generate();
        let hello = Hello {
            nonce: fresh_nonce(),
            dh_public: ephemeral.public_key_bytes(),
            marker: CLIENT_MARKER,
            requested_identity: self
                .config
                .send_requested_identity
                .then(|| self.config.expected_peer.clone()),
        };
        let bytes = Frame::ClientHello(hello).encode();
        self.transcript.append(&bytes);
        self.ephemeral = Some(ephemeral);
        self.enter(HandshakePhase::SentHello);
        Ok(bytes)
    }

    /// Process one message from the responder.
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

    /// Abort on a failure reported from outside the engine (transport close,
    /// timeout). No-op once the instance is terminal. Returns `reason`.
    pub fn abort(&mut self, reason: StrandBindError) -> StrandBindError {
        if self.phase.is_terminal() {
            return reason;
        }
        self.fail(reason)
    }

    fn step(&mut self, data: &[u8], now: u64) -> Result<Progress> {
        let frame = Frame::decode(data)?;
        match self.phase {
            HandshakePhase::SentHello => self.on_server_hello(frame, data),
            HandshakePhase::KeysDerived => self.on_certificate(frame, now),
            HandshakePhase::PeerAuthVerified => self.on_certificate_verify(frame),
            HandshakePhase::PeerSignatureVerified => self.on_finished(frame),
            phase => Err(out_of_phase(phase, "KeysDerived")),
        }
    }

    fn on_server_hello(&mut self, frame: Frame, data: &[u8]) -> Result<Progress> {
        let hello = match frame {
            Frame::ServerHello(hello) => hello,
            other => {
                return Err(StrandBindError::UnexpectedMessage {
                    expected: "ServerHello",
                    got: other.label(),
                })
            }
        };
        if hello.marker != 0 {
            return Err(StrandBindError::ReflectedHello);
        }
        let ephemeral = self
            .ephemeral
            .take()
            .ok_or_else(|| out_of_phase(self.phase, "KeysDerived"))?;

        self.transcript.append(data);
        let shared = ephemeral.diffie_hellman(&hello.dh_public)?;
        drop(ephemeral);

        let keys = TrafficKeys::derive(
            Role::Initiator,
            self.config.cipher_suite,
            &shared[..],
            &self.transcript.hash(),
        )?;
        self.keys = Some(keys);
        self.enter(HandshakePhase::KeysDerived);
        Ok(Progress::default())
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

        let expected = &self.config.expected_peer;
        if let CertificatePayload::RawKeyWithIdentity { identity, .. } = payload {
            if identity != expected {
                return Err(StrandBindError::binding(
                    expected,
                    format!("responder claims {identity}"),
                ));
            }
        }
        let peer = self.config.verifier.verify(expected, offered(payload), now)?;

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

        verify_transcript_signature(Role::Responder, &peer.public_key, &self.transcript, signature)?;

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
        verify_finished(&keys.secrets.server_finished_key()?, &self.transcript, mac)?;
        self.transcript.append(&plaintext);

        let master_secret = keys.secrets.master_secret(&self.transcript.hash())?;
        let peer = self
            .peer
            .take()
            .ok_or_else(|| out_of_phase(phase, "Complete"))?;
        self.status.advance(SessionStatus::Authenticated)?;

        let mut progress = Progress::default();
        progress
            .events
            .push(HandshakeEvent::PeerAuthenticated(peer.clone()));

        if let Some(local) = &self.config.client_identity {
            let certificate = HandshakeMessage::Certificate(local.payload(true));
            progress.outgoing.push(keys.seal(&mut self.transcript, &certificate)?);
            let verify = sign_transcript(Role::Initiator, local.keypair(), &self.transcript);
            progress.outgoing.push(keys.seal(&mut self.transcript, &verify)?);
        }
        let finished = finished_mac(&keys.secrets.client_finished_key()?, &self.transcript)?;
        progress.outgoing.push(keys.seal(&mut self.transcript, &finished)?);

        let record = SessionRecord::new(
            Role::Initiator,
            self.config
                .client_identity
                .as_ref()
                .map(|local| local.identity().clone()),
            Some(peer),
            self.config.cipher_suite,
            self.transcript.hash(),
            master_secret,
        );
        self.status.advance(SessionStatus::Complete)?;
        self.keys = None;
        self.enter(HandshakePhase::Complete);

        self.session = Some(record.clone());
        progress.events.push(HandshakeEvent::Complete(record));
        Ok(progress)
    }

    fn enter(&mut self, next: HandshakePhase) {
        tracing::debug!(
            role = Role::Initiator.label(),
            peer = %self.config.expected_peer,
            from = self.phase.label(),
            to = next.label(),
            "handshake phase"
        );
        self.phase = next;
    }

    /// Move to `Aborted` and drop every secret this instance holds.
    fn fail(&mut self, error: StrandBindError) -> StrandBindError {
        tracing::warn!(
            role = Role::Initiator.label(),
            peer = %self.config.expected_peer,
            phase = self.phase.label(),
            kind = %error.kind(),
            error = %error,
            "handshake aborted"
        );
        self.phase = HandshakePhase::Aborted;
        self.ephemeral = None;
        self.keys = None;
        self.peer = None;
        error
    }
}

impl std::fmt::Debug for Initiator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Initiator")
            .field("expected_peer", &self.config.expected_peer)
            .field("phase", &self.phase)
            .field("status", &self.status)
            .field("messages", &self.transcript.len())
            .finish_non_exhaustive()
    }
}
