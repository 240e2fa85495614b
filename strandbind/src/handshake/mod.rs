// StrandBind handshake: sans-IO initiator and responder state machines.
//
//   Initiator                                        Responder
//     |--- ClientHello(nonce, dh, marker, [name]) ----->|
//     |<-- ServerHello(nonce, dh) ----------------------|
//     |<-- {Certificate} {CertificateVerify} {Finished} |
//     |--- [{Certificate} {CertificateVerify}] -------->|   mutual variants only
//     |--- {Finished} --------------------------------->|
//
// `{}` marks messages sealed under the sender's handshake traffic secret.
// Neither role touches a transport: callers feed received bytes in and send
// whatever comes back in `Progress::outgoing`.

pub mod config;
pub mod initiator;
pub mod messages;
pub mod record;
pub mod responder;
pub mod state;

use rand::rngs::OsRng;
use rand::RngCore;

use crate::crypto::aead::CipherSuite;
use crate::crypto::hash::{hmac_sha256, verify_hmac_sha256};
use crate::crypto::keys::{verify_signature, IdentityKeyPair, PublicKey, SignatureBytes};
use crate::error::{Result, StrandBindError};
use crate::key_schedule::{HandshakeSecrets, Secret};
use crate::session::SessionRecord;
use crate::transcript::Transcript;
use crate::trust::{OfferedCredential, VerifiedPeer};

use messages::{CertificatePayload, Frame, HandshakeMessage};
use record::RecordProtector;
use state::Role;

pub use config::{InitiatorConfig, LocalCredential, LocalIdentity, ResponderConfig, ServerNamePolicy};
pub use initiator::Initiator;
pub use responder::Responder;
pub use state::{HandshakePhase, SessionStatus};

const SERVER_VERIFY_CONTEXT: &[u8] = b"strandbind server verify\0";
const CLIENT_VERIFY_CONTEXT: &[u8] = b"strandbind client verify\0";

/// Something a handshake instance reports to its caller.
#[derive(Debug, Clone)]
pub enum HandshakeEvent {
    /// The peer's binding, transcript signature and Finished MAC all verified.
    PeerAuthenticated(VerifiedPeer),
    /// The handshake finished; the session record is final.
    Complete(SessionRecord),
}

/// Result of feeding one message to a handshake instance.
#[derive(Debug, Default)]
pub struct Progress {
    /// Transport messages to send, in order.
    pub outgoing: Vec<Vec<u8>>,
    pub events: Vec<HandshakeEvent>,
}

impl Progress {
    /// The completed session, if this step produced one.
    pub fn session(&self) -> Option<&SessionRecord> {
        self.events.iter().find_map(|event| match event {
            HandshakeEvent::Complete(record) => Some(record),
            _ => None,
        })
    }
}

/// Secrets and record protection for one instance, created once the Hellos
/// have been exchanged. Dropped (and wiped) on completion or abort.
struct TrafficKeys {
    secrets: HandshakeSecrets,
    send: RecordProtector,
    recv: RecordProtector,
}

impl TrafficKeys {
    fn derive(role: Role, suite: CipherSuite, dh_shared: &[u8], hello_hash: &[u8; 32]) -> Result<Self> {
        let secrets = HandshakeSecrets::derive(dh_shared, hello_hash)?;
        let client = RecordProtector::new(suite, secrets.client_traffic())?;
        let server = RecordProtector::new(suite, secrets.server_traffic())?;
        let (send, recv) = match role {
            Role::Initiator => (client, server),
            Role::Responder => (server, client),
        };
        Ok(Self {
            secrets,
            send,
            recv,
        })
    }

    /// Encode `message`, append it to the transcript and seal it into a frame.
    fn seal(&mut self, transcript: &mut Transcript, message: &HandshakeMessage) -> Result<Vec<u8>> {
        let plaintext = message.encode()?;
        transcript.append(&plaintext);
        let ciphertext = self.send.seal(&plaintext)?;
        Ok(Frame::Encrypted(ciphertext).encode())
    }

    /// Open an Encrypted frame. The caller appends the plaintext to the
    /// transcript once the message has been checked.
    fn open(&mut self, frame: Frame, expected: &'static str) -> Result<(HandshakeMessage, Vec<u8>)> {
        let ciphertext = match frame {
            Frame::Encrypted(ciphertext) => ciphertext,
            other => {
                return Err(StrandBindError::UnexpectedMessage {
                    expected,
                    got: other.label(),
                })
            }
        };
        let plaintext = self.recv.open(&ciphertext)?;
        let message = HandshakeMessage::decode(&plaintext)?;
        Ok((message, plaintext))
    }
}

fn fresh_nonce() -> [u8; 32] {
    let mut nonce = [0u8; 32];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

fn verify_context(signer: Role) -> &'static [u8] {
    match signer {
        Role::Initiator => CLIENT_VERIFY_CONTEXT,
        Role::Responder => SERVER_VERIFY_CONTEXT,
    }
}

fn signed_content(signer: Role, transcript_hash: &[u8; 32]) -> Vec<u8> {
    let mut content = verify_context(signer).to_vec();
    content.extend_from_slice(transcript_hash);
    content
}

/// CertificateVerify for the local party acting as `signer`.
fn sign_transcript(signer: Role, keypair: &IdentityKeyPair, transcript: &Transcript) -> HandshakeMessage {
    HandshakeMessage::CertificateVerify {
        signature: keypair.sign(&signed_content(signer, &transcript.hash())),
    }
}

fn verify_transcript_signature(
    signer: Role,
    public_key: &PublicKey,
    transcript: &Transcript,
    signature: &SignatureBytes,
) -> Result<()> {
    verify_signature(public_key, &signed_content(signer, &transcript.hash()), signature)
}

fn finished_mac(finished_key: &Secret, transcript: &Transcript) -> Result<HandshakeMessage> {
    Ok(HandshakeMessage::Finished {
        mac: hmac_sha256(finished_key.as_bytes(), &transcript.hash())?,
    })
}

fn verify_finished(
    finished_key: &Secret,
    transcript: &Transcript,
    mac: &[u8; 32],
) -> Result<()> {
    verify_hmac_sha256(finished_key.as_bytes(), &transcript.hash(), mac)
        .map_err(|_| StrandBindError::FinishedMismatch)
}

/// Credential the verifier should check for a Certificate payload.
fn offered(payload: &CertificatePayload) -> OfferedCredential<'_> {
    match payload {
        CertificatePayload::RawKey(key) => OfferedCredential::RawKey(key),
        CertificatePayload::RawKeyWithIdentity { public_key, .. } => OfferedCredential::RawKey(public_key),
        CertificatePayload::Certificate(blob) => OfferedCredential::Certificate(blob),
    }
}

/// An instance was asked to do something its phase does not allow.
fn out_of_phase(phase: HandshakePhase, to: &'static str) -> StrandBindError {
    StrandBindError::InvalidStateTransition {
        from: phase.label().into(),
        to: to.into(),
    }
}

fn unexpected(expected: &'static str, got: &HandshakeMessage) -> StrandBindError {
    StrandBindError::UnexpectedMessage {
        expected,
        got: got.label(),
    }
}
