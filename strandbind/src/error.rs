// StrandBind error types

use std::fmt;

use thiserror::Error;

/// Coarse classification of a failure.
///
/// The first five kinds are the handshake-terminal failures a caller logs or
/// audits. `Configuration` and `Crypto` cover local misuse and primitive
/// failures that are not attributable to the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Offered key/certificate does not match the attested or configured binding.
    BindingFailure,
    /// A signature, MAC or AEAD tag failed to verify.
    SignatureFailure,
    /// A message arrived that does not match the expected next state, or did not parse.
    SequenceError,
    /// The responder does not own the requested identity.
    IdentityRejected,
    /// The transport closed or timed out while waiting for a message.
    TransportFailure,
    /// Local configuration or API misuse.
    Configuration,
    /// A primitive failed for reasons unrelated to the peer.
    Crypto,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::BindingFailure => "binding failure",
            FailureKind::SignatureFailure => "signature failure",
            FailureKind::SequenceError => "sequence error",
            FailureKind::IdentityRejected => "identity rejected",
            FailureKind::TransportFailure => "transport failure",
            FailureKind::Configuration => "configuration error",
            FailureKind::Crypto => "crypto error",
        };
        f.write_str(s)
    }
}

/// Top-level error type for the StrandBind crate.
#[derive(Debug, Error)]
pub enum StrandBindError {
    // ── Crypto errors ───────────────────────────────────────────────────
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    #[error("signature verification failed")]
    SignatureVerification,

    #[error("AEAD encryption failed: {0}")]
    Encryption(String),

    #[error("AEAD decryption failed: {0}")]
    Decryption(String),

    #[error("peer DH value is a low-order point")]
    LowOrderPoint,

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    // ── Codec errors ────────────────────────────────────────────────────
    #[error("malformed message: {0}")]
    Decode(String),

    // ── Certificate errors ──────────────────────────────────────────────
    #[error("certificate build error: {0}")]
    CertificateBuild(String),

    #[error("certificate deserialization error: {0}")]
    CertificateDeserialization(String),

    #[error("certificate expired: not_after={not_after}, now={now}")]
    CertificateExpired { not_after: u64, now: u64 },

    #[error("certificate not yet valid: not_before={not_before}, now={now}")]
    CertificateNotYetValid { not_before: u64, now: u64 },

    #[error("certificate version unsupported: {0}")]
    CertificateVersionUnsupported(u8),

    #[error("certificate is not self-signed")]
    CertificateNotSelfSigned,

    // ── Binding errors ──────────────────────────────────────────────────
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("no binding attestation published for {0}")]
    MissingAttestation(String),

    #[error("registry signature on attestation for {0} is invalid")]
    AttestationSignature(String),

    #[error("binding check failed for {identity}: {reason}")]
    Binding { identity: String, reason: String },

    // ── Registry errors ─────────────────────────────────────────────────
    #[error("identity {0} is already enrolled")]
    AlreadyEnrolled(String),

    #[error("identity {0} is not enrolled")]
    NotEnrolled(String),

    #[error("update for {0} is not authenticated by its credential")]
    UpdateRejected(String),

    // ── Handshake errors ────────────────────────────────────────────────
    #[error("unexpected message: expected {expected}, got {got}")]
    UnexpectedMessage {
        expected: &'static str,
        got: &'static str,
    },

    #[error("invalid handshake state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("hello carries the wrong role marker")]
    ReflectedHello,

    #[error("finished MAC mismatch")]
    FinishedMismatch,

    #[error("requested identity rejected: {0}")]
    IdentityRejected(String),

    #[error("handshake instance already aborted")]
    AlreadyAborted,

    #[error("transport failure: {0}")]
    Transport(String),

    // ── Configuration errors ────────────────────────────────────────────
    #[error("configuration error: {0}")]
    Config(String),

    #[error("trust table configuration error: {0}")]
    TrustTableConfig(String),
}

impl StrandBindError {
    /// Classify this error into one of the audit kinds.
    pub fn kind(&self) -> FailureKind {
        use StrandBindError::*;
        match self {
            MissingAttestation(_)
            | Binding { .. }
            | CertificateDeserialization(_)
            | CertificateExpired { .. }
            | CertificateNotYetValid { .. }
            | CertificateVersionUnsupported(_)
            | CertificateNotSelfSigned
            | InvalidKey(_) => FailureKind::BindingFailure,

            SignatureVerification
            | Decryption(_)
            | AttestationSignature(_)
            | FinishedMismatch
            | UpdateRejected(_) => FailureKind::SignatureFailure,

            Decode(_)
            | UnexpectedMessage { .. }
            | InvalidStateTransition { .. }
            | ReflectedHello
            | LowOrderPoint
            | AlreadyAborted => FailureKind::SequenceError,

            IdentityRejected(_) => FailureKind::IdentityRejected,

            Transport(_) => FailureKind::TransportFailure,

            InvalidIdentity(_)
            | CertificateBuild(_)
            | AlreadyEnrolled(_)
            | NotEnrolled(_)
            | Config(_)
            | TrustTableConfig(_) => FailureKind::Configuration,

            Encryption(_) | KeyDerivation(_) => FailureKind::Crypto,
        }
    }

    pub(crate) fn binding(identity: impl fmt::Display, reason: impl Into<String>) -> Self {
        StrandBindError::Binding {
            identity: identity.to_string(),
            reason: reason.into(),
        }
    }
}

/// Crate-level result alias.
pub type Result<T> = std::result::Result<T, StrandBindError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_kinds() {
        assert_eq!(
            StrandBindError::binding("a.example", "hash mismatch").kind(),
            FailureKind::BindingFailure
        );
        assert_eq!(
            StrandBindError::FinishedMismatch.kind(),
            FailureKind::SignatureFailure
        );
        assert_eq!(
            StrandBindError::UnexpectedMessage {
                expected: "Certificate",
                got: "Finished"
            }
            .kind(),
            FailureKind::SequenceError
        );
        assert_eq!(StrandBindError::LowOrderPoint.kind(), FailureKind::SequenceError);
        assert_eq!(
            StrandBindError::IdentityRejected("x.example".into()).kind(),
            FailureKind::IdentityRejected
        );
        assert_eq!(
            StrandBindError::Transport("closed".into()).kind(),
            FailureKind::TransportFailure
        );
    }

    #[test]
    fn binding_message_names_identity() {
        let err = StrandBindError::binding("alice.example", "key not attested");
        assert_eq!(
            err.to_string(),
            "binding check failed for alice.example: key not attested"
        );
    }
}
