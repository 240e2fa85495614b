// Handshake phases and session status.

use crate::error::{Result, StrandBindError};

/// Which side of the handshake an instance plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Initiator,
    Responder,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Role::Initiator => "initiator",
            Role::Responder => "responder",
        }
    }
}

/// The current phase of one handshake instance.
///
/// Both roles move through the same sequence. A responder that requires
/// client authentication passes `PeerAuthVerified` and
/// `PeerSignatureVerified` for the client; without client authentication it
/// goes from `KeysDerived` straight to `Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandshakePhase {
    /// Nothing sent or received yet.
    Start,
    /// Initiator has sent its ClientHello.
    SentHello,
    /// Hellos exchanged, traffic secrets derived.
    KeysDerived,
    /// The peer's key binding has been accepted.
    PeerAuthVerified,
    /// The peer's transcript signature has been accepted.
    PeerSignatureVerified,
    /// Both Finished MACs exchanged; the session record exists.
    Complete,
    /// A failure ended the instance. Terminal.
    Aborted,
}

impl HandshakePhase {
    /// Human-readable label for the phase (used in error messages and logs).
    pub fn label(self) -> &'static str {
        match self {
            HandshakePhase::Start => "Start",
            HandshakePhase::SentHello => "SentHello",
            HandshakePhase::KeysDerived => "KeysDerived",
            HandshakePhase::PeerAuthVerified => "PeerAuthVerified",
            HandshakePhase::PeerSignatureVerified => "PeerSignatureVerified",
            HandshakePhase::Complete => "Complete",
            HandshakePhase::Aborted => "Aborted",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, HandshakePhase::Complete | HandshakePhase::Aborted)
    }
}

/// Confirmation status of a session. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum SessionStatus {
    #[default]
    Pending,
    Authenticated,
    Complete,
}

impl SessionStatus {
    pub fn label(self) -> &'static str {
        match self {
            SessionStatus::Pending => "Pending",
            SessionStatus::Authenticated => "Authenticated",
            SessionStatus::Complete => "Complete",
        }
    }

    /// Move to `next`, which must be strictly later than the current status.
    pub fn advance(&mut self, next: SessionStatus) -> Result<()> {
        if next <= *self {
            return Err(StrandBindError::InvalidStateTransition {
                from: self.label().into(),
                to: next.label().into(),
            });
        }
        *self = next;
        Ok(())
    }
}
