// StrandBind L4 - CA-less Identity Binding Handshake
//
// Crate root: module declarations and public re-exports.

pub mod cert;
pub(crate) mod codec;
pub mod crypto;
pub mod error;
pub mod handshake;
pub mod identity;
pub mod key_schedule;
pub mod registry;
pub mod session;
pub mod transcript;
pub mod trust;

// Re-export key types at crate root for convenience.
pub use cert::Certificate;
pub use crypto::aead::CipherSuite;
pub use crypto::keys::{IdentityKeyPair, PublicKey};
pub use error::{FailureKind, Result, StrandBindError};
pub use handshake::{
    HandshakeEvent, HandshakePhase, Initiator, InitiatorConfig, LocalCredential, LocalIdentity,
    Progress, Responder, ResponderConfig, ServerNamePolicy, SessionStatus,
};
pub use identity::Identity;
pub use registry::{InMemoryRegistry, Registry};
pub use session::SessionRecord;
pub use transcript::Transcript;
pub use trust::{BindingVerifier, TrustModel, TrustTable, VerifiedPeer};
