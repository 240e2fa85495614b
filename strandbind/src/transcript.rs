// Transcript accumulator: running SHA-256 over the handshake messages in
// protocol order.

use sha2::{Digest, Sha256};

use crate::crypto::hash::HASH_LEN;

/// Append-only transcript of one handshake instance.
///
/// Each message is absorbed as `u32_be(len) || message`, so the digest of a
/// prefix is unambiguous. `hash()` never consumes or disturbs the running
/// state: a snapshot taken after message K stays valid while K+1, K+2 are
/// appended.
#[derive(Debug, Clone)]
pub struct Transcript {
    hasher: Sha256,
    messages: usize,
}

impl Transcript {
    /// Creates a new, empty transcript.
    pub fn new() -> Self {
        Self {
            hasher: Sha256::new(),
            messages: 0,
        }
    }

    /// Absorb one handshake message.
    pub fn append(&mut self, message: &[u8]) {
        self.hasher.update((message.len() as u32).to_be_bytes());
        self.hasher.update(message);
        self.messages += 1;
    }

    /// Digest over every message appended so far.
    pub fn hash(&self) -> [u8; HASH_LEN] {
        self.hasher.clone().finalize().into()
    }

    /// Number of messages appended so far.
    pub fn len(&self) -> usize {
        self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages == 0
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}
