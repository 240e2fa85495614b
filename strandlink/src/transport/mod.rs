//! Message transport used by the handshake drivers.

pub mod memory;

use std::future::Future;

use bytes::Bytes;

use crate::error::Result;

/// A reliable, ordered, message-oriented channel.
///
/// Each call to `send` delivers exactly one message to the peer's `receive`.
pub trait Transport: Send {
    /// Queue one message for the peer.
    fn send(&mut self, message: Bytes) -> impl Future<Output = Result<()>> + Send;

    /// Wait for the next message. `None` once the peer has closed.
    fn receive(&mut self) -> impl Future<Output = Option<Bytes>> + Send;

    /// Close this end. Idempotent.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}
