//! In-process transport over a pair of bounded tokio channels.

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::{Result, StrandLinkError};
use crate::transport::Transport;

/// One end of an in-memory message pipe.
#[derive(Debug)]
pub struct MemoryTransport {
    tx: Option<mpsc::Sender<Bytes>>,
    rx: mpsc::Receiver<Bytes>,
}

impl MemoryTransport {
    /// Two connected ends, each buffering up to `capacity` messages.
    pub fn pair(capacity: usize) -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::channel(capacity);
        let (b_tx, a_rx) = mpsc::channel(capacity);
        (
            Self {
                tx: Some(a_tx),
                rx: a_rx,
            },
            Self {
                tx: Some(b_tx),
                rx: b_rx,
            },
        )
    }

    pub fn is_closed(&self) -> bool {
        self.tx.as_ref().map_or(true, |tx| tx.is_closed())
    }
}

impl Transport for MemoryTransport {
    async fn send(&mut self, message: Bytes) -> Result<()> {
        let tx = self.tx.as_ref().ok_or(StrandLinkError::Closed)?;
        tx.send(message).await.map_err(|_| StrandLinkError::Closed)
    }

    async fn receive(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }

    async fn close(&mut self) {
        self.tx = None;
        self.rx.close();
    }
}
