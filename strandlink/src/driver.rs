//! Drivers that move one handshake instance's messages over a transport.
//!
//! Every receive is bounded by [`DriverConfig::receive_timeout`]. A timeout,
//! a closed transport or an oversized message aborts the instance; engine
//! errors have already aborted it. Either way the transport is closed, since
//! the protocol has no authenticated way to tell the peer why.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use strandbind::{Initiator, Progress, Responder, SessionRecord, StrandBindError};
use tokio::time::timeout;

use crate::config::DriverConfig;
use crate::error::{Result, StrandLinkError};
use crate::transport::Transport;

/// The part of a handshake instance the driver needs.
trait Instance: Send {
    const ROLE: &'static str;

    fn handle(&mut self, data: &[u8], now: u64) -> strandbind::Result<Progress>;
    fn abort(&mut self, reason: StrandBindError) -> StrandBindError;
}

impl Instance for Initiator {
    const ROLE: &'static str = "initiator";

    fn handle(&mut self, data: &[u8], now: u64) -> strandbind::Result<Progress> {
        Initiator::handle(self, data, now)
    }

    fn abort(&mut self, reason: StrandBindError) -> StrandBindError {
        Initiator::abort(self, reason)
    }
}

impl Instance for Responder {
    const ROLE: &'static str = "responder";

    fn handle(&mut self, data: &[u8], now: u64) -> strandbind::Result<Progress> {
        Responder::handle(self, data, now)
    }

    fn abort(&mut self, reason: StrandBindError) -> StrandBindError {
        Responder::abort(self, reason)
    }
}

/// Send the ClientHello and drive `initiator` until it completes or fails.
pub async fn run_initiator<T: Transport>(
    transport: &mut T,
    initiator: &mut Initiator,
    config: &DriverConfig,
) -> Result<SessionRecord> {
    let hello = match initiator.start() {
        Ok(hello) => hello,
        Err(e) => {
            transport.close().await;
            return Err(e.into());
        }
    };
    if let Err(e) = transport.send(Bytes::from(hello)).await {
        initiator.abort(e.abort_reason());
        transport.close().await;
        return Err(e);
    }
    drive(transport, initiator, config).await
}

/// Drive `responder` from the ClientHello until it completes or fails.
pub async fn run_responder<T: Transport>(
    transport: &mut T,
    responder: &mut Responder,
    config: &DriverConfig,
) -> Result<SessionRecord> {
    drive(transport, responder, config).await
}

async fn drive<T: Transport, I: Instance>(
    transport: &mut T,
    instance: &mut I,
    config: &DriverConfig,
) -> Result<SessionRecord> {
    match step_until_complete(transport, instance, config).await {
        Ok(session) => {
            tracing::info!(
                role = I::ROLE,
                peer = ?session.peer_identity().map(|id| id.as_str()),
                local = ?session.local_identity().map(|id| id.as_str()),
                model = ?session.trust_model().map(|m| m.label()),
                suite = session.cipher_suite().name(),
                "handshake complete"
            );
            Ok(session)
        }
        Err(e) => {
            if !matches!(e, StrandLinkError::Handshake(_)) {
                instance.abort(e.abort_reason());
            }
            transport.close().await;
            Err(e)
        }
    }
}

async fn step_until_complete<T: Transport, I: Instance>(
    transport: &mut T,
    instance: &mut I,
    config: &DriverConfig,
) -> Result<SessionRecord> {
    loop {
        let message = receive(transport, config).await?;
        let progress = instance.handle(&message, unix_now())?;
        for outgoing in progress.outgoing.iter() {
            transport.send(Bytes::copy_from_slice(outgoing)).await?;
        }
        if let Some(session) = progress.session() {
            return Ok(session.clone());
        }
    }
}

async fn receive<T: Transport>(transport: &mut T, config: &DriverConfig) -> Result<Bytes> {
    let message = match timeout(config.receive_timeout, transport.receive()).await {
        Ok(Some(message)) => message,
        Ok(None) => return Err(StrandLinkError::Closed),
        Err(_) => return Err(StrandLinkError::Timeout(config.receive_timeout)),
    };
    if message.len() > config.max_message_len {
        return Err(StrandLinkError::MessageTooLarge {
            size: message.len(),
            max: config.max_message_len,
        });
    }
    Ok(message)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
