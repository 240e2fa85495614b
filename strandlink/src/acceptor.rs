//! Connection acceptor: one responder task per incoming transport.
//!
//! Tasks share the responder configuration through an `Arc`. Key pairs and
//! trust stores inside it are read-only or snapshot-read, so handshakes run
//! fully in parallel.

use std::future::Future;
use std::sync::Arc;

use strandbind::{Responder, ResponderConfig, SessionRecord};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};

use crate::config::DriverConfig;
use crate::driver::run_responder;
use crate::error::Result;
use crate::transport::Transport;

/// The result of one accepted connection.
#[derive(Debug)]
pub struct AcceptOutcome<T> {
    /// Sequence number of the connection, in accept order.
    pub connection: u64,
    /// The transport, returned so the caller can keep using it.
    pub transport: T,
    pub result: Result<SessionRecord>,
}

/// Accepts connections and runs a fresh [`Responder`] on each.
#[derive(Debug, Clone)]
pub struct Acceptor {
    config: Arc<ResponderConfig>,
    driver: DriverConfig,
}

impl Acceptor {
    pub fn new(config: impl Into<Arc<ResponderConfig>>, driver: DriverConfig) -> Self {
        Self {
            config: config.into(),
            driver,
        }
    }

    pub fn config(&self) -> &Arc<ResponderConfig> {
        &self.config
    }

    /// Accept from `incoming` until it closes, reporting each handshake on
    /// `outcomes`. Returns once every spawned handshake has finished.
    pub async fn run<T>(self, mut incoming: mpsc::Receiver<T>, outcomes: mpsc::Sender<AcceptOutcome<T>>)
    where
        T: Transport + 'static,
    {
        let mut tasks = JoinSet::new();
        self.accept(&mut incoming, &outcomes, &mut tasks).await;
        while let Some(joined) = tasks.join_next().await {
            reap(joined);
        }
    }

    /// The accept loop proper. Finished handshake tasks are reaped before
    /// each new connection is taken, so `tasks` only holds live handshakes.
    async fn accept<T>(
        &self,
        incoming: &mut mpsc::Receiver<T>,
        outcomes: &mpsc::Sender<AcceptOutcome<T>>,
        tasks: &mut JoinSet<()>,
    ) where
        T: Transport + 'static,
    {
        let mut next_connection = 0u64;
        loop {
            tokio::select! {
                biased;
                Some(joined) = tasks.join_next() => reap(joined),
                accepted = incoming.recv() => {
                    let Some(transport) = accepted else { break };
                    let connection = next_connection;
                    next_connection += 1;
                    tracing::debug!(connection, in_flight = tasks.len(), "accepted connection");
                    tasks.spawn(self.handshake(connection, transport, outcomes.clone()));
                }
            }
        }
    }

    fn handshake<T>(
        &self,
        connection: u64,
        mut transport: T,
        outcomes: mpsc::Sender<AcceptOutcome<T>>,
    ) -> impl Future<Output = ()> + Send + 'static
    where
        T: Transport + 'static,
    {
        let config = Arc::clone(&self.config);
        let driver = self.driver.clone();
        async move {
            let mut responder = Responder::new(config);
            let result = run_responder(&mut transport, &mut responder, &driver).await;
            if let Err(e) = &result {
                tracing::warn!(connection, kind = %e.kind(), error = %e, "handshake failed");
            }
            let outcome = AcceptOutcome {
                connection,
                transport,
                result,
            };
            if outcomes.send(outcome).await.is_err() {
                tracing::debug!(connection, "outcome receiver dropped");
            }
        }
    }
}

fn reap(joined: std::result::Result<(), JoinError>) {
    if let Err(e) = joined {
        tracing::warn!(error = %e, "handshake task failed");
    }
}
