use std::time::Duration;

use strandbind::{FailureKind, StrandBindError};
use thiserror::Error;

/// All errors produced by the StrandLink driver.
#[derive(Debug, Error)]
pub enum StrandLinkError {
    #[error("handshake failed: {0}")]
    Handshake(#[from] StrandBindError),

    #[error("transport is closed")]
    Closed,

    #[error("no message received within {0:?}")]
    Timeout(Duration),

    #[error("message too large: {size} bytes exceeds maximum {max}")]
    MessageTooLarge { size: usize, max: usize },
}

impl StrandLinkError {
    /// Taxonomy kind of the failure, for audit logs.
    pub fn kind(&self) -> FailureKind {
        match self {
            StrandLinkError::Handshake(e) => e.kind(),
            StrandLinkError::Closed | StrandLinkError::Timeout(_) => FailureKind::TransportFailure,
            StrandLinkError::MessageTooLarge { .. } => FailureKind::SequenceError,
        }
    }

    /// The reason handed to the engine's `abort` for a failure it did not see.
    pub(crate) fn abort_reason(&self) -> StrandBindError {
        match self {
            StrandLinkError::Handshake(e) => StrandBindError::Transport(e.to_string()),
            StrandLinkError::Closed => StrandBindError::Transport("peer closed the transport".into()),
            StrandLinkError::Timeout(after) => {
                StrandBindError::Transport(format!("no message within {after:?}"))
            }
            StrandLinkError::MessageTooLarge { size, max } => {
                StrandBindError::Decode(format!("message of {size} bytes exceeds {max}"))
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, StrandLinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_failures_classify() {
        assert_eq!(StrandLinkError::Closed.kind(), FailureKind::TransportFailure);
        assert_eq!(
            StrandLinkError::Timeout(Duration::from_secs(1)).kind(),
            FailureKind::TransportFailure
        );
        assert_eq!(
            StrandLinkError::MessageTooLarge { size: 10, max: 1 }.kind(),
            FailureKind::SequenceError
        );
    }

    #[test]
    fn engine_errors_keep_their_kind() {
        let err: StrandLinkError = StrandBindError::FinishedMismatch.into();
        assert_eq!(err.kind(), FailureKind::SignatureFailure);
    }

    #[test]
    fn abort_reason_for_timeout_is_transport_failure() {
        let reason = StrandLinkError::Timeout(Duration::from_millis(5)).abort_reason();
        assert_eq!(reason.kind(), FailureKind::TransportFailure);
    }
}
