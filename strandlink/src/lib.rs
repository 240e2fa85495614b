//! StrandLink -- async driver for StrandBind handshakes.
//!
//! The `strandbind` state machines never touch I/O. This crate moves their
//! messages over a [`Transport`]:
//! - [`run_initiator`] / [`run_responder`] drive one instance to completion,
//!   bounding every receive with a timeout
//! - [`Acceptor`] spawns one responder task per incoming connection
//! - [`MemoryTransport`] is an in-process, reliable, ordered message channel

pub mod acceptor;
pub mod config;
pub mod driver;
pub mod error;
pub mod transport;

// Re-export key public types at crate root.
pub use acceptor::{AcceptOutcome, Acceptor};
pub use config::DriverConfig;
pub use driver::{run_initiator, run_responder};
pub use error::{Result, StrandLinkError};
pub use transport::memory::MemoryTransport;
pub use transport::Transport;
