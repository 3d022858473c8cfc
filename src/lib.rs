//! LedgerLink: a socket proxy pair bridging an application process and a
//! consensus engine process over TCP with length-delimited JSON-RPC framing.
//!
//! - app -> engine: transaction submission, re-exposed in the engine process
//!   as a queue of raw payloads.
//! - engine -> app: finalized block delivery, blocking the RPC call until the
//!   application's consumer answers with a state digest (or a timeout fires).
//!
//! Both directions share one pattern: call in, channel handoff, bounded wait
//! for the response, reply out. See `rendezvous` for the handoff primitive and
//! `proxy` for the two socket pairs built on top of it.

pub mod cli;
pub mod config;
pub mod dummy;
pub mod proxy;
pub mod rendezvous;
pub mod service;
pub mod types;
pub mod utils;
pub mod wire;

pub use proxy::{SocketAppProxy, SocketEngineProxy};
pub use rendezvous::{Envelope, Exchange, ReplySink};
pub use types::Block;
pub use utils::errors::{ProxyError, Result};
