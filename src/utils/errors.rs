use thiserror::Error;

use crate::rendezvous::RendezvousError;

/// Unified error type for the proxy pair.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Listener failed to come up. Fatal to the owning proxy's construction.
    #[error("startup error: {0}")]
    Startup(String),

    /// Dial/accept/encode/decode failure, local to one connection or call.
    #[error("transport error: {0}")]
    Transport(String),

    /// The bounded wait elapsed before a reply arrived.
    #[error("command timed out")]
    Timeout,

    /// Error reported by the remote side of a call.
    #[error("remote error: {0}")]
    Remote(String),

    /// The remote side answered but refused the request (ack false).
    #[error("rejected: {0}")]
    Rejected(String),
}

impl From<RendezvousError> for ProxyError {
    fn from(e: RendezvousError) -> Self {
        match e {
            RendezvousError::Timeout => ProxyError::Timeout,
            RendezvousError::Closed => ProxyError::Transport("exchange closed".into()),
        }
    }
}

/// Convenience alias
pub type Result<T> = std::result::Result<T, ProxyError>;
