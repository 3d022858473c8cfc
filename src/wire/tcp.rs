use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::time;

use crate::utils::errors::{ProxyError, Result};

/// Start listening TCP on address and return the listener.
/// Consumer should `accept().await` and hand streams to a serving task.
pub async fn bind(addr: &str) -> Result<TcpListener> {
    let l = TcpListener::bind(addr)
        .await
        .map_err(|e| ProxyError::Startup(format!("bind {}: {}", addr, e)))?;
    Ok(l)
}

/// Dial with a bounded connection timeout.
pub async fn connect(addr: &str, timeout: Duration) -> Result<TcpStream> {
    let s = time::timeout(timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| ProxyError::Timeout)?
        .map_err(|e| ProxyError::Transport(format!("dial {}: {}", addr, e)))?;
    Ok(s)
}
