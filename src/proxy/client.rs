//! Client-side adapter: originates one RPC call per TCP connection.
//!
//! No pooling or multiplexing: each call pays connection establishment, in
//! exchange for strictly bounded resource usage and no cross-call state.
//! Retry policy, if any, belongs to the caller.

use std::time::Duration;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::time;
use tokio_util::codec::Framed;

use crate::utils::errors::{ProxyError, Result};
use crate::wire::{tcp, FrameCodec, RpcRequest, RpcResponse};

#[derive(Debug, Clone)]
pub struct RpcClient {
    addr: String,
    timeout: Duration,
}

impl RpcClient {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self { addr: addr.into(), timeout }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Dial, issue exactly one call, await exactly one reply. Both the dial
    /// and the reply wait are bounded by the configured timeout. A populated
    /// error field in the reply surfaces as `ProxyError::Remote`; the caller
    /// cannot tell remote failures from transport ones, both are failures.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let stream = tcp::connect(&self.addr, self.timeout).await?;
        let mut framed = Framed::new(stream, FrameCodec::new());

        let request = RpcRequest { method: method.to_string(), params, id: 0 };
        let encoded = serde_json::to_vec(&request)
            .map_err(|e| ProxyError::Transport(format!("encode request: {}", e)))?;
        framed
            .send(Bytes::from(encoded))
            .await
            .map_err(|e| ProxyError::Transport(format!("send to {}: {}", self.addr, e)))?;

        let frame = time::timeout(self.timeout, framed.next())
            .await
            .map_err(|_| ProxyError::Timeout)?
            .ok_or_else(|| {
                ProxyError::Transport(format!("{} closed before replying", self.addr))
            })?
            .map_err(|e| ProxyError::Transport(format!("read from {}: {}", self.addr, e)))?;

        let response: RpcResponse = serde_json::from_slice(&frame)
            .map_err(|e| ProxyError::Transport(format!("decode reply: {}", e)))?;
        if let Some(message) = response.error {
            return Err(ProxyError::Remote(message));
        }
        response
            .result
            .ok_or_else(|| ProxyError::Transport("reply carried neither result nor error".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn call_to_unreachable_peer_fails_fast() {
        // nothing listens here
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let client = RpcClient::new(addr, Duration::from_millis(200));
        let err = client.call("Test.Echo", Value::Null).await.unwrap_err();
        match err {
            ProxyError::Transport(_) | ProxyError::Timeout => {}
            other => panic!("expected dial failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn silent_server_times_out_the_reply_wait() {
        // accepts but never replies
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            // hold the connection open without answering
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let client = RpcClient::new(addr, Duration::from_millis(100));
        let err = client.call("Test.Echo", Value::Null).await.unwrap_err();
        match err {
            ProxyError::Timeout => {}
            other => panic!("expected timeout, got {:?}", other),
        }
    }
}
