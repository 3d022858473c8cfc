//! Server-side adapter: accepts RPC connections, decodes calls, dispatches
//! them to the direction-specific service, encodes replies.

use std::net::SocketAddr;
use std::sync::Arc;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use crate::utils::errors::{ProxyError, Result};
use crate::wire::{tcp, FrameCodec, RpcRequest, RpcResponse};

/// Direction-specific method table. The error string becomes the `error`
/// field of the reply; the caller sees it as a remote failure.
#[async_trait]
pub trait RpcService: Send + Sync + 'static {
    async fn dispatch(&self, method: &str, params: Value) -> std::result::Result<Value, String>;
}

#[derive(Debug)]
pub struct RpcServer {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl RpcServer {
    /// Bind the listener. A bind failure is fatal to the owning proxy's
    /// construction; there is no degraded mode.
    pub async fn bind(addr: &str) -> Result<Self> {
        let listener = tcp::bind(addr).await?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| ProxyError::Startup(e.to_string()))?;
        Ok(Self { listener, local_addr })
    }

    /// Actual bound address (useful when binding port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Spawn the accept loop. Each accepted connection gets its own serving
    /// task; connections share nothing beyond `service`.
    pub fn serve<S: RpcService>(
        self,
        service: Arc<S>,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let listener = self.listener;
        let local_addr = self.local_addr;
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    changed = shutdown.changed() => {
                        // a dropped sender means the owning proxy is gone
                        if changed.is_err() || *shutdown.borrow() {
                            info!("rpc listener on {} shutting down", local_addr);
                            return;
                        }
                    }
                    accepted = listener.accept() => {
                        match accepted {
                            Ok((stream, peer)) => {
                                let svc = service.clone();
                                tokio::spawn(async move {
                                    serve_connection(stream, peer, svc).await;
                                });
                            }
                            Err(e) => {
                                warn!("accept error on {}: {:?}", local_addr, e);
                                return;
                            }
                        }
                    }
                }
            }
        })
    }
}

/// One loop per connection: calls are served in arrival order. Any decode,
/// encode or IO error closes this connection only.
async fn serve_connection<S: RpcService>(stream: TcpStream, peer: SocketAddr, service: Arc<S>) {
    let mut framed = Framed::new(stream, FrameCodec::new());

    while let Some(frame) = framed.next().await {
        let frame = match frame {
            Ok(f) => f,
            Err(e) => {
                warn!("read error from {}: {:?}", peer, e);
                return;
            }
        };
        let request: RpcRequest = match serde_json::from_slice(&frame) {
            Ok(r) => r,
            Err(e) => {
                warn!("undecodable request from {}: {:?}", peer, e);
                return;
            }
        };
        debug!("serving {} for {}", request.method, peer);

        let response = match service.dispatch(&request.method, request.params).await {
            Ok(value) => RpcResponse::result(request.id, value),
            Err(msg) => RpcResponse::error(request.id, msg),
        };
        let encoded = match serde_json::to_vec(&response) {
            Ok(b) => b,
            Err(e) => {
                warn!("encode error replying to {}: {:?}", peer, e);
                return;
            }
        };
        if let Err(e) = framed.send(Bytes::from(encoded)).await {
            warn!("write error to {}: {:?}", peer, e);
            return;
        }
    }
}
