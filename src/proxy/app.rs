//! Engine-side proxy pair: SubmitTx server + CommitBlock client.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::info;

use crate::proxy::client::RpcClient;
use crate::proxy::server::{RpcServer, RpcService};
use crate::proxy::{METHOD_COMMIT_BLOCK, METHOD_SUBMIT_TX};
use crate::types::{Block, StateHash};
use crate::utils::errors::{ProxyError, Result};
use crate::utils::metrics::ProxyMetrics;

/// Bound on transactions parked between the RPC surface and the engine's
/// consumer. Submission blocks (briefly) rather than dropping when full.
pub const SUBMIT_QUEUE_CAP: usize = 1024;

struct SubmitService {
    submit_tx: mpsc::Sender<Vec<u8>>,
    metrics: ProxyMetrics,
}

#[async_trait]
impl RpcService for SubmitService {
    async fn dispatch(&self, method: &str, params: Value) -> std::result::Result<Value, String> {
        match method {
            METHOD_SUBMIT_TX => {
                let tx: Vec<u8> = serde_json::from_value(params)
                    .map_err(|e| format!("invalid transaction payload: {}", e))?;
                // The ack is generated here, synchronously: true means
                // "accepted into the queue", never "ordered by the engine".
                match self.submit_tx.send(tx).await {
                    Ok(()) => {
                        self.metrics.inc_submitted();
                        Ok(Value::Bool(true))
                    }
                    Err(_) => Ok(Value::Bool(false)),
                }
            }
            other => Err(format!("unknown method: {}", other)),
        }
    }
}

/// Runs inside the engine process. Construction also hands back the submit
/// queue receiver; the engine's consumer owns it and drains it at its own
/// pace.
pub struct SocketAppProxy {
    client: RpcClient,
    local_addr: SocketAddr,
    metrics: ProxyMetrics,
    shutdown_tx: watch::Sender<bool>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl SocketAppProxy {
    pub async fn new(
        app_addr: &str,
        bind_addr: &str,
        timeout: Duration,
    ) -> Result<(Self, mpsc::Receiver<Vec<u8>>)> {
        let server = RpcServer::bind(bind_addr).await?;
        let local_addr = server.local_addr();

        let (submit_tx, submit_rx) = mpsc::channel(SUBMIT_QUEUE_CAP);
        let metrics = ProxyMetrics::new();
        let service = Arc::new(SubmitService { submit_tx, metrics: metrics.clone() });

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = server.serve(service, shutdown_rx);
        info!("app proxy listening on {}, delivering commits to {}", local_addr, app_addr);

        let proxy = Self {
            client: RpcClient::new(app_addr, timeout),
            local_addr,
            metrics,
            shutdown_tx,
            listener: Mutex::new(Some(handle)),
        };
        Ok((proxy, submit_rx))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn metrics(&self) -> &ProxyMetrics {
        &self.metrics
    }

    /// Deliver a finalized block to the application and block until its
    /// consumer answers with a state digest (or the remote side times out).
    pub async fn commit_block(&self, block: Block) -> Result<Vec<u8>> {
        let params = serde_json::to_value(&block)
            .map_err(|e| ProxyError::Transport(format!("encode block: {}", e)))?;
        let value = self.client.call(METHOD_COMMIT_BLOCK, params).await?;
        let digest: StateHash = serde_json::from_value(value)
            .map_err(|e| ProxyError::Transport(format!("decode state hash: {}", e)))?;
        self.metrics.inc_committed();
        Ok(digest.hash)
    }

    /// Stop accepting new connections. In-flight connections finish on their
    /// own serving tasks.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        let handle = self.listener.lock().take();
        if let Some(h) = handle {
            let _ = h.await;
        }
    }
}
