//! Application-side proxy pair: CommitBlock server + SubmitTx client.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::proxy::client::RpcClient;
use crate::proxy::server::{RpcServer, RpcService};
use crate::proxy::{Commit, CommitResponse, METHOD_COMMIT_BLOCK, METHOD_SUBMIT_TX};
use crate::rendezvous::{Exchange, RendezvousError};
use crate::types::{Block, StateHash};
use crate::utils::errors::{ProxyError, Result};
use crate::utils::metrics::ProxyMetrics;

struct CommitService {
    exchange: Exchange<Block, CommitResponse>,
    timeout: Duration,
    metrics: ProxyMetrics,
}

#[async_trait]
impl RpcService for CommitService {
    async fn dispatch(&self, method: &str, params: Value) -> std::result::Result<Value, String> {
        match method {
            METHOD_COMMIT_BLOCK => {
                let block: Block = serde_json::from_value(params)
                    .map_err(|e| format!("invalid block: {}", e))?;
                let index = block.index;

                let outcome = self.exchange.handoff(block, self.timeout).await;
                let result: std::result::Result<Vec<u8>, String> = match outcome {
                    Ok(CommitResponse { state_hash, error: None }) => Ok(state_hash),
                    Ok(CommitResponse { error: Some(e), .. }) => Err(e),
                    Err(RendezvousError::Timeout) => {
                        self.metrics.inc_commit_timeouts();
                        Err(RendezvousError::Timeout.to_string())
                    }
                    Err(RendezvousError::Closed) => Err("commit queue closed".to_string()),
                };

                // one diagnostic record per commit call: index, digest, error
                match &result {
                    Ok(hash) => {
                        debug!("CommitBlock block={} state_hash={}", index, hex::encode(hash))
                    }
                    Err(e) => debug!("CommitBlock block={} err={}", index, e),
                }

                let hash = result?;
                self.metrics.inc_committed();
                serde_json::to_value(StateHash { hash })
                    .map_err(|e| format!("encode state hash: {}", e))
            }
            other => Err(format!("unknown method: {}", other)),
        }
    }
}

/// Runs inside the application process. Construction also hands back the
/// commit queue receiver; the application's consumer owns it and must answer
/// each `Commit` exactly once via its reply sink.
pub struct SocketEngineProxy {
    client: RpcClient,
    local_addr: SocketAddr,
    exchange: Exchange<Block, CommitResponse>,
    metrics: ProxyMetrics,
    shutdown_tx: watch::Sender<bool>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl SocketEngineProxy {
    pub async fn new(
        engine_addr: &str,
        bind_addr: &str,
        timeout: Duration,
    ) -> Result<(Self, mpsc::Receiver<Commit>)> {
        let server = RpcServer::bind(bind_addr).await?;
        let local_addr = server.local_addr();

        let (exchange, commit_rx) = Exchange::new();
        let metrics = ProxyMetrics::new();
        let service = Arc::new(CommitService {
            exchange: exchange.clone(),
            timeout,
            metrics: metrics.clone(),
        });

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = server.serve(service, shutdown_rx);
        info!("engine proxy listening on {}, submitting txs to {}", local_addr, engine_addr);

        let proxy = Self {
            client: RpcClient::new(engine_addr, timeout),
            local_addr,
            exchange,
            metrics,
            shutdown_tx,
            listener: Mutex::new(Some(handle)),
        };
        Ok((proxy, commit_rx))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn metrics(&self) -> &ProxyMetrics {
        &self.metrics
    }

    /// Commit replies that arrived after their caller had timed out.
    pub fn abandoned_replies(&self) -> u64 {
        self.exchange.abandoned_replies()
    }

    /// Submit a transaction to the engine. A `false` ack from the engine is
    /// an explicit failure; it only ever means "accepted into the engine's
    /// queue" when true, not "ordered".
    pub async fn submit_tx(&self, tx: Vec<u8>) -> Result<()> {
        let params = serde_json::to_value(&tx)
            .map_err(|e| ProxyError::Transport(format!("encode transaction: {}", e)))?;
        let value = self.client.call(METHOD_SUBMIT_TX, params).await?;
        let ack = value
            .as_bool()
            .ok_or_else(|| ProxyError::Transport("non-boolean submit ack".into()))?;
        if !ack {
            return Err(ProxyError::Rejected(
                "failed to deliver transaction to engine".into(),
            ));
        }
        Ok(())
    }

    /// Stop accepting new connections. In-flight commits finish or time out
    /// on their own serving tasks.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        let handle = self.listener.lock().take();
        if let Some(h) = handle {
            let _ = h.await;
        }
    }
}
