//! Reference application client: drains the commit queue, folds each block's
//! transactions into an in-memory log, and answers with a running SHA-256
//! state digest. Used by the CLI demo and by end-to-end tests as a stand-in
//! for a real state machine.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::proxy::{CommitResponse, SocketEngineProxy};
use crate::service::EngineQuery;
use crate::types::{hash_bytes, Block};
use crate::utils::errors::Result;

#[derive(Default)]
struct AppState {
    committed_txs: Vec<Vec<u8>>,
    blocks: Vec<Block>,
    state_hash: Vec<u8>,
}

impl AppState {
    /// Fold a block into the state and return the new digest.
    fn commit(&mut self, block: &Block) -> Vec<u8> {
        let mut material = self.state_hash.clone();
        for tx in &block.transactions {
            self.committed_txs.push(tx.clone());
            material.extend_from_slice(tx);
        }
        self.blocks.push(block.clone());
        self.state_hash = hash_bytes(&material);
        self.state_hash.clone()
    }
}

pub struct DummyClient {
    proxy: SocketEngineProxy,
    state: Arc<Mutex<AppState>>,
    consumer: Mutex<Option<JoinHandle<()>>>,
}

impl DummyClient {
    pub async fn new(engine_addr: &str, bind_addr: &str, timeout: Duration) -> Result<Self> {
        let (proxy, mut commit_rx) = SocketEngineProxy::new(engine_addr, bind_addr, timeout).await?;
        let state = Arc::new(Mutex::new(AppState::default()));

        let consumer_state = state.clone();
        let consumer = tokio::spawn(async move {
            while let Some(commit) = commit_rx.recv().await {
                let (block, reply) = commit.into_block_and_sink();
                let index = block.index;
                info!("committing block {} with {} txs", index, block.transactions.len());
                let digest = consumer_state.lock().commit(&block);
                let outcome = reply.respond(CommitResponse { state_hash: digest, error: None });
                if outcome.is_err() {
                    warn!("reply for block {} abandoned, caller timed out", index);
                }
            }
        });

        Ok(Self { proxy, state, consumer: Mutex::new(Some(consumer)) })
    }

    /// Address of the commit server (where the engine delivers blocks).
    pub fn local_addr(&self) -> SocketAddr {
        self.proxy.local_addr()
    }

    pub async fn submit_tx(&self, tx: Vec<u8>) -> Result<()> {
        self.proxy.submit_tx(tx).await
    }

    pub fn state_hash(&self) -> Vec<u8> {
        self.state.lock().state_hash.clone()
    }

    pub fn committed_txs(&self) -> usize {
        self.state.lock().committed_txs.len()
    }

    pub async fn shutdown(&self) {
        self.proxy.shutdown().await;
        let handle = self.consumer.lock().take();
        if let Some(h) = handle {
            h.abort();
        }
    }
}

impl EngineQuery for DummyClient {
    fn stats(&self) -> Value {
        let state = self.state.lock();
        json!({
            "committed_txs": state.committed_txs.len(),
            "committed_blocks": state.blocks.len(),
            "state_hash": hex::encode(&state.state_hash),
            "proxy": self.proxy.metrics().snapshot(self.proxy.abandoned_replies()),
        })
    }

    fn participants(&self) -> std::result::Result<Value, String> {
        Err("participants are not tracked by the application".into())
    }

    fn event(&self, id: &str) -> std::result::Result<Value, String> {
        Err(format!("events are not tracked by the application: {}", id))
    }

    fn block(&self, index: u64) -> std::result::Result<Value, String> {
        let state = self.state.lock();
        state
            .blocks
            .iter()
            .find(|b| b.index == index)
            .map(|b| serde_json::to_value(b).expect("block serializes"))
            .ok_or_else(|| format!("no such block: {}", index))
    }

    fn round(&self, index: u64) -> std::result::Result<Value, String> {
        let state = self.state.lock();
        let blocks: Vec<&Block> =
            state.blocks.iter().filter(|b| b.round_received == index).collect();
        if blocks.is_empty() {
            return Err(format!("no blocks received in round {}", index));
        }
        serde_json::to_value(&blocks).map_err(|e| e.to_string())
    }

    fn last_round(&self) -> std::result::Result<Value, String> {
        let state = self.state.lock();
        state
            .blocks
            .last()
            .map(|b| json!(b.round_received))
            .ok_or_else(|| "no blocks committed yet".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::SocketAppProxy;

    const LONG: Duration = Duration::from_secs(1);

    #[tokio::test]
    async fn commits_blocks_and_chains_the_digest() {
        // engine side first so the dummy has somewhere to submit
        let (app_proxy, _submit_rx) =
            SocketAppProxy::new("127.0.0.1:1", "127.0.0.1:0", LONG).await.unwrap();
        let client = DummyClient::new(
            &app_proxy.local_addr().to_string(),
            "127.0.0.1:0",
            LONG,
        )
        .await
        .unwrap();

        // re-point the engine's commit client at the dummy's server
        let (app_proxy, _submit_rx) =
            SocketAppProxy::new(&client.local_addr().to_string(), "127.0.0.1:0", LONG)
                .await
                .unwrap();

        let d1 = app_proxy
            .commit_block(Block::new(0, 1, vec![b"tx-a".to_vec()]))
            .await
            .unwrap();
        assert_eq!(d1, hash_bytes(b"tx-a"));

        let mut material = d1.clone();
        material.extend_from_slice(b"tx-b");
        let d2 = app_proxy
            .commit_block(Block::new(1, 1, vec![b"tx-b".to_vec()]))
            .await
            .unwrap();
        assert_eq!(d2, hash_bytes(&material));

        assert_eq!(client.committed_txs(), 2);
        assert_eq!(client.state_hash(), d2);
        assert_eq!(client.last_round().unwrap(), serde_json::json!(1));
    }

    #[tokio::test]
    async fn submit_flows_through_to_engine_queue() {
        let (app_proxy, mut submit_rx) =
            SocketAppProxy::new("127.0.0.1:1", "127.0.0.1:0", LONG).await.unwrap();
        let client = DummyClient::new(
            &app_proxy.local_addr().to_string(),
            "127.0.0.1:0",
            LONG,
        )
        .await
        .unwrap();

        client.submit_tx(b"the test transaction".to_vec()).await.unwrap();
        let got = submit_rx.recv().await.unwrap();
        assert_eq!(got, b"the test transaction".to_vec());
    }
}
