use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use serde_json::{json, Value};

/// Per-proxy counters. Cheap to clone and share across serving tasks; one
/// instance per proxy so independent proxies in one process never mix up
/// their numbers.
#[derive(Clone, Debug, Default)]
pub struct ProxyMetrics {
    inner: Arc<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    submitted_txs: AtomicU64,
    committed_blocks: AtomicU64,
    commit_timeouts: AtomicU64,
}

impl ProxyMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_submitted(&self) {
        self.inner.submitted_txs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_committed(&self) {
        self.inner.committed_blocks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_commit_timeouts(&self) {
        self.inner.commit_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn submitted(&self) -> u64 {
        self.inner.submitted_txs.load(Ordering::Relaxed)
    }

    pub fn committed(&self) -> u64 {
        self.inner.committed_blocks.load(Ordering::Relaxed)
    }

    pub fn commit_timeouts(&self) -> u64 {
        self.inner.commit_timeouts.load(Ordering::Relaxed)
    }

    /// JSON snapshot. `abandoned_replies` is tracked by the exchange itself
    /// and merged in by the owning proxy.
    pub fn snapshot(&self, abandoned_replies: u64) -> Value {
        json!({
            "submitted_txs": self.submitted(),
            "committed_blocks": self.committed(),
            "commit_timeouts": self.commit_timeouts(),
            "abandoned_replies": abandoned_replies,
        })
    }
}
