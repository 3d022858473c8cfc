//! Rendezvous: converts an inbound network call into a blocking in-process
//! exchange with a single consumer, bounded by a timeout.
//!
//! An `Exchange` is shared by the RPC serving tasks (producers); exactly one
//! external consumer drains the paired receiver at its own pace. Each
//! `handoff` gets a fresh single-use `ReplySink`, so concurrent callers never
//! see each other's responses. Order across concurrent producers is whatever
//! order their sends land on the channel, i.e. non-deterministic.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RendezvousError {
    /// No reply arrived within the bound. A late reply is dropped.
    #[error("command timed out")]
    Timeout,
    /// Consumer side is gone (receiver or reply channel dropped).
    #[error("exchange closed")]
    Closed,
}

/// Single-use reply channel handed to the consumer along with the payload.
///
/// `respond` consumes the sink, so a second send is impossible to write. If
/// the caller already timed out the response is handed back to the consumer
/// and the shared abandoned-replies counter is bumped.
#[derive(Debug)]
pub struct ReplySink<R> {
    tx: oneshot::Sender<R>,
    abandoned: Arc<AtomicU64>,
}

impl<R> ReplySink<R> {
    pub fn respond(self, response: R) -> std::result::Result<(), R> {
        match self.tx.send(response) {
            Ok(()) => Ok(()),
            Err(response) => {
                self.abandoned.fetch_add(1, Ordering::Relaxed);
                Err(response)
            }
        }
    }
}

/// Payload plus its reply sink, as seen by the consumer.
#[derive(Debug)]
pub struct Envelope<T, R> {
    pub payload: T,
    pub reply: ReplySink<R>,
}

impl<T, R> Envelope<T, R> {
    pub fn into_parts(self) -> (T, ReplySink<R>) {
        (self.payload, self.reply)
    }
}

/// Producer handle: cloned into each serving task.
pub struct Exchange<T, R> {
    tx: mpsc::Sender<Envelope<T, R>>,
    abandoned: Arc<AtomicU64>,
}

impl<T, R> Clone for Exchange<T, R> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone(), abandoned: self.abandoned.clone() }
    }
}

impl<T: Send, R: Send> Exchange<T, R> {
    /// Create the exchange and the consumer-side receiver. Capacity 1 keeps
    /// the handoff a rendezvous rather than a queue: a producer's send only
    /// completes once the consumer is actually keeping up.
    pub fn new() -> (Self, mpsc::Receiver<Envelope<T, R>>) {
        let (tx, rx) = mpsc::channel(1);
        let exchange = Self { tx, abandoned: Arc::new(AtomicU64::new(0)) };
        (exchange, rx)
    }

    /// Publish `payload` and wait for the consumer's reply, or fail after
    /// `timeout`. The bound covers the whole exchange: publish included, so a
    /// caller is never stuck behind a consumer that stopped draining.
    pub async fn handoff(&self, payload: T, timeout: Duration) -> Result<R, RendezvousError> {
        let (tx, rx) = oneshot::channel();
        let envelope = Envelope {
            payload,
            reply: ReplySink { tx, abandoned: self.abandoned.clone() },
        };

        let exchange = async {
            self.tx
                .send(envelope)
                .await
                .map_err(|_| RendezvousError::Closed)?;
            rx.await.map_err(|_| RendezvousError::Closed)
        };

        match time::timeout(timeout, exchange).await {
            Ok(res) => res,
            Err(_) => Err(RendezvousError::Timeout),
        }
    }

    /// Replies that arrived after their caller had already timed out.
    /// A growing value means the consumer is too slow for the configured bound.
    pub fn abandoned_replies(&self) -> u64 {
        self.abandoned.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tokio::time::sleep;

    #[tokio::test]
    async fn handoff_returns_consumer_reply() {
        let (exchange, mut rx) = Exchange::<u32, String>::new();

        tokio::spawn(async move {
            let env = rx.recv().await.unwrap();
            let (payload, reply) = env.into_parts();
            reply.respond(format!("got {}", payload)).unwrap();
        });

        let res = exchange.handoff(7, Duration::from_secs(1)).await.unwrap();
        assert_eq!(res, "got 7");
    }

    #[tokio::test]
    async fn handoff_times_out_without_consumer() {
        let (exchange, rx) = Exchange::<u32, u32>::new();
        // keep rx alive but never drain, so the failure is a timeout, not Closed
        let _rx = rx;

        let start = Instant::now();
        let err = exchange.handoff(1, Duration::from_millis(50)).await.unwrap_err();
        assert_eq!(err, RendezvousError::Timeout);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_millis(500), "timed out too late: {:?}", elapsed);
    }

    #[tokio::test]
    async fn late_reply_is_dropped_and_counted() {
        let (exchange, mut rx) = Exchange::<u32, u32>::new();

        let consumer = tokio::spawn(async move {
            let env = rx.recv().await.unwrap();
            sleep(Duration::from_millis(100)).await;
            // caller has timed out by now; respond must fail
            env.reply.respond(99)
        });

        let err = exchange.handoff(1, Duration::from_millis(20)).await.unwrap_err();
        assert_eq!(err, RendezvousError::Timeout);

        let late = consumer.await.unwrap();
        assert_eq!(late, Err(99));
        assert_eq!(exchange.abandoned_replies(), 1);
    }

    #[tokio::test]
    async fn concurrent_handoffs_get_their_own_replies() {
        let (exchange, mut rx) = Exchange::<u32, u32>::new();

        tokio::spawn(async move {
            while let Some(env) = rx.recv().await {
                let (payload, reply) = env.into_parts();
                let _ = reply.respond(payload * 10);
            }
        });

        let mut handles = Vec::new();
        for i in 0..16u32 {
            let ex = exchange.clone();
            handles.push(tokio::spawn(async move {
                let res = ex.handoff(i, Duration::from_secs(2)).await.unwrap();
                (i, res)
            }));
        }
        for h in handles {
            let (i, res) = h.await.unwrap();
            assert_eq!(res, i * 10);
        }
    }

    #[test]
    fn cloned_handles_feed_the_same_consumer() {
        tokio_test::block_on(async {
            let (exchange, mut rx) = Exchange::<u8, u8>::new();
            let cloned = exchange.clone();
            tokio::spawn(async move {
                let env = rx.recv().await.unwrap();
                let (payload, reply) = env.into_parts();
                let _ = reply.respond(payload + 1);
            });
            let r = cloned.handoff(1, Duration::from_secs(1)).await.unwrap();
            assert_eq!(r, 2);
        });
    }

    #[tokio::test]
    async fn handoff_fails_closed_when_consumer_dropped() {
        let (exchange, rx) = Exchange::<u32, u32>::new();
        drop(rx);
        let err = exchange.handoff(1, Duration::from_secs(1)).await.unwrap_err();
        assert_eq!(err, RendezvousError::Closed);
    }
}
