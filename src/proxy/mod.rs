//! The two socket proxy pairs.
//!
//! - `SocketAppProxy` lives in the engine process: receives `Engine.SubmitTx`
//!   calls and re-exposes them as a queue of raw payloads; dials the
//!   application to deliver finalized blocks.
//! - `SocketEngineProxy` lives in the application process: receives
//!   `State.CommitBlock` calls and turns each into a blocking handoff to the
//!   application's consumer; dials the engine to submit transactions.
//!
//! Both are built from the same server/client adapters in `server` and
//! `client`, parameterized by an `RpcService` implementation per direction.

pub mod app;
pub mod client;
pub mod engine;
pub mod server;

use serde::{Serialize, Deserialize};

use crate::rendezvous::{Envelope, ReplySink};
use crate::types::Block;

pub use app::SocketAppProxy;
pub use client::RpcClient;
pub use engine::SocketEngineProxy;
pub use server::{RpcServer, RpcService};

pub const METHOD_SUBMIT_TX: &str = "Engine.SubmitTx";
pub const METHOD_COMMIT_BLOCK: &str = "State.CommitBlock";

/// What the application's consumer sends back for one committed block.
/// Produced exactly once per Commit; an error here propagates verbatim to the
/// RPC caller as a call failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitResponse {
    pub state_hash: Vec<u8>,
    pub error: Option<String>,
}

/// One block delivery awaiting the application's answer. Lives only for the
/// duration of the RPC call that created it.
pub type Commit = Envelope<Block, CommitResponse>;

impl Envelope<Block, CommitResponse> {
    /// Answer with a digest and optional error. Fails (returning the response)
    /// if the delivering call already timed out and the sink was abandoned.
    pub fn respond(
        self,
        state_hash: Vec<u8>,
        error: Option<String>,
    ) -> std::result::Result<(), CommitResponse> {
        self.reply.respond(CommitResponse { state_hash, error })
    }

    pub fn block(&self) -> &Block {
        &self.payload
    }

    pub fn into_block_and_sink(self) -> (Block, ReplySink<CommitResponse>) {
        self.into_parts()
    }
}
