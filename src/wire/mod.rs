//! Wire layer: length-delimited frames over TCP, each frame carrying one
//! JSON-encoded call or reply.

pub mod codec;
pub mod message;
pub mod tcp;

pub use codec::FrameCodec;
pub use message::{RpcRequest, RpcResponse};
