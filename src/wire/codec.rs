use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};
use std::io;

/// Upper bound on a single call/reply frame. Blocks are the largest payload
/// carried; anything beyond this indicates a corrupt or hostile peer.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Thin wrapper that produces/consumes raw bytes frames via LengthDelimitedCodec.
/// JSON encoding/decoding of RpcRequest/RpcResponse is done in the adapter layer.
#[derive(Debug)]
pub struct FrameCodec {
    inner: LengthDelimitedCodec,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self {
            inner: LengthDelimitedCodec::builder()
                .max_frame_length(MAX_FRAME_LEN)
                .new_codec(),
        }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = bytes::Bytes;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.inner.decode(src)? {
            Some(buf) => Ok(Some(buf.freeze())),
            None => Ok(None),
        }
    }
}

impl Encoder<bytes::Bytes> for FrameCodec {
    type Error = io::Error;

    fn encode(&mut self, item: bytes::Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.inner.encode(item, dst)
    }
}
