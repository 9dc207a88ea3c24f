use crate::frame::Frame;

/// Byte-stream seam between the session engine and a peer. The server's
/// own connection tasks drive sockets directly; this trait is the client
/// and test-side abstraction.
#[async_trait::async_trait]
pub trait Transport: Send {
    async fn send(&mut self, frame: &Frame) -> anyhow::Result<()>;
    async fn recv(&mut self) -> anyhow::Result<Frame>;
    async fn close(&mut self) -> anyhow::Result<()>;
}

pub mod in_memory;
pub mod tcp;
