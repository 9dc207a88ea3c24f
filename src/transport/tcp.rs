use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::time::timeout;

use crate::config::DEFAULT_SEND_TIMEOUT;
use crate::frame::{read_frame, Frame};
use crate::transport::Transport;

pub struct TcpTransport {
    stream: TcpStream,
    send_timeout: Duration,
}

impl TcpTransport {
    pub fn new(stream: TcpStream) -> Self {
        Self::with_timeout(stream, DEFAULT_SEND_TIMEOUT)
    }

    pub fn with_timeout(stream: TcpStream, send_timeout: Duration) -> Self {
        Self {
            stream,
            send_timeout,
        }
    }

    pub async fn connect<A: ToSocketAddrs>(addr: A) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self::new(stream))
    }
}

#[async_trait::async_trait]
impl Transport for TcpTransport {
    async fn send(&mut self, frame: &Frame) -> anyhow::Result<()> {
        let bytes = frame.encode()?;
        timeout(self.send_timeout, self.stream.write_all(&bytes))
            .await
            .map_err(|_| anyhow::anyhow!("Send timed out after {:?}", self.send_timeout))??;
        Ok(())
    }

    async fn recv(&mut self) -> anyhow::Result<Frame> {
        let frame = read_frame(&mut self.stream).await??;
        Ok(frame)
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }
}
