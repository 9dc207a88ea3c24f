#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::time::timeout;

use battleship_server::{
    server, transport::Transport, Frame, FrameKind, ServerConfig, TcpTransport,
};

pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Row-per-ship layout used across the integration tests.
pub const FLEET_LAYOUT: [&str; 5] = [
    "A1 H Carrier",
    "A2 H Battleship",
    "A3 H Cruiser",
    "A4 H Submarine",
    "A5 H Destroyer",
];

/// Every cell the layout occupies, in firing order. Firing all of them in
/// sequence sinks each ship on its last cell, Destroyer last.
pub const SHIP_CELLS: [&str; 17] = [
    "A1", "B1", "C1", "D1", "E1", "A2", "B2", "C2", "D2", "A3", "B3", "C3", "A4", "B4", "C4",
    "A5", "B5",
];

/// Sixteen cells the layout never touches, for the losing side's shots.
pub const OPEN_WATER: [&str; 16] = [
    "A10", "B10", "C10", "D10", "E10", "F10", "G10", "H10", "I10", "J10", "A9", "B9", "C9", "D9",
    "E9", "F9",
];

/// Bind an ephemeral port and run the server in the background.
pub async fn start_server(config: ServerConfig) -> Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = server::run(listener, config).await;
    });
    Ok(addr)
}

/// A client with its own outbound sequence counter.
pub struct TestClient {
    transport: TcpTransport,
    seq: u32,
}

impl TestClient {
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        Ok(Self {
            transport: TcpTransport::connect(addr).await?,
            seq: 0,
        })
    }

    pub async fn send(&mut self, kind: FrameKind, text: &str) -> Result<()> {
        self.seq += 1;
        self.transport
            .send(&Frame::text(self.seq, kind, text))
            .await
    }

    pub async fn recv(&mut self) -> Result<Frame> {
        timeout(RECV_TIMEOUT, self.transport.recv()).await?
    }

    /// Skip frames until one satisfies `pred`.
    pub async fn recv_until(&mut self, mut pred: impl FnMut(&Frame) -> bool) -> Result<Frame> {
        loop {
            let frame = self.recv().await?;
            if pred(&frame) {
                return Ok(frame);
            }
        }
    }

    pub async fn recv_kind(&mut self, kind: FrameKind) -> Result<Frame> {
        self.recv_until(|frame| frame.kind == kind).await
    }

    /// Join with a fresh name; returns the reconnect token.
    pub async fn join(&mut self, name: &str) -> Result<String> {
        self.send(FrameKind::Join, name).await?;
        Ok(self.recv_kind(FrameKind::Join).await?.payload_text())
    }

    pub async fn place_fleet(&mut self) -> Result<()> {
        for placement in FLEET_LAYOUT {
            self.send(FrameKind::Place, placement).await?;
            let reply = self
                .recv_until(|f| matches!(f.kind, FrameKind::Place | FrameKind::Error))
                .await?;
            anyhow::ensure!(
                reply.kind == FrameKind::Place,
                "placement rejected: {}",
                reply.payload_text()
            );
        }
        Ok(())
    }

    /// Fire and return the direct result text (announcements about other
    /// players' shots are skipped).
    pub async fn fire(&mut self, coord: &str) -> Result<String> {
        self.send(FrameKind::Fire, coord).await?;
        let reply = self
            .recv_until(|f| f.kind == FrameKind::Fire && !f.payload_text().contains("fired at"))
            .await?;
        Ok(reply.payload_text())
    }

    pub async fn close(&mut self) -> Result<()> {
        self.transport.close().await
    }
}
