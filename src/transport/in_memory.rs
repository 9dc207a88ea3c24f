use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::task::yield_now;

use crate::frame::Frame;
use crate::transport::Transport;

/// Loopback transport for tests: two handles sharing a pair of queues.
/// Receiving reports a closed channel once the peer's handle is gone and
/// the queue is drained.
pub struct InMemoryTransport {
    recv_queue: Arc<Mutex<VecDeque<Frame>>>,
    send_queue: Arc<Mutex<VecDeque<Frame>>>,
}

impl InMemoryTransport {
    pub fn pair() -> (Self, Self) {
        let q1 = Arc::new(Mutex::new(VecDeque::new()));
        let q2 = Arc::new(Mutex::new(VecDeque::new()));
        (
            Self {
                recv_queue: q1.clone(),
                send_queue: q2.clone(),
            },
            Self {
                recv_queue: q2,
                send_queue: q1,
            },
        )
    }
}

#[async_trait::async_trait]
impl Transport for InMemoryTransport {
    async fn send(&mut self, frame: &Frame) -> anyhow::Result<()> {
        let mut queue = self.send_queue.lock().unwrap();
        queue.push_back(frame.clone());
        Ok(())
    }

    async fn recv(&mut self) -> anyhow::Result<Frame> {
        loop {
            if let Some(frame) = {
                let mut queue = self.recv_queue.lock().unwrap();
                queue.pop_front()
            } {
                return Ok(frame);
            }
            if Arc::strong_count(&self.recv_queue) == 1 {
                return Err(anyhow::anyhow!("Channel closed"));
            }
            yield_now().await;
        }
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        // Swap our send handle out so the peer sees the channel close.
        self.send_queue = Arc::new(Mutex::new(VecDeque::new()));
        Ok(())
    }
}
