use battleship_server::transport::in_memory::InMemoryTransport;
use battleship_server::{transport::Transport, Frame, FrameKind, TcpTransport};
use tokio::net::TcpListener;

#[tokio::test]
async fn in_memory_pair_delivers_in_order() -> anyhow::Result<()> {
    let (mut left, mut right) = InMemoryTransport::pair();
    left.send(&Frame::text(1, FrameKind::Chat, "first")).await?;
    left.send(&Frame::text(2, FrameKind::Fire, "E6")).await?;
    assert_eq!(right.recv().await?.payload_text(), "first");
    let second = right.recv().await?;
    assert_eq!(second.kind, FrameKind::Fire);
    assert_eq!(second.seq, 2);
    Ok(())
}

#[tokio::test]
async fn in_memory_recv_fails_once_the_peer_is_gone() -> anyhow::Result<()> {
    let (mut left, mut right) = InMemoryTransport::pair();
    left.send(&Frame::text(1, FrameKind::Quit, "")).await?;
    left.close().await?;
    // Queued frames drain before the closed channel reports.
    assert_eq!(right.recv().await?.kind, FrameKind::Quit);
    assert!(right.recv().await.is_err());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn tcp_transport_round_trips_frames() -> anyhow::Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut transport = TcpTransport::new(socket);
        let frame = transport.recv().await.unwrap();
        transport.send(&frame).await.unwrap();
    });

    let mut client = TcpTransport::connect(addr).await?;
    let sent = Frame::text(42, FrameKind::Chat, "over the wire");
    client.send(&sent).await?;
    let echoed = client.recv().await?;
    assert_eq!(echoed, sent);

    server.await?;
    assert!(client.recv().await.is_err());
    Ok(())
}
