//! Line-oriented interactive client. Stdin commands become frames, received
//! frames are printed, and state snapshots are rendered as text grids. A
//! PING keepalive runs every 10 seconds.

use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::interval;

use battleship_server::{read_frame, render_grid, Frame, FrameKind, Phase, StateSnapshot};

const PING_PERIOD: Duration = Duration::from_secs(10);

/// Interactive Battleship client.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Server address to connect to.
    #[arg(long, default_value = "127.0.0.1:8080")]
    connect: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let stream = TcpStream::connect(&cli.connect).await?;
    println!("Connected to {}.", cli.connect);
    println!(
        "Commands: join <name> | resume <token> | place <coord> <H|V> <ship> | \
         fire <coord> | chat <message> | show | quit"
    );

    let (mut reader, mut writer) = stream.into_split();
    let mut incoming = tokio::spawn(async move {
        loop {
            match read_frame(&mut reader).await {
                Ok(Ok(frame)) => {
                    if !print_frame(&frame) {
                        break;
                    }
                }
                Ok(Err(fault)) => println!("Bad frame from server: {}", fault),
                Err(_) => {
                    println!("Server closed the connection.");
                    break;
                }
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut seq: u32 = 0;
    let mut ping = interval(PING_PERIOD);
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                let Some(frame) = frame_for_line(&mut seq, &line) else {
                    println!("Unknown command.");
                    continue;
                };
                writer.write_all(&frame.encode()?).await?;
            }
            _ = ping.tick() => {
                seq += 1;
                let frame = Frame::new(seq, FrameKind::Ping, Vec::new());
                writer.write_all(&frame.encode()?).await?;
            }
            _ = &mut incoming => break,
        }
    }
    let _ = writer.shutdown().await;
    Ok(())
}

fn frame_for_line(seq: &mut u32, line: &str) -> Option<Frame> {
    let (verb, rest) = battleship_server::split_verb(line);
    let (kind, payload) = match verb.to_ascii_lowercase().as_str() {
        "join" => (FrameKind::Join, rest.to_string()),
        "resume" => (FrameKind::Join, format!("resume {}", rest)),
        "place" => (FrameKind::Place, rest.to_string()),
        "fire" => (FrameKind::Fire, rest.to_string()),
        "chat" => (FrameKind::Chat, rest.to_string()),
        "show" => (FrameKind::StateSync, String::new()),
        "quit" => (FrameKind::Quit, String::new()),
        _ => return None,
    };
    *seq += 1;
    Some(Frame::new(*seq, kind, payload.into_bytes()))
}

/// Print one server frame; false once the server has said goodbye.
fn print_frame(frame: &Frame) -> bool {
    match frame.kind {
        FrameKind::Join => println!("Your reconnect token: {}", frame.payload_text()),
        FrameKind::Chat | FrameKind::Fire | FrameKind::Place => {
            println!("{}", frame.payload_text())
        }
        FrameKind::Error => println!("Error: {}", frame.payload_text()),
        FrameKind::StateSync => match bincode::deserialize::<StateSnapshot>(&frame.payload) {
            Ok(snapshot) => print_snapshot(&snapshot),
            Err(err) => println!("Unreadable snapshot: {}", err),
        },
        FrameKind::Ping | FrameKind::Pong => {}
        FrameKind::Quit => {
            println!("{}", frame.payload_text());
            return false;
        }
    }
    true
}

fn print_snapshot(snapshot: &StateSnapshot) {
    println!("Phase: {:?}", snapshot.phase);
    if let Some(seat) = snapshot.you {
        println!("You are Player {}.", seat + 1);
    }
    for seat in 0..2usize {
        let name = snapshot.names[seat].as_deref().unwrap_or("(empty seat)");
        println!("Player {} ({}):", seat + 1, name);
        print!("{}", render_grid(&snapshot.boards[seat].grid));
    }
    if snapshot.phase == Phase::InProgress {
        if let Some(turn) = snapshot.turn {
            let name = snapshot.names[turn as usize].as_deref().unwrap_or("?");
            println!("It is {}'s turn.", name);
        }
    }
    if let Some(winner) = snapshot.winner {
        let name = snapshot.names[winner as usize].as_deref().unwrap_or("?");
        println!("{} won the match.", name);
    }
}
