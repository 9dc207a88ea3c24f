use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use battleship_server::{init_logging, server, ServerConfig};

/// Battleship session server: one match at a time over a framed TCP
/// protocol, with a waiting lobby and spectators.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:8080")]
    bind: String,
    /// Seconds of silence before a connection is swept.
    #[arg(long, default_value_t = 30)]
    inactivity_timeout: u64,
    /// Seconds a disconnected player's seat is held for reconnection.
    #[arg(long, default_value_t = 60)]
    reconnect_grace: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = ServerConfig {
        inactivity_timeout: Duration::from_secs(cli.inactivity_timeout),
        reconnect_grace: Duration::from_secs(cli.reconnect_grace),
        ..ServerConfig::default()
    };
    let listener = TcpListener::bind(&cli.bind).await?;
    log::info!("Battleship server listening on {}", cli.bind);
    server::run(listener, config).await
}
