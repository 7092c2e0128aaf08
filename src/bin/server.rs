use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use wust_hijack::{LogHandler, ServerConfig, WebSocketServer};

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1")]
    addr: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Path that accepts upgrade requests
    #[arg(long, default_value = "/")]
    path: String,

    /// Largest accepted frame payload in bytes
    #[arg(long)]
    max_payload: Option<u64>,

    /// Drop connections idle for this many seconds
    #[arg(long)]
    read_timeout_secs: Option<u64>,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        Self {
            addr: format!("{}:{}", args.addr, args.port),
            path: args.path,
            max_payload: args.max_payload.unwrap_or(u64::MAX),
            read_timeout: args.read_timeout_secs.map(Duration::from_secs),
        }
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("wust_hijack=info".parse().unwrap()),
        )
        .with_target(false)
        .compact()
        .init();

    let config = ServerConfig::from(Args::parse());
    WebSocketServer::bind(config).await?.run(LogHandler).await;

    Ok(())
}
