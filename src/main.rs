//! respkv - A RESP Server with Per-Class Command Workers
//!
//! This is the main entry point for the respkv server.
//! It parses the command line, sets up logging, starts the server and
//! stops it again on Ctrl+C.

use clap::Parser;
use respkv::{Server, ServerConfig, StopMode};
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "respkv", version, about, long_about = None)]
struct Args {
    /// Host to bind to
    #[arg(short = 'H', long, default_value = respkv::DEFAULT_HOST)]
    host: String,

    /// Port to listen on (0 picks a free port)
    #[arg(short, long, default_value_t = respkv::DEFAULT_PORT)]
    port: u16,

    /// Capacity of each command class queue
    #[arg(long, default_value_t = 50)]
    queue_capacity: usize,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Answer every queued command before exiting on Ctrl+C
    #[arg(long)]
    drain_on_shutdown: bool,
}

impl Args {
    fn config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            queue_capacity: self.queue_capacity,
            ..ServerConfig::default()
        }
    }
}

fn print_banner(addr: std::net::SocketAddr) {
    println!(
        r#"
respkv v{} - RESP server with per-class command workers
──────────────────────────────────────────────────────────────
Server started on {}
Ready to accept connections.

Use Ctrl+C to shutdown.
"#,
        respkv::VERSION,
        addr
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Set up logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("respkv={}", args.log_level)))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    let server = Server::new(args.config()).start().await?;
    print_banner(server.local_addr());

    signal::ctrl_c().await?;
    info!("Shutdown signal received, stopping server...");

    let mode = if args.drain_on_shutdown {
        StopMode::Drain
    } else {
        StopMode::Immediate
    };
    server.stop(mode).await;

    info!("Server shutdown complete");
    Ok(())
}
