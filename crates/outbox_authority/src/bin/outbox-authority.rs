//! Reference remote authority server.
//!
//! Serves the users REST API the outbox client replays against.

use clap::Parser;
use outbox_authority::{open_authority, serve, AuthorityConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Users REST API for outbox clients.
#[derive(Parser)]
#[command(name = "outbox-authority")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = outbox_authority::DEFAULT_BIND_ADDR)]
    bind: SocketAddr,

    /// JSON file holding the users table (in memory if omitted)
    #[arg(short, long)]
    db: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let mut config = AuthorityConfig::new().with_bind_addr(args.bind);
    if let Some(db) = args.db {
        config = config.with_db_path(db);
    }

    let result = match open_authority(&config) {
        Ok(authority) => serve(&config, authority).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "authority failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
