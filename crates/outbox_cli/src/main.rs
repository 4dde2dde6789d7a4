//! outbox CLI
//!
//! Manages user records that keep working without a network. Changes made
//! while the remote authority is unreachable are queued in the store
//! directory and replayed the next time it answers.
//!
//! # Commands
//!
//! - `add`, `edit`, `delete` - Change records
//! - `list` - Show local records
//! - `sync` - Replay queued changes now
//! - `pending` - Show queued changes
//! - `status` - Show connectivity and queue state
//! - `refresh` - Replace local records with the authority's
//! - `compact` - Rewrite the local logs
//! - `watch` - Stay running and replay whenever the authority comes back

mod commands;
mod error;
mod presenter;

use clap::{Parser, Subcommand};
use error::CliError;
use outbox_core::{RecordId, StoreConfig};
use outbox_sync_engine::{
    dispatch, present_warnings, Client, Command, ConnectivityMonitor, HttpRemote, Presenter,
    SyncConfig, DEFAULT_REMOTE_URL,
};
use presenter::TextPresenter;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Offline-tolerant user records.
#[derive(Parser)]
#[command(name = "outbox")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding the local stores
    #[arg(global = true, short, long, default_value = ".outbox")]
    dir: PathBuf,

    /// Base URL of the remote authority
    #[arg(global = true, short, long, env = "OUTBOX_REMOTE", default_value = DEFAULT_REMOTE_URL)]
    remote: String,

    /// Timeout for each remote call, in milliseconds
    #[arg(global = true, long, default_value_t = 10_000)]
    timeout_ms: u64,

    /// Do not contact the remote authority; queue every change
    #[arg(global = true, long)]
    offline: bool,

    /// Print records and queued changes as JSON
    #[arg(global = true, long)]
    json: bool,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a record
    Add {
        /// Display name
        name: String,
        /// Email address
        email: String,
        /// Password
        password: String,
    },

    /// Rename a record
    Edit {
        /// Record id
        id: String,
        /// New name
        name: String,
    },

    /// Delete a record
    Delete {
        /// Record id
        id: String,
    },

    /// Show local records
    List,

    /// Replay queued changes now
    Sync,

    /// Show queued changes
    Pending,

    /// Show connectivity, queue and store state
    Status,

    /// Replace local records with the authority's list
    Refresh,

    /// Rewrite the local logs without dead entries
    Compact,

    /// Keep probing the authority and replay whenever it comes back
    Watch {
        /// Probe interval in milliseconds
        #[arg(short, long, default_value_t = 5_000)]
        interval_ms: u64,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Reported) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let timeout = Duration::from_millis(cli.timeout_ms.max(1));
    let config = SyncConfig::new(cli.remote)
        .with_remote_timeout(timeout)
        .with_probe_timeout(timeout.min(Duration::from_secs(2)));

    let remote = HttpRemote::new(&config)?;
    let monitor = Arc::new(ConnectivityMonitor::new(false));
    let client = Client::open(&cli.dir, &StoreConfig::default(), remote, monitor)?;

    let stdout = std::io::stdout();
    let mut out = TextPresenter::new(stdout.lock(), cli.json);
    present_warnings(&client, &mut out);

    if !cli.offline {
        // Seeds the monitor; a queue left by an offline run drains here.
        if let Some(report) = client.poll_connectivity(client.engine().remote())? {
            out.show_report(&report);
        }
    }

    let command = match cli.command {
        Commands::Add {
            name,
            email,
            password,
        } => Command::Add {
            name,
            email,
            password,
        },
        Commands::Edit { id, name } => Command::Edit {
            id: RecordId::new(id),
            name,
        },
        Commands::Delete { id } => Command::Delete {
            id: RecordId::new(id),
        },
        Commands::List => Command::List,
        Commands::Sync => Command::Sync,
        Commands::Pending => Command::Pending,
        Commands::Status => {
            let remote_url = client.engine().remote().base_url();
            commands::status::run(&client, &cli.dir, remote_url, &mut out)?;
            return out.finish().map_err(CliError::from);
        }
        Commands::Refresh => {
            commands::refresh::run(&client, &mut out)?;
            return out.finish().map_err(CliError::from);
        }
        Commands::Compact => {
            client.compact()?;
            out.line(format_args!("compacted {}", cli.dir.display()));
            return out.finish().map_err(CliError::from);
        }
        Commands::Watch { interval_ms } => {
            drop(out);
            let config = config.with_poll_interval(Duration::from_millis(interval_ms.max(1)));
            return commands::watch::run(client, &config);
        }
    };

    dispatch(&client, command, &mut out).map_err(|_| CliError::Reported)?;
    out.finish().map_err(CliError::from)
}
