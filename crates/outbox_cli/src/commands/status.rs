//! Status command implementation.

use crate::error::CliError;
use crate::presenter::TextPresenter;
use outbox_core::RemoteAuthority;
use outbox_sync_engine::{Client, SyncState};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Client state as shown by `outbox status`.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    /// Store directory.
    pub dir: String,
    /// Remote authority base URL.
    pub remote: String,
    /// Whether the last probe reached the authority.
    pub online: bool,
    /// Number of local records.
    pub records: usize,
    /// Number of queued mutations.
    pub pending: usize,
    /// Sync engine state.
    pub state: &'static str,
    /// Degraded-mode warnings.
    pub warnings: Vec<String>,
}

impl StatusReport {
    /// Collects the state of `client`.
    ///
    /// # Errors
    ///
    /// Returns an error if the records cannot be listed.
    pub fn collect<R: RemoteAuthority>(
        client: &Client<R>,
        dir: &Path,
        remote: &str,
    ) -> Result<Self, CliError> {
        let state = match client.engine().state() {
            SyncState::Idle => "idle",
            SyncState::Draining => "draining",
            SyncState::Error => "error",
        };
        Ok(Self {
            dir: dir.display().to_string(),
            remote: remote.to_string(),
            online: client.monitor().is_online(),
            records: client.list_records()?.len(),
            pending: client.engine().pending_len(),
            state,
            warnings: client.warnings().iter().map(ToString::to_string).collect(),
        })
    }
}

/// Runs the status command.
pub fn run<R: RemoteAuthority, W: Write>(
    client: &Client<R>,
    dir: &Path,
    remote: &str,
    out: &mut TextPresenter<W>,
) -> Result<(), CliError> {
    let report = StatusReport::collect(client, dir, remote)?;
    if out.is_json() {
        out.json(&report);
        return Ok(());
    }

    out.line(format_args!("store:   {}", report.dir));
    out.line(format_args!(
        "remote:  {} ({})",
        report.remote,
        if report.online { "online" } else { "offline" }
    ));
    out.line(format_args!("records: {}", report.records));
    out.line(format_args!("pending: {}", report.pending));
    out.line(format_args!("engine:  {}", report.state));
    for warning in &report.warnings {
        out.line(format_args!("warning: {warning}"));
    }
    Ok(())
}
