//! Refresh command implementation.

use crate::error::CliError;
use crate::presenter::TextPresenter;
use outbox_core::RemoteAuthority;
use outbox_sync_engine::{Client, Presenter};
use std::io::Write;

/// Runs the refresh command.
pub fn run<R: RemoteAuthority, W: Write>(
    client: &Client<R>,
    out: &mut TextPresenter<W>,
) -> Result<(), CliError> {
    match client.refresh()? {
        Some(count) => {
            tracing::debug!(count, "local records replaced");
            out.show_records(&client.list_records()?);
        }
        None => out.line(format_args!(
            "{} changes still pending; run `outbox sync` first",
            client.engine().pending_len()
        )),
    }
    Ok(())
}
