//! Command handlers for a UI adapter.
//!
//! The UI turns user actions into [`Command`]s and implements
//! [`Presenter`]; [`dispatch`] runs a command against a [`Client`] and
//! tells the presenter what to show. The core never touches presentation
//! state itself.

use crate::client::{Client, Degraded, Notice};
use crate::engine::DrainReport;
use crate::error::{SyncError, SyncResult};
use outbox_core::{Mutation, Record, RecordId, RemoteAuthority};

/// A user action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create a record.
    Add {
        /// Display name.
        name: String,
        /// Email address.
        email: String,
        /// Password.
        password: String,
    },
    /// Rename a record.
    Edit {
        /// The record.
        id: RecordId,
        /// The new name.
        name: String,
    },
    /// Delete a record.
    Delete {
        /// The record.
        id: RecordId,
    },
    /// Show every record.
    List,
    /// Replay queued mutations now.
    Sync,
    /// Show queued mutations.
    Pending,
}

impl Command {
    /// Returns true if the command changes records.
    pub fn is_mutating(&self) -> bool {
        matches!(self, Command::Add { .. } | Command::Edit { .. } | Command::Delete { .. })
    }
}

/// What a UI must be able to show.
pub trait Presenter {
    /// Shows the record list.
    fn show_records(&mut self, records: &[Record]);

    /// Shows how a change reached the authority.
    fn show_notice(&mut self, notice: Notice, record: &RecordId);

    /// Shows the result of a drain pass.
    fn show_report(&mut self, report: &DrainReport);

    /// Shows the queued mutations.
    fn show_pending(&mut self, pending: &[Mutation]);

    /// Shows a degraded-mode warning.
    fn show_warning(&mut self, warning: &Degraded);

    /// Shows a failed command.
    fn show_error(&mut self, error: &SyncError);
}

/// Runs `command` and presents its result.
///
/// After a successful mutating command the record list is presented again.
/// Failures are presented and also returned.
///
/// # Errors
///
/// Returns whatever error the command failed with.
pub fn dispatch<R, P>(client: &Client<R>, command: Command, presenter: &mut P) -> SyncResult<()>
where
    R: RemoteAuthority,
    P: Presenter + ?Sized,
{
    tracing::debug!(?command, "dispatching");
    let mutating = command.is_mutating();

    let result = run(client, command, presenter)
        .and_then(|()| if mutating { list(client, presenter) } else { Ok(()) });

    if let Err(e) = &result {
        presenter.show_error(e);
    }
    result
}

/// Presents every degraded-mode warning the client is running under.
pub fn present_warnings<R, P>(client: &Client<R>, presenter: &mut P)
where
    R: RemoteAuthority,
    P: Presenter + ?Sized,
{
    for warning in client.warnings() {
        presenter.show_warning(warning);
    }
}

fn run<R, P>(client: &Client<R>, command: Command, presenter: &mut P) -> SyncResult<()>
where
    R: RemoteAuthority,
    P: Presenter + ?Sized,
{
    match command {
        Command::Add {
            name,
            email,
            password,
        } => {
            let outcome = client.add_record(&name, &email, &password)?;
            presenter.show_notice(outcome.notice, &outcome.value.id);
        }
        Command::Edit { id, name } => {
            let outcome = client.edit_record(&id, &name)?;
            presenter.show_notice(outcome.notice, &id);
        }
        Command::Delete { id } => {
            let outcome = client.delete_record(&id)?;
            presenter.show_notice(outcome.notice, &id);
        }
        Command::List => list(client, presenter)?,
        Command::Sync => {
            let report = client.sync_now()?;
            presenter.show_report(&report);
        }
        Command::Pending => presenter.show_pending(&client.pending()),
    }
    Ok(())
}

fn list<R, P>(client: &Client<R>, presenter: &mut P) -> SyncResult<()>
where
    R: RemoteAuthority,
    P: Presenter + ?Sized,
{
    let records = client.list_records()?;
    presenter.show_records(&records);
    Ok(())
}
