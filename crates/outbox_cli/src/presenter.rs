//! Terminal presenter.

use outbox_core::{Mutation, Payload, Record, RecordId};
use outbox_sync_engine::{Degraded, DrainReport, Notice, Presenter, SyncError};
use serde::Serialize;
use std::fmt;
use std::io::{self, Write};

/// Writes command results as text or JSON.
///
/// Warnings and errors go to stderr. The first failed write is kept and
/// returned by [`TextPresenter::finish`]; later output is dropped.
pub struct TextPresenter<W: Write> {
    out: W,
    json: bool,
    error: Option<io::Error>,
}

impl<W: Write> TextPresenter<W> {
    /// Creates a presenter writing to `out`.
    pub fn new(out: W, json: bool) -> Self {
        Self {
            out,
            json,
            error: None,
        }
    }

    /// Writes one line.
    pub fn line(&mut self, args: fmt::Arguments<'_>) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self.out.write_fmt(args).and_then(|()| self.out.write_all(b"\n")) {
            self.error = Some(e);
        }
    }

    /// Returns true if output is JSON.
    pub fn is_json(&self) -> bool {
        self.json
    }

    /// Writes `value` as pretty JSON.
    pub fn json<T: Serialize + ?Sized>(&mut self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(text) => self.line(format_args!("{text}")),
            Err(e) => {
                if self.error.is_none() {
                    self.error = Some(e.into());
                }
            }
        }
    }

    /// Flushes the output.
    ///
    /// # Errors
    ///
    /// Returns the first write error.
    pub fn finish(mut self) -> io::Result<()> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        self.out.flush()
    }
}

/// A record as shown to the user; passwords are never printed.
#[derive(Serialize)]
struct RecordView<'a> {
    id: &'a RecordId,
    name: &'a str,
    email: &'a str,
}

impl<'a> From<&'a Record> for RecordView<'a> {
    fn from(record: &'a Record) -> Self {
        Self {
            id: &record.id,
            name: &record.name,
            email: &record.email,
        }
    }
}

fn describe(mutation: &Mutation) -> String {
    match &mutation.payload {
        Payload::Create(record) => format!("name={} email={}", record.name, record.email),
        Payload::Update { patch, .. } => {
            let mut parts = Vec::new();
            if let Some(name) = &patch.name {
                parts.push(format!("name={name}"));
            }
            if let Some(email) = &patch.email {
                parts.push(format!("email={email}"));
            }
            if patch.password.is_some() {
                parts.push("password=***".to_string());
            }
            parts.join(" ")
        }
        Payload::Delete { .. } => String::new(),
    }
}

impl<W: Write> Presenter for TextPresenter<W> {
    fn show_records(&mut self, records: &[Record]) {
        if self.json {
            let views: Vec<RecordView<'_>> = records.iter().map(RecordView::from).collect();
            self.json(&views);
            return;
        }
        if records.is_empty() {
            self.line(format_args!("no records"));
            return;
        }
        for record in records {
            self.line(format_args!(
                "{:<36}  {:<20}  {}",
                record.id.as_str(),
                record.name,
                record.email
            ));
        }
    }

    fn show_notice(&mut self, notice: Notice, record: &RecordId) {
        self.line(format_args!("{record}: {}", notice.message()));
    }

    fn show_report(&mut self, report: &DrainReport) {
        if report.coalesced {
            self.line(format_args!("a sync is already running"));
            return;
        }
        if report.attempted == 0 && report.remaining == 0 && report.deferred == 0 {
            self.line(format_args!("nothing to sync"));
            return;
        }
        self.line(format_args!(
            "synced {} of {} queued changes ({} failed, {} deferred, {} discarded); {} still pending",
            report.applied + report.discarded,
            report.attempted + report.deferred,
            report.failed,
            report.deferred,
            report.discarded,
            report.remaining
        ));
        if report.cancelled {
            self.line(format_args!("sync was cancelled"));
        }
    }

    fn show_pending(&mut self, pending: &[Mutation]) {
        if self.json {
            self.json(pending);
            return;
        }
        if pending.is_empty() {
            self.line(format_args!("no pending changes"));
            return;
        }
        for mutation in pending {
            self.line(format_args!(
                "{}  {:<6}  {:<36}  {}",
                mutation.id,
                mutation.method().to_string(),
                mutation.record_id().as_str(),
                describe(mutation)
            ));
        }
    }

    fn show_warning(&mut self, warning: &Degraded) {
        eprintln!("warning: {warning}");
    }

    fn show_error(&mut self, error: &SyncError) {
        eprintln!("error: {error}");
    }
}
