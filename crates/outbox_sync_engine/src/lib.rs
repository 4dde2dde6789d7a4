//! # Outbox Sync Engine
//!
//! Replays locally queued mutations against the remote authority.
//!
//! This crate provides:
//! - [`ConnectivityMonitor`]: online/offline state and its transitions
//! - [`SyncEngine`]: immediate delivery with queue fallback, and drain passes
//! - [`HttpRemote`]: the remote authority over HTTP/JSON
//! - [`Client`]: the context object owning one client's stores and engine
//! - [`Command`], [`Presenter`] and [`dispatch`]: the UI adapter seam
//! - [`SyncWorker`]: a background thread draining on every `WentOnline`
//!
//! ## Architecture
//!
//! A user-initiated change commits to the Record Store first, then goes to
//! the engine. Online, the engine sends it at once and queues it only if
//! that fails; offline, it queues it. Every `WentOnline` transition drains
//! the whole queue.
//!
//! ## Key Invariants
//!
//! - A mutation leaves the queue only after the authority confirms it
//!   (or answers that its record no longer exists)
//! - Mutations for one record are replayed in enqueue order
//! - One failing mutation never blocks mutations for other records
//! - At most one drain pass runs at a time; concurrent requests coalesce
//! - Remote failures never fail a user operation

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod commands;
mod config;
mod connectivity;
mod engine;
mod error;
mod http;
mod worker;

pub use client::{Client, Degraded, Notice, Outcome};
pub use commands::{dispatch, present_warnings, Command, Presenter};
pub use config::{SyncConfig, DEFAULT_REMOTE_URL};
pub use connectivity::{ConnectivityMonitor, ConnectivityProbe, StaticProbe, Transition};
pub use engine::{Delivery, DrainReport, SyncEngine, SyncState, SyncStats};
pub use error::{SyncError, SyncResult};
pub use http::HttpRemote;
pub use worker::SyncWorker;
