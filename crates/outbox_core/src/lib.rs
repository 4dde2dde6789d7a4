//! # Outbox Core
//!
//! Local durable state for the outbox offline mutation queue.
//!
//! This crate provides:
//! - The data model ([`Record`], [`Mutation`] and their identifiers)
//! - A framed, checksummed append-only keyed log shared by every store
//! - [`RecordStore`]: the current, possibly offline-edited, view of each record
//! - [`MutationLog`]: the durable FIFO of mutations awaiting the remote authority
//! - [`IdMap`]: local record ids bound to authority-assigned ids
//! - [`StoreDir`]: on-disk layout and the single-writer lock
//! - [`RemoteAuthority`]: the contract the sync engine replays against
//!
//! ## Key Invariants
//!
//! - Every store operation is durable on return (with `sync_on_write`)
//! - A failed write is never visible in the in-memory index
//! - Mutations drain in enqueue order
//! - A torn tail frame is dropped on open; any other damage is corruption

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod codec;
mod config;
mod dir;
mod error;
mod id_map;
mod log;
mod mutation_log;
mod record_store;
mod remote;
mod stores;
mod types;

pub use config::StoreConfig;
pub use dir::StoreDir;
pub use error::{CoreError, CoreResult};
pub use id_map::IdMap;
pub use log::{compute_crc32, Corruption, KeyedLog};
pub use mutation_log::{Drain, MutationLog};
pub use record_store::RecordStore;
pub use remote::{RemoteAuthority, RemoteError, RemoteResult};
pub use stores::LocalStores;
pub use types::{
    Method, Mutation, MutationId, MutationStatus, NewRecord, Payload, Record, RecordId,
    RecordPatch,
};
