//! # Outbox Authority
//!
//! Reference remote authority for the outbox offline queue: a users table
//! behind a REST surface.
//!
//! This crate provides:
//! - [`Authority`]: the table, optionally persisted as a pretty-printed
//!   JSON file, also usable in-process as a `RemoteAuthority`
//! - [`router`]: the axum routes (`/users`, `/users/{id}`), with permissive CORS
//! - [`serve`] and [`RunningAuthority`]: serving in the foreground or from a
//!   background thread
//!
//! ## Key Invariants
//!
//! - Ids are sequential and never reused
//! - A change is visible only once the table is saved
//! - Update and delete of an unknown or malformed id answer 404

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

mod config;
mod error;
mod handler;
mod server;
mod store;

pub use config::{AuthorityConfig, DEFAULT_BIND_ADDR};
pub use error::{AuthorityError, AuthorityResult};
pub use handler::router;
pub use server::{open_authority, serve, RunningAuthority};
pub use store::{Authority, User};
