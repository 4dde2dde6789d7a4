//! Commands that go beyond the shared dispatcher.

pub mod refresh;
pub mod status;
pub mod watch;
