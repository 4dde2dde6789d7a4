//! Connectivity monitor.
//!
//! The monitor holds the current online/offline state and fans edge
//! transitions out to subscribers over channels:
//!
//! ```rust,ignore
//! let monitor = ConnectivityMonitor::new(false);
//! let events = monitor.subscribe();
//!
//! std::thread::spawn(move || {
//!     while let Ok(transition) = events.recv() {
//!         println!("{transition:?}");
//!     }
//! });
//!
//! monitor.set_online(true); // emits WentOnline
//! monitor.set_online(true); // no edge, nothing emitted
//! ```

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};

/// An online/offline edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The remote authority became reachable.
    WentOnline,
    /// The remote authority stopped being reachable.
    WentOffline,
}

/// Something that can tell whether the remote authority is reachable now.
pub trait ConnectivityProbe: Send + Sync {
    /// Returns true if the authority answered.
    fn probe(&self) -> bool;
}

/// Tracks connectivity and distributes transitions.
pub struct ConnectivityMonitor {
    online: AtomicBool,
    subscribers: RwLock<Vec<Sender<Transition>>>,
}

impl ConnectivityMonitor {
    /// Creates a monitor in the given state.
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Returns the current state.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Records the current state, emitting a transition if it changed.
    pub fn set_online(&self, online: bool) -> Option<Transition> {
        if self.online.swap(online, Ordering::SeqCst) == online {
            return None;
        }

        let transition = if online {
            Transition::WentOnline
        } else {
            Transition::WentOffline
        };
        tracing::info!(?transition, "connectivity changed");

        self.subscribers
            .write()
            .retain(|tx| tx.send(transition).is_ok());
        Some(transition)
    }

    /// Probes once and records the result.
    pub fn poll(&self, probe: &dyn ConnectivityProbe) -> Option<Transition> {
        self.set_online(probe.probe())
    }

    /// Subscribes to future transitions.
    pub fn subscribe(&self) -> Receiver<Transition> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.write().push(tx);
        rx
    }

    /// Returns the number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Drops every subscriber; their receivers see the channel close.
    pub fn close(&self) {
        self.subscribers.write().clear();
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

impl std::fmt::Debug for ConnectivityMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectivityMonitor")
            .field("online", &self.is_online())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// A probe that always gives the same answer.
#[derive(Debug, Clone, Copy)]
pub struct StaticProbe(pub bool);

impl ConnectivityProbe for StaticProbe {
    fn probe(&self) -> bool {
        self.0
    }
}
