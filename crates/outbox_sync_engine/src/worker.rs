//! Background replay on connectivity transitions.

use crate::connectivity::{ConnectivityProbe, Transition};
use crate::engine::SyncEngine;
use outbox_core::RemoteAuthority;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// How often the worker checks its stop flag when there is no probe.
const IDLE_TICK: Duration = Duration::from_millis(200);

/// A thread that drains the engine on every `WentOnline` transition.
///
/// With a probe, the worker also polls connectivity every interval, so it
/// produces the transitions it reacts to.
pub struct SyncWorker {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SyncWorker {
    /// Starts a worker that only reacts to transitions.
    pub fn spawn<R>(engine: Arc<SyncEngine<R>>) -> Self
    where
        R: RemoteAuthority + 'static,
    {
        Self::start(engine, None, IDLE_TICK)
    }

    /// Starts a worker that polls `probe` every `interval`.
    pub fn spawn_with_probe<R>(
        engine: Arc<SyncEngine<R>>,
        probe: Arc<dyn ConnectivityProbe>,
        interval: Duration,
    ) -> Self
    where
        R: RemoteAuthority + 'static,
    {
        Self::start(engine, Some(probe), interval)
    }

    fn start<R>(
        engine: Arc<SyncEngine<R>>,
        probe: Option<Arc<dyn ConnectivityProbe>>,
        interval: Duration,
    ) -> Self
    where
        R: RemoteAuthority + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let events = engine.monitor().subscribe();
        let flag = Arc::clone(&stop);

        let handle = std::thread::spawn(move || {
            tracing::debug!("sync worker started");
            while !flag.load(Ordering::SeqCst) {
                if let Some(probe) = &probe {
                    engine.monitor().poll(probe.as_ref());
                }

                match events.recv_timeout(interval) {
                    Ok(Transition::WentOnline) => {
                        if let Err(e) = engine.drain_all() {
                            tracing::error!(error = %e, "background drain failed");
                        }
                    }
                    Ok(Transition::WentOffline) | Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            tracing::debug!("sync worker stopped");
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Stops the worker and waits for it to finish its current pass.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("sync worker panicked");
            }
        }
    }
}

impl Drop for SyncWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for SyncWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncWorker")
            .field("running", &self.handle.is_some())
            .finish()
    }
}
