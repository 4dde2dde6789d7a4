//! Watch command implementation.

use crate::error::CliError;
use outbox_sync_engine::{
    Client, ConnectivityProbe, HttpRemote, SyncConfig, SyncWorker, Transition,
};
use std::sync::Arc;

/// Runs until the process is stopped, replaying queued changes each time
/// the authority becomes reachable.
pub fn run(client: Client<HttpRemote>, config: &SyncConfig) -> Result<(), CliError> {
    let probe: Arc<dyn ConnectivityProbe> = Arc::new(HttpRemote::new(config)?);
    let events = client.monitor().subscribe();
    let _worker =
        SyncWorker::spawn_with_probe(Arc::clone(client.engine()), probe, config.poll_interval);

    tracing::info!(
        remote = %config.remote_url,
        interval_ms = config.poll_interval.as_millis() as u64,
        pending = client.engine().pending_len(),
        "watching for connectivity changes"
    );

    for transition in events {
        match transition {
            Transition::WentOnline => tracing::info!("authority reachable, replaying"),
            Transition::WentOffline => tracing::warn!("authority unreachable, changes are queued"),
        }
    }
    Ok(())
}
