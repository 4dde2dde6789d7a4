//! Serving the router.

use crate::config::AuthorityConfig;
use crate::error::{AuthorityError, AuthorityResult};
use crate::handler::router;
use crate::store::Authority;
use std::net::SocketAddr;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Opens the table named by `config`.
///
/// # Errors
///
/// Returns an error if the users file cannot be read.
pub fn open_authority(config: &AuthorityConfig) -> AuthorityResult<Arc<Authority>> {
    let authority = match &config.db_path {
        Some(path) => Authority::open(path)?,
        None => Authority::in_memory(),
    };
    Ok(Arc::new(authority))
}

/// Serves `authority` on `config.bind_addr` until Ctrl+C.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(config: &AuthorityConfig, authority: Arc<Authority>) -> AuthorityResult<()> {
    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "authority listening");

    axum::serve(listener, router(authority))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("authority stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

/// An authority served from a background thread with its own runtime.
///
/// Dropping it shuts the server down.
#[derive(Debug)]
pub struct RunningAuthority {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl RunningAuthority {
    /// Starts serving `authority` on `addr` (port 0 picks a free port).
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot start or the address cannot
    /// be bound.
    pub fn start(authority: Arc<Authority>, addr: SocketAddr) -> AuthorityResult<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let (ready_tx, ready_rx) = mpsc::channel::<std::io::Result<SocketAddr>>();

        let thread = std::thread::spawn(move || {
            runtime.block_on(async move {
                let listener = match TcpListener::bind(addr).await {
                    Ok(listener) => listener,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(listener.local_addr());

                let shutdown = async {
                    let _ = shutdown_rx.await;
                };
                if let Err(e) = axum::serve(listener, router(authority))
                    .with_graceful_shutdown(shutdown)
                    .await
                {
                    tracing::error!(error = %e, "authority server failed");
                }
            });
        });

        let addr = ready_rx
            .recv()
            .map_err(|_| AuthorityError::Internal("server thread exited before binding".into()))??;
        tracing::debug!(%addr, "background authority started");

        Ok(Self {
            addr,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    /// Returns the bound address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the base URL, e.g. `http://127.0.0.1:40123`.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stops the server and waits for it.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("authority server thread panicked");
            }
        }
    }
}

impl Drop for RunningAuthority {
    fn drop(&mut self) {
        self.shutdown();
    }
}
