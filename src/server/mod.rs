//! Server module
//!
//! Handles TCP connections. This module is responsible for accepting
//! connections and delegating command processing to the dispatcher.

mod connection;

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

pub use connection::Connection;

/// Run the server
///
/// Rebuilds the store from the AOF, starts the background sync and accepts
/// connections on `config.listen_addr` until `shutdown` resolves. The AOF is
/// closed before returning.
pub async fn run<F>(config: &Config, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let dispatcher = Arc::new(Dispatcher::with_aof(&config.aof)?);
    let sync_task = dispatcher.aof().and_then(|aof| aof.spawn_sync_task());

    let listener = TcpListener::bind(&config.listen_addr).await?;
    info!("FerrumKV RESP server listening on {}", listener.local_addr()?);

    let served = serve(listener, dispatcher.clone(), shutdown).await;

    if let Some(aof) = dispatcher.aof() {
        aof.close()?;
    }
    if let Some(task) = sync_task {
        if let Err(e) = task.await {
            error!("AOF sync task ended abnormally: {}", e);
        }
    }

    served
}

/// Accept connections on `listener` until `shutdown` resolves
///
/// Each connection runs in its own task; a failing connection only ends
/// itself.
pub async fn serve<F>(listener: TcpListener, dispatcher: Arc<Dispatcher>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested, no longer accepting connections");
                return Ok(());
            }
            accepted = listener.accept() => {
                let (socket, addr) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        continue;
                    }
                };
                info!("New RESP connection from {}", addr);

                // Clone the dispatcher Arc for this connection
                let dispatcher = dispatcher.clone();

                // Spawn a new task to handle this connection
                tokio::spawn(async move {
                    let mut connection = Connection::new(socket);

                    if let Err(e) = connection.handle(dispatcher).await {
                        error!("Connection error from {}: {}", addr, e);
                    }

                    info!("Connection closed: {}", addr);
                });
            }
        }
    }
}
