//! Server execution logic.

use std::{future::Future, sync::Arc, time::Duration};

use tokio::{net::TcpListener, task::JoinSet};
use tokio_util::sync::CancellationToken;

use crate::{
    config::ServerConfig,
    usecase::{ConnectParticipantUseCase, DisconnectParticipantUseCase, SendMessageUseCase},
};

use super::{ServerError, handler::handle_connection, signal::shutdown_signal, state::AppState};

/// Pause after a failed accept so a persistent error (e.g. fd exhaustion) does not spin
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// TCP chat relay server
///
/// This struct encapsulates the server configuration and provides methods to run the server.
///
/// # Example
///
/// ```ignore
/// let server = Server::new(
///     ServerConfig::default(),
///     connect_participant_usecase,
///     send_message_usecase,
///     disconnect_participant_usecase,
/// );
/// server.run().await?;
/// ```
pub struct Server {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl Server {
    /// Create a new Server instance
    ///
    /// # Arguments
    ///
    /// * `config` - Bind address and connection limits
    /// * `connect_participant_usecase` - UseCase for the handshake
    /// * `send_message_usecase` - UseCase for relaying inbound lines
    /// * `disconnect_participant_usecase` - UseCase for teardown
    pub fn new(
        config: ServerConfig,
        connect_participant_usecase: Arc<ConnectParticipantUseCase>,
        send_message_usecase: Arc<SendMessageUseCase>,
        disconnect_participant_usecase: Arc<DisconnectParticipantUseCase>,
    ) -> Self {
        let state = Arc::new(AppState {
            connect_participant_usecase,
            send_message_usecase,
            disconnect_participant_usecase,
            max_line_length: config.max_line_length,
            outbound_queue_capacity: config.outbound_queue_capacity,
        });
        Self { config, state }
    }

    /// Bind the configured address and serve until Ctrl+C / SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the configured address.
    pub async fn run(self) -> Result<(), ServerError> {
        let bind_addr = self.config.bind_addr();
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: bind_addr.clone(),
                source,
            })?;

        tracing::info!("Chat relay listening on {}", listener.local_addr()?);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, shutdown_signal()).await;

        tracing::info!("Server shutdown complete");

        Ok(())
    }

    /// Accept connections on `listener` until `shutdown` resolves.
    ///
    /// Each accepted connection gets its own handler task. On shutdown the
    /// listener is closed, every live handler is told to stop reading and
    /// tears down as if its peer had hung up, and handlers still running
    /// after the grace period are aborted.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F)
    where
        F: Future<Output = ()> + Send,
    {
        let stop = CancellationToken::new();
        let mut handlers = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        handlers.spawn(handle_connection(
                            stream,
                            peer,
                            self.state.clone(),
                            stop.child_token(),
                        ));
                    }
                    Err(e) => {
                        tracing::warn!("Failed to accept connection: {}", e);
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                },
                Some(finished) = handlers.join_next(), if !handlers.is_empty() => {
                    if let Err(e) = finished {
                        tracing::error!("Connection handler failed: {}", e);
                    }
                }
            }
        }

        drop(listener);
        stop.cancel();
        tracing::info!(
            "Stopped accepting; waiting for {} connection(s) to close",
            handlers.len()
        );

        let drained = tokio::time::timeout(self.config.shutdown_grace, async {
            while let Some(finished) = handlers.join_next().await {
                if let Err(e) = finished {
                    tracing::error!("Connection handler failed: {}", e);
                }
            }
        })
        .await;
        if drained.is_err() {
            tracing::warn!(
                "{} connection(s) still open after {:?}, aborting",
                handlers.len(),
                self.config.shutdown_grace
            );
            handlers.shutdown().await;
        }
    }
}
