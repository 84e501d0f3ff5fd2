//! Server Implementation
//!
//! Starts the HTTP API and the push channel TCP server, then waits for
//! shutdown (ctrl-c or token cancellation).

use crate::core::{Config, ServerState};
use crate::message::PushServer;
use crate::utils::AppError;

pub struct Server {
    config: Config,
    state: Option<ServerState>,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: None,
        }
    }

    /// Create server with existing state (for tests that share the state)
    pub fn with_state(config: Config, state: ServerState) -> Self {
        Self {
            config,
            state: Some(state),
        }
    }

    pub async fn run(&self) -> Result<(), AppError> {
        let state = match &self.state {
            Some(s) => s.clone(),
            None => ServerState::initialize(&self.config),
        };

        // Push channel TCP server
        let push_server = PushServer::new(
            state.bus.clone(),
            state.config.clone(),
            state.shutdown_token.clone(),
        );
        tokio::spawn(async move {
            if let Err(e) = push_server.run().await {
                tracing::error!("Push server failed: {}", e);
            }
        });

        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        tracing::info!("Comanda server starting on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| AppError::internal(format!("Failed to bind HTTP server: {}", e)))?;

        let app = crate::api::router(state.clone());
        let shutdown_token = state.shutdown_token.clone();
        let shutdown = async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutting down...");
                }
                _ = shutdown_token.cancelled() => {}
            }
        };

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| AppError::internal(format!("HTTP server failed: {}", e)))?;

        // Stop the push server and all channels
        state.shutdown_token.cancel();

        Ok(())
    }
}
