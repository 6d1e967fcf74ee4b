// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Main server implementation

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;
use crate::{assets, proxy, session};
use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Livebridge proxy server
pub struct Server {
    state: AppState,
    app: Router,
}

impl Server {
    pub fn new(state: AppState) -> Self {
        let app = Self::build_app(state.clone());
        Self { state, app }
    }

    /// Bridge routes under the configured prefix, everything else proxied
    fn build_app(state: AppState) -> Router {
        let bridge_routes = Router::new()
            .route("/ws/reload", get(session::reload_socket))
            .route("/ws/message", get(session::message_socket))
            .route("/:name", get(assets::serve))
            .fallback(assets::not_found);

        Router::new()
            .nest(&state.config.base_path, bridge_routes)
            .fallback(proxy::forward)
            .with_state(state)
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
    }

    /// Bind the configured address without serving yet
    pub async fn bind(&self) -> ServerResult<TcpListener> {
        let addr = self.state.config.bind_addr();
        TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })
    }

    /// Serve on an already bound listener until the shutdown token fires.
    ///
    /// Open connections get the configured grace period to finish; after
    /// that they are dropped.
    pub async fn serve(self, listener: TcpListener) -> ServerResult<()> {
        let Server { state, app } = self;
        let local = listener
            .local_addr()
            .map_err(|e| ServerError::Internal(format!("Listener has no address: {e}")))?;
        info!(
            "Livebridge proxy on http://{} forwarding to {}",
            local,
            state.upstream.origin()
        );

        let grace = state.config.shutdown_grace();
        let graceful = state.shutdown.clone().cancelled_owned();
        let server = async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(graceful)
                .await
        };
        let deadline = async {
            state.shutdown.cancelled().await;
            tokio::time::sleep(grace).await;
        };

        tokio::select! {
            result = server => {
                result.map_err(|err| ServerError::Internal(format!("Server error: {err}")))?;
            }
            _ = deadline => {
                warn!(grace = ?grace, "Graceful shutdown timed out, dropping open connections");
            }
        }

        info!("Proxy server stopped");
        Ok(())
    }
}
