//! HTTP server: measurement WebSocket, status API, optional static files

use axum::routing::get;
use axum::Router;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::config::ServerConfig;
use crate::error::Result;
use crate::hub::Hub;
use crate::sampler::StateHandle;
use crate::web::{handlers, websocket};

/// State shared by all request handlers
pub struct AppState {
    pub hub: Arc<Hub>,
    pub sampler_state: StateHandle,
    pub started_at: Instant,
    /// Outbound slot size for each WebSocket subscriber
    pub outbound_capacity: usize,
}

/// Build the router. Kept separate from binding so tests can drive it
/// without a socket.
pub fn build_router(state: Arc<AppState>, static_dir: Option<&Path>) -> Router {
    let mut router = Router::new()
        .route("/sde", get(websocket::ws_handler))
        .route("/api/status", get(handlers::get_status));

    if let Some(dir) = static_dir {
        router = router.nest_service("/static", ServeDir::new(dir));
    }

    router
        .fallback(handlers::not_found)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Web server for subscribers and operators
pub struct WebServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl WebServer {
    pub fn new(config: ServerConfig, hub: Arc<Hub>, sampler_state: StateHandle) -> Self {
        let state = Arc::new(AppState {
            hub,
            sampler_state,
            started_at: Instant::now(),
            outbound_capacity: config.outbound_capacity,
        });
        Self { config, state }
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone(), self.config.static_dir.as_deref())
    }

    /// Bind the configured address
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = format!("{}:{}", self.config.bind_address, self.config.http_port);
        let listener = TcpListener::bind(&addr).await?;
        tracing::info!("Listening on http://{}", listener.local_addr()?);
        Ok(listener)
    }

    /// Serve until `shutdown` resolves
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(listener, self.router().into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }
}
