//! Axum server for the metacache HTTP API.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use metacache_core::app::AppContext;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::handlers::AppState;
use super::routes::create_router;

/// HTTP API server
pub struct HttpServer {
    listen_addr: String,
    ctx: Arc<AppContext>,
}

impl HttpServer {
    pub fn new(listen_addr: String, ctx: Arc<AppContext>) -> Self {
        Self { listen_addr, ctx }
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn run<S>(&self, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = self
            .listen_addr
            .parse()
            .with_context(|| format!("invalid HTTP listen address {:?}", self.listen_addr))?;

        let app = create_router(AppState {
            ctx: self.ctx.clone(),
        })
        .layer(TraceLayer::new_for_http());

        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind HTTP server to {addr}"))?;

        info!(
            workers = self.ctx.scheduler().pool_size(),
            "HTTP API listening on http://{}", addr
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                info!("HTTP server shutting down");
            })
            .await
            .context("HTTP server error")?;

        Ok(())
    }
}
