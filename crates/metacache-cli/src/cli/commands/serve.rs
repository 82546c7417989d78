//! `metacache serve` – run the HTTP API until Ctrl-C.

use std::sync::Arc;

use anyhow::Result;
use metacache_core::app::AppContext;
use metacache_core::config::ServiceConfig;
use metacache_core::store::MemoryStore;

use crate::http::HttpServer;

pub async fn run_serve(cfg: &ServiceConfig, listen: Option<String>, memory: bool) -> Result<()> {
    let ctx = if memory {
        tracing::warn!("using in-memory store; records are lost on exit");
        AppContext::with_store(cfg, Arc::new(MemoryStore::new()))
    } else {
        AppContext::from_config(cfg)?
    };

    let listen_addr = listen.unwrap_or_else(|| cfg.listen_addr.clone());
    let server = HttpServer::new(listen_addr, Arc::new(ctx));
    server
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for Ctrl-C: {e}");
            }
        })
        .await
}
