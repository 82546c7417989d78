//! `metacache lookup <url>` – print the cached record, if any.

use anyhow::Result;
use metacache_core::app::AppContext;
use metacache_core::config::ServiceConfig;

pub async fn run_lookup(cfg: &ServiceConfig, url: &str) -> Result<()> {
    let ctx = AppContext::from_config(cfg)?;
    match ctx.service().lookup(url).await? {
        Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
        None => println!("No cached metadata for {url}"),
    }
    Ok(())
}
