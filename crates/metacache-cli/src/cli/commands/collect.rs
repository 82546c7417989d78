//! `metacache collect <url>` – fetch now, store, print the stored record.

use anyhow::Result;
use metacache_core::app::AppContext;
use metacache_core::config::ServiceConfig;

pub async fn run_collect(cfg: &ServiceConfig, url: &str) -> Result<()> {
    let ctx = AppContext::from_config(cfg)?;
    let record = ctx.service().collect_and_store(url).await?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
