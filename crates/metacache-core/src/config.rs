use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::retry::RetryPolicy;

pub const ENV_DATABASE_URL: &str = "METACACHE_DATABASE_URL";
pub const ENV_TABLE: &str = "METACACHE_TABLE";
pub const ENV_HTTP_TIMEOUT: &str = "METACACHE_HTTP_TIMEOUT_SECONDS";
pub const ENV_HTTP_MAX_BODY: &str = "METACACHE_HTTP_MAX_BODY_BYTES";
pub const ENV_BACKGROUND_WORKERS: &str = "METACACHE_BACKGROUND_WORKERS";
pub const ENV_CONNECT_RETRIES: &str = "METACACHE_STORE_CONNECT_RETRIES";
pub const ENV_CONNECT_RETRY_DELAY: &str = "METACACHE_STORE_CONNECT_RETRY_DELAY_SECONDS";
pub const ENV_LISTEN_ADDR: &str = "METACACHE_LISTEN_ADDR";

const MAX_HTTP_TIMEOUT_SECS: f64 = 3600.0;
const MAX_RETRY_DELAY_SECS: f64 = 3600.0;
const MAX_BACKGROUND_WORKERS: usize = 1024;

/// Service configuration loaded from `~/.config/metacache/config.toml`,
/// then overridden by `METACACHE_*` environment variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// SQLite URL of the record store. None = `metadata.db` under the XDG state dir.
    pub database_url: Option<String>,
    /// Table holding the metadata records.
    pub table_name: String,
    /// Total time allowed for one page fetch, in seconds.
    pub http_timeout_secs: f64,
    /// Page bodies are cut off after this many bytes.
    pub http_max_body_bytes: usize,
    /// Number of background collections allowed to run at once.
    pub background_workers: usize,
    /// Connection attempts before the store is reported unavailable.
    pub store_connect_retries: u32,
    /// Fixed pause between connection attempts, in seconds.
    pub store_connect_retry_delay_secs: f64,
    /// Address the HTTP server binds to.
    pub listen_addr: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            table_name: "metadata".to_string(),
            http_timeout_secs: 10.0,
            http_max_body_bytes: 1_000_000,
            background_workers: 4,
            store_connect_retries: 10,
            store_connect_retry_delay_secs: 1.5,
            listen_addr: "127.0.0.1:8000".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Applies `METACACHE_*` overrides read through `lookup`, then validates.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_DATABASE_URL).filter(|v| !v.trim().is_empty()) {
            self.database_url = Some(url.trim().to_string());
        }
        if let Some(table) = lookup(ENV_TABLE) {
            self.table_name = table.trim().to_string();
        }
        if let Some(addr) = lookup(ENV_LISTEN_ADDR) {
            self.listen_addr = addr.trim().to_string();
        }
        override_parsed(&lookup, ENV_HTTP_TIMEOUT, &mut self.http_timeout_secs)?;
        override_parsed(&lookup, ENV_HTTP_MAX_BODY, &mut self.http_max_body_bytes)?;
        override_parsed(&lookup, ENV_BACKGROUND_WORKERS, &mut self.background_workers)?;
        override_parsed(&lookup, ENV_CONNECT_RETRIES, &mut self.store_connect_retries)?;
        override_parsed(
            &lookup,
            ENV_CONNECT_RETRY_DELAY,
            &mut self.store_connect_retry_delay_secs,
        )?;
        self.validate()
    }

    /// Rejects values that would make the service misbehave at runtime.
    pub fn validate(&self) -> Result<()> {
        if self.table_name.is_empty() {
            bail!("table_name must not be empty");
        }
        if !(self.http_timeout_secs > 0.0 && self.http_timeout_secs <= MAX_HTTP_TIMEOUT_SECS) {
            bail!("http_timeout_secs must be greater than 0 and at most {MAX_HTTP_TIMEOUT_SECS}");
        }
        if self.http_max_body_bytes == 0 {
            bail!("http_max_body_bytes must be at least 1");
        }
        if !(1..=MAX_BACKGROUND_WORKERS).contains(&self.background_workers) {
            bail!("background_workers must be between 1 and {MAX_BACKGROUND_WORKERS}");
        }
        if self.store_connect_retries == 0 {
            bail!("store_connect_retries must be at least 1");
        }
        if !(self.store_connect_retry_delay_secs >= 0.0
            && self.store_connect_retry_delay_secs <= MAX_RETRY_DELAY_SECS)
        {
            bail!("store_connect_retry_delay_secs must be between 0 and {MAX_RETRY_DELAY_SECS}");
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        bounded_secs(self.http_timeout_secs, MAX_HTTP_TIMEOUT_SECS)
    }

    pub fn store_connect_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.store_connect_retries,
            bounded_secs(self.store_connect_retry_delay_secs, MAX_RETRY_DELAY_SECS),
        )
    }

    /// The configured database URL, or the default file under the XDG state dir.
    pub fn resolved_database_url(&self) -> Result<String> {
        match &self.database_url {
            Some(url) => Ok(url.clone()),
            None => {
                let xdg_dirs = xdg::BaseDirectories::with_prefix("metacache")?;
                let path = xdg_dirs.place_state_file("metadata.db")?;
                Ok(path_to_sqlite_uri(&path))
            }
        }
    }
}

/// Seconds as a `Duration`, capped at `max`; negative or NaN input yields zero.
fn bounded_secs(secs: f64, max: f64) -> Duration {
    Duration::try_from_secs_f64(secs.min(max)).unwrap_or(Duration::ZERO)
}

fn override_parsed<T, F>(lookup: &F, name: &str, target: &mut T) -> Result<()>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(name) {
        *target = raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("invalid value for {name}: {raw:?} ({e})"))?;
    }
    Ok(())
}

/// Percent-encode the characters SQLite URIs treat specially.
fn path_to_sqlite_uri(path: &Path) -> String {
    let s = path.to_string_lossy();
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' => out.push_str("%25"),
            ' ' => out.push_str("%20"),
            '#' => out.push_str("%23"),
            '?' => out.push_str("%3F"),
            '&' => out.push_str("%26"),
            c => out.push(c),
        }
    }
    format!("sqlite://{}", out)
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("metacache")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists,
/// then apply environment overrides.
pub fn load_or_init() -> Result<ServiceConfig> {
    let mut cfg = load_file_or_init(&config_path()?)?;
    cfg.apply_env_overrides(|name| std::env::var(name).ok())?;
    Ok(cfg)
}

/// Read `path`, writing the defaults there first if it does not exist.
pub fn load_file_or_init(path: &Path) -> Result<ServiceConfig> {
    if !path.exists() {
        let default_cfg = ServiceConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path)?;
    let cfg: ServiceConfig = toml::from_str(&data)?;
    Ok(cfg)
}
