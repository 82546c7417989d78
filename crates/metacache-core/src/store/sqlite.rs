//! SQLite-backed metadata store (sqlx).
//!
//! One table keyed by `normalized_url` with a unique index that the database
//! enforces, so concurrent upserts of one key can never produce two rows.
//! The integer row id stays internal.

use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Connection, Pool, Row, Sqlite};

use crate::config::ServiceConfig;
use crate::error::{MetadataError, MetadataResult};
use crate::record::MetadataRecord;
use crate::retry::RetryPolicy;

use super::connection::{ConnectionState, Connector, ManagedConnection};
use super::MetadataStore;

/// How long a single connect attempt may wait for a pooled connection.
const ACQUIRE_TIMEOUT: Duration = Duration::from_millis(2500);

/// Longest accepted table name.
const MAX_TABLE_NAME_LEN: usize = 64;

/// Everything needed to open the store.
#[derive(Debug, Clone)]
pub struct SqliteStoreSettings {
    /// sqlx connection string, e.g. `sqlite:///var/lib/metacache/metadata.db`.
    pub database_url: String,
    pub table_name: String,
    pub max_connections: u32,
    pub connect_policy: RetryPolicy,
}

/// Opens a pool, pings it and ensures the schema exists.
pub struct SqliteConnector {
    options: SqliteConnectOptions,
    max_connections: u32,
    create_table_sql: String,
    create_index_sql: String,
}

#[async_trait]
impl Connector for SqliteConnector {
    type Handle = Pool<Sqlite>;

    async fn connect(&self) -> anyhow::Result<Pool<Sqlite>> {
        let pool = SqlitePoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_with(self.options.clone())
            .await
            .context("open sqlite pool")?;

        let mut conn = pool.acquire().await.context("acquire connection")?;
        conn.ping().await.context("ping")?;
        drop(conn);

        sqlx::query(&self.create_table_sql)
            .execute(&pool)
            .await
            .context("create metadata table")?;
        sqlx::query(&self.create_index_sql)
            .execute(&pool)
            .await
            .context("create unique index on normalized_url")?;

        Ok(pool)
    }
}

/// Metadata store persisted in SQLite.
pub struct SqliteStore {
    conn: ManagedConnection<SqliteConnector>,
    select_sql: String,
    upsert_sql: String,
}

impl SqliteStore {
    /// Prepares the store. Does not touch the database; the first operation connects.
    pub fn new(settings: SqliteStoreSettings) -> MetadataResult<Self> {
        validate_table_name(&settings.table_name)?;
        let table = &settings.table_name;

        if !settings.database_url.starts_with("sqlite:") {
            return Err(MetadataError::Config(format!(
                "database url '{}' must use the sqlite: scheme",
                settings.database_url
            )));
        }

        let options = SqliteConnectOptions::from_str(&settings.database_url)
            .map_err(|e| {
                MetadataError::Config(format!(
                    "invalid database url '{}': {e}",
                    settings.database_url
                ))
            })?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            // Concurrent writers wait instead of failing with "database is locked".
            .busy_timeout(Duration::from_secs(5));

        let connector = SqliteConnector {
            options,
            max_connections: settings.max_connections.max(1),
            create_table_sql: format!(
                r#"
                CREATE TABLE IF NOT EXISTS {table} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    normalized_url TEXT NOT NULL,
                    original_url TEXT NOT NULL,
                    headers_json TEXT NOT NULL,
                    cookies_json TEXT NOT NULL,
                    page_source TEXT NOT NULL,
                    fetched_at TEXT NOT NULL
                )
                "#
            ),
            create_index_sql: format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS {table}_normalized_url_key ON {table} (normalized_url)"
            ),
        };

        Ok(Self {
            conn: ManagedConnection::new(connector, settings.connect_policy),
            select_sql: format!(
                r#"
                SELECT normalized_url, original_url, headers_json, cookies_json,
                       page_source, fetched_at
                FROM {table}
                WHERE normalized_url = ?1
                "#
            ),
            upsert_sql: format!(
                r#"
                INSERT INTO {table} (
                    normalized_url, original_url, headers_json, cookies_json,
                    page_source, fetched_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT (normalized_url) DO UPDATE SET
                    original_url = excluded.original_url,
                    headers_json = excluded.headers_json,
                    cookies_json = excluded.cookies_json,
                    page_source = excluded.page_source,
                    fetched_at = excluded.fetched_at
                "#
            ),
        })
    }

    /// Settings derived from the service configuration.
    pub fn from_config(cfg: &ServiceConfig) -> anyhow::Result<Self> {
        let workers = u32::try_from(cfg.background_workers)
            .context("background_workers does not fit a connection pool size")?;
        let settings = SqliteStoreSettings {
            database_url: cfg.resolved_database_url()?,
            table_name: cfg.table_name.clone(),
            // Room for request-path reads next to every background writer.
            max_connections: workers.saturating_add(4),
            connect_policy: cfg.store_connect_policy(),
        };
        Ok(Self::new(settings)?)
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.conn.state()
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn get(&self, key: &str) -> MetadataResult<Option<MetadataRecord>> {
        let sql = self.select_sql.as_str();
        let row = self
            .conn
            .run("get", |pool| async move {
                sqlx::query(sql).bind(key).fetch_optional(&pool).await
            })
            .await?;

        row.as_ref().map(decode_row).transpose()
    }

    async fn upsert(&self, key: &str, record: MetadataRecord) -> MetadataResult<MetadataRecord> {
        let mut stored = record;
        // The store's key is authoritative for the persisted record.
        stored.normalized_url = key.to_string();

        let headers_json =
            serde_json::to_string(&stored.headers).map_err(|e| MetadataError::store("encode", e))?;
        let cookies_json =
            serde_json::to_string(&stored.cookies).map_err(|e| MetadataError::store("encode", e))?;
        let fetched_at = stored.fetched_at.to_rfc3339_opts(SecondsFormat::Nanos, true);

        let sql = self.upsert_sql.as_str();
        let record = &stored;
        let (headers_json, cookies_json, fetched_at) = (&headers_json, &cookies_json, &fetched_at);
        self.conn
            .run("upsert", |pool| async move {
                sqlx::query(sql)
                    .bind(key)
                    .bind(&record.original_url)
                    .bind(headers_json)
                    .bind(cookies_json)
                    .bind(&record.page_source)
                    .bind(fetched_at)
                    .execute(&pool)
                    .await
            })
            .await?;

        tracing::debug!(key, "metadata record upserted");
        Ok(stored)
    }
}

fn decode_row(row: &SqliteRow) -> MetadataResult<MetadataRecord> {
    let decode = |e: sqlx::Error| MetadataError::store("decode", e);

    let headers_json: String = row.try_get("headers_json").map_err(decode)?;
    let cookies_json: String = row.try_get("cookies_json").map_err(decode)?;
    let fetched_at: String = row.try_get("fetched_at").map_err(decode)?;

    Ok(MetadataRecord {
        original_url: row.try_get("original_url").map_err(decode)?,
        normalized_url: row.try_get("normalized_url").map_err(decode)?,
        headers: serde_json::from_str(&headers_json).map_err(|e| MetadataError::store("decode", e))?,
        cookies: serde_json::from_str(&cookies_json).map_err(|e| MetadataError::store("decode", e))?,
        page_source: row.try_get("page_source").map_err(decode)?,
        fetched_at: DateTime::parse_from_rfc3339(&fetched_at)
            .map_err(|e| MetadataError::store("decode", e))?
            .with_timezone(&Utc),
    })
}

/// Table names are spliced into SQL, so only plain identifiers are accepted.
fn validate_table_name(name: &str) -> MetadataResult<()> {
    let valid = !name.is_empty()
        && name.len() <= MAX_TABLE_NAME_LEN
        && name.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(MetadataError::Config(format!(
            "table name '{name}' must be an identifier of letters, digits and underscores"
        )))
    }
}
