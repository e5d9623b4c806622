//! SQLite sink
//!
//! Each reading becomes one row: `taken_at` plus one REAL column per
//! configured field, holding the field's scaled value. The INSERT text is
//! built on first use and reused; sqlx keeps the prepared statement cached
//! per connection.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::error::{Result, SinkError};
use crate::sink::{
    field_values, validate_column, validate_identifier, MeasurementSink, Reading, SinkField,
};

/// Where and how readings are stored
#[derive(Debug, Clone)]
pub struct SqliteSinkConfig {
    pub path: PathBuf,
    pub table: String,
    pub fields: Vec<SinkField>,
    /// Issue `CREATE TABLE IF NOT EXISTS` before the first insert
    pub create_table: bool,
}

impl SqliteSinkConfig {
    pub fn new(path: impl Into<PathBuf>, table: impl Into<String>, fields: Vec<SinkField>) -> Self {
        Self {
            path: path.into(),
            table: table.into(),
            fields,
            create_table: true,
        }
    }

    /// Check the table and every column name are plain identifiers and no
    /// field reuses a reserved column
    pub fn validate(&self) -> Result<()> {
        validate_identifier(&self.table)?;
        if self.fields.is_empty() {
            return Err(SinkError::NoFields(self.table.clone()));
        }
        for field in &self.fields {
            validate_column(&field.name)?;
        }
        Ok(())
    }
}

pub struct SqliteSink {
    pool: SqlitePool,
    config: SqliteSinkConfig,
    insert_sql: OnceLock<String>,
    schema_ready: OnceCell<()>,
}

impl std::fmt::Debug for SqliteSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSink")
            .field("path", &self.config.path)
            .field("table", &self.config.table)
            .field("fields", &self.config.fields.len())
            .finish()
    }
}

impl SqliteSink {
    /// Open (creating if missing) the database at `config.path`
    pub async fn connect(config: SqliteSinkConfig) -> Result<Self> {
        config.validate()?;

        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .create_if_missing(true);

        // One writer per poll loop
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        info!("SQLite sink connected: {}", config.path.display());
        Ok(Self::from_pool(pool, config))
    }

    /// Sink over an existing pool; `config.path` is informational only
    pub fn from_pool(pool: SqlitePool, config: SqliteSinkConfig) -> Self {
        Self {
            pool,
            config,
            insert_sql: OnceLock::new(),
            schema_ready: OnceCell::new(),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    pub fn fields(&self) -> &[SinkField] {
        &self.config.fields
    }

    /// `INSERT INTO t (taken_at, a, b) VALUES (?, ?, ?)`
    pub fn insert_sql(&self) -> &str {
        self.insert_sql.get_or_init(|| {
            let names: Vec<&str> = self.config.fields.iter().map(|f| f.name.as_str()).collect();
            let placeholders = vec!["?"; names.len() + 1].join(", ");
            let sql = format!(
                "INSERT INTO {} (taken_at, {}) VALUES ({})",
                self.config.table,
                names.join(", "),
                placeholders
            );
            debug!("Sink insert statement: {}", sql);
            sql
        })
    }

    fn create_table_sql(&self) -> String {
        let columns: Vec<String> = self
            .config
            .fields
            .iter()
            .map(|f| format!("{} REAL", f.name))
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} (id INTEGER PRIMARY KEY AUTOINCREMENT, taken_at TEXT NOT NULL, {})",
            self.config.table,
            columns.join(", ")
        )
    }

    async fn ensure_schema(&self) -> Result<()> {
        if !self.config.create_table {
            return Ok(());
        }
        self.schema_ready
            .get_or_try_init(|| async {
                sqlx::query(&self.create_table_sql())
                    .execute(&self.pool)
                    .await?;
                info!("Sink table ready: {}", self.config.table);
                Ok::<(), SinkError>(())
            })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl MeasurementSink for SqliteSink {
    async fn store(&self, reading: &Reading) -> Result<()> {
        let values = field_values(&self.config.fields, reading)?;
        self.ensure_schema().await?;

        let mut query = sqlx::query(self.insert_sql()).bind(reading.taken_at);
        for value in values {
            query = query.bind(value);
        }
        if let Err(e) = query.execute(&self.pool).await {
            warn!("Writing reading to {} failed: {}", self.config.table, e);
            return Err(e.into());
        }
        debug!("Stored reading with {} fields", self.config.fields.len());
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        info!("SQLite sink closed: {}", self.config.path.display());
        Ok(())
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}
