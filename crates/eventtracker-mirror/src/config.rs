//! Mirror database connection settings.

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

/// Default maximum number of pooled connections.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Connection settings for the mirror database.
#[derive(Clone)]
pub struct MirrorConfig {
    /// `postgres://user@host:port/database`
    pub url: String,
    /// Service access key; replaces the URL's password when set.
    pub access_key: Option<String>,
    /// Pool size.
    pub max_connections: u32,
    /// Time allowed to acquire a connection.
    pub connect_timeout: Duration,
}

impl std::fmt::Debug for MirrorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorConfig")
            .field("url", &self.url)
            .field("access_key", &self.access_key.as_ref().map(|_| "<redacted>"))
            .field("max_connections", &self.max_connections)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl MirrorConfig {
    /// Settings for `url` with default pool limits and no access key.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            access_key: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }

    /// Sets the access key.
    #[must_use]
    pub fn with_access_key(mut self, key: impl Into<String>) -> Self {
        self.access_key = Some(key.into());
        self
    }

    /// Sets the pool size.
    #[must_use]
    pub const fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Parses the URL and applies the access key.
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error::Configuration` if the URL is malformed.
    pub fn connect_options(&self) -> Result<PgConnectOptions, sqlx::Error> {
        let options: PgConnectOptions = self.url.parse()?;
        Ok(match &self.access_key {
            Some(key) if !key.is_empty() => options.password(key),
            _ => options,
        })
    }

    /// Opens a connection pool.
    ///
    /// # Errors
    ///
    /// Returns a `sqlx::Error` if the URL is malformed or the database is
    /// unreachable.
    pub async fn connect(&self) -> Result<PgPool, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.connect_timeout)
            .connect_with(self.connect_options()?)
            .await?;
        tracing::info!(
            max_connections = self.max_connections,
            "connected to mirror database"
        );
        Ok(pool)
    }
}
