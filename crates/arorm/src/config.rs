//! Connection and executor configuration.

use crate::dialect::Dialect;
use crate::error::OrmResult;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where and how to connect.
///
/// The dialect is derived from the DSN scheme: `sqlite::memory:`,
/// `sqlite:/var/db/app.db`, `pgsql:host=localhost;dbname=app`,
/// `postgresql://user@localhost/app` or `mysql:host=localhost;dbname=app`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub dsn: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Reuse the connection across instance lookups instead of reconnecting.
    #[serde(default)]
    pub persistent: bool,
}

impl ConnectionConfig {
    pub fn new(dsn: impl Into<String>) -> Self {
        Self {
            dsn: dsn.into(),
            ..Self::default()
        }
    }

    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    /// Dialect named by the DSN scheme.
    pub fn dialect(&self) -> OrmResult<Dialect> {
        Dialect::from_dsn(&self.dsn)
    }

    /// The DSN with its scheme prefix removed.
    pub fn dsn_body(&self) -> &str {
        self.dsn
            .split_once(':')
            .map_or(self.dsn.as_str(), |(_, rest)| rest)
    }
}

/// Size of the per-connection prepared statement cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementCacheConfig {
    pub enabled: bool,
    pub capacity: usize,
}

impl Default for StatementCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 64,
        }
    }
}

/// Configuration for [`Database`](crate::Database).
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Keep an in-memory log of executed statements.
    pub log_queries: bool,
    /// Prepared statement cache.
    pub statement_cache: StatementCacheConfig,
    /// Maximum age of cached SELECT results; `None` disables the result cache.
    pub cache_results: Option<Duration>,
    /// Statements slower than this are logged at WARN.
    pub slow_query_threshold: Option<Duration>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            log_queries: false,
            statement_cache: StatementCacheConfig::default(),
            cache_results: None,
            slow_query_threshold: None,
        }
    }
}

impl DatabaseConfig {
    /// No query log, no result cache, 64 cached statements.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable the in-memory query log.
    pub fn with_logging(mut self) -> Self {
        self.log_queries = true;
        self
    }

    /// Keep up to `capacity` prepared statements per connection; 0 turns the cache off.
    pub fn statement_cache(mut self, capacity: usize) -> Self {
        self.statement_cache = StatementCacheConfig {
            enabled: capacity > 0,
            capacity,
        };
        self
    }

    pub fn no_statement_cache(mut self) -> Self {
        self.statement_cache.enabled = false;
        self
    }

    /// Cache SELECT results for at most `max_age`.
    pub fn cache_results(mut self, max_age: Duration) -> Self {
        self.cache_results = Some(max_age);
        self
    }

    /// Disable the result cache.
    pub fn no_result_cache(mut self) -> Self {
        self.cache_results = None;
        self
    }

    pub fn slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = Some(threshold);
        self
    }
}
