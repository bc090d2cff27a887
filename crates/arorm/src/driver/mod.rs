//! Database driver abstraction.
//!
//! A [`Driver`] is a single logical connection: it prepares SQL already
//! rewritten for its [`Dialect`], runs statements with positional parameters
//! and reports the last generated id. Literal quoting belongs to the
//! [`Dialect`] so that IN lists and [`Database::escape`](crate::Database::escape) agree. [`Database`](crate::Database) layers
//! logging, statement caching and result caching on top.

use crate::config::ConnectionConfig;
use crate::dialect::Dialect;
use crate::error::OrmResult;
use crate::row::Row;
use crate::value::Value;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDriver;

#[cfg(feature = "postgres")]
pub use postgres::PgDriver;

/// A connected database.
pub trait Driver {
    /// Handle to a prepared statement.
    type Statement: Clone;

    fn dialect(&self) -> Dialect;

    /// Prepare dialect-ready SQL.
    fn prepare(&self, sql: &str) -> OrmResult<Self::Statement>;

    /// Run a statement that returns rows.
    fn query(&self, stmt: &Self::Statement, params: &[Value]) -> OrmResult<Vec<Row>>;

    /// Run a statement and return the affected row count.
    fn execute(&self, stmt: &Self::Statement, params: &[Value]) -> OrmResult<u64>;

    /// Id generated by the most recent INSERT on this connection.
    fn last_insert_id(&self) -> OrmResult<Value>;

    /// Run one or more statements without parameters (transaction control).
    fn batch_execute(&self, sql: &str) -> OrmResult<()>;
}

/// Drivers that can open a connection from a [`ConnectionConfig`].
pub trait Connect: Driver + Sized {
    fn connect(config: &ConnectionConfig) -> OrmResult<Self>;
}
