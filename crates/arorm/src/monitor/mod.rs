//! Statement monitoring for the executor.
//!
//! Every statement run through [`Database`](crate::Database) produces a
//! [`QueryContext`] and a [`QueryResult`] that are handed to the configured
//! [`QueryMonitor`]s:
//! - [`TracingMonitor`] emits `tracing` events on target `arorm.sql`
//! - [`StatsMonitor`] aggregates counters per statement type
//! - [`CompositeMonitor`] fans out to several monitors
//!
//! When `log_queries` is enabled the executor also keeps a [`QueryLogEntry`]
//! per statement.

mod monitors;
mod types;

#[cfg(test)]
mod tests;

pub use monitors::{CompositeMonitor, NoopMonitor, QueryStats, StatsMonitor, TracingMonitor};
pub use types::{QueryContext, QueryMonitor, QueryResult, QueryType};

use crate::value::Value;
use std::time::Duration;

/// One executed (or cache-served) statement in the query log.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryLogEntry {
    /// SQL as sent to the driver.
    pub sql: String,
    pub params: Vec<Value>,
    pub elapsed: Duration,
    /// Served from the result cache.
    pub cached: bool,
}

pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}
