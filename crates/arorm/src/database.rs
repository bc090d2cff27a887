//! Statement executor.
//!
//! [`Database`] wraps one [`Driver`] connection and adds what every statement
//! goes through: the dialect filter, the prepared statement cache, the SELECT
//! result cache, monitors and the in-memory query log.
//!
//! # Example
//!
//! ```
//! # #[cfg(feature = "sqlite")]
//! # fn main() -> arorm::OrmResult<()> {
//! use arorm::{Database, DatabaseConfig, Row, SqliteDriver};
//!
//! let db = Database::with_config(
//!     SqliteDriver::open_in_memory()?,
//!     DatabaseConfig::new().with_logging(),
//! );
//! db.exec("CREATE TABLE dorm (id INTEGER PRIMARY KEY, name TEXT)")?;
//!
//! let id = db.insert("dorm", &Row::new().with("name", "North Hall"))?;
//! let rows = db.fetch("SELECT * FROM \"dorm\" WHERE \"id\" = ?", &[id])?;
//! assert_eq!(rows[0].try_get::<String>("name")?, "North Hall");
//! assert_eq!(db.queries().len(), 3);
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "sqlite"))]
//! # fn main() {}
//! ```

use crate::builder::{DeleteBuilder, InsertBuilder, MutationBuilder, UpdateBuilder};
use crate::cache::{MemoryCache, ResultCache, cache_key};
use crate::condition::Condition;
use crate::config::{ConnectionConfig, DatabaseConfig};
use crate::dialect::Dialect;
use crate::driver::{Connect, Driver};
use crate::error::{OrmError, OrmResult};
use crate::monitor::{
    QueryContext, QueryLogEntry, QueryMonitor, QueryResult, QueryStats, QueryType, StatsMonitor,
    TracingMonitor,
};
use crate::registry::Registry;
use crate::row::{FromRow, Row};
use crate::statement_cache::StatementCache;
use crate::value::Value;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A single logical connection with logging and caching.
///
/// Not `Sync`: share it between threads by giving each thread its own
/// connection.
pub struct Database<D: Driver> {
    driver: D,
    config: DatabaseConfig,
    registry: Arc<Registry>,
    statement_cache: Option<RefCell<StatementCache<D::Statement>>>,
    result_cache: Option<Arc<dyn ResultCache>>,
    stats: Arc<StatsMonitor>,
    tracing: TracingMonitor,
    custom_monitor: Option<Arc<dyn QueryMonitor>>,
    queries: RefCell<Vec<QueryLogEntry>>,
    transaction_depth: Cell<u32>,
}

impl<D: Driver> std::fmt::Debug for Database<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("config", &self.config)
            .field("transaction_depth", &self.transaction_depth)
            .finish_non_exhaustive()
    }
}

impl<D: Driver> Database<D> {
    /// Wrap a connected driver with the default configuration.
    pub fn new(driver: D) -> Self {
        Self::with_config(driver, DatabaseConfig::default())
    }

    /// Wrap a connected driver.
    ///
    /// A [`MemoryCache`] is installed when `config.cache_results` is set.
    pub fn with_config(driver: D, config: DatabaseConfig) -> Self {
        let statement_cache = (config.statement_cache.enabled
            && config.statement_cache.capacity > 0)
            .then(|| RefCell::new(StatementCache::new(config.statement_cache.capacity)));

        let result_cache = config
            .cache_results
            .map(|_| Arc::new(MemoryCache::new()) as Arc<dyn ResultCache>);

        Self {
            driver,
            config,
            registry: Arc::new(Registry::new()),
            statement_cache,
            result_cache,
            stats: Arc::new(StatsMonitor::new()),
            tracing: TracingMonitor::new(),
            custom_monitor: None,
            queries: RefCell::new(Vec::new()),
            transaction_depth: Cell::new(0),
        }
    }

    /// Share a relationship registry with other connections.
    pub fn with_registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = registry;
        self
    }

    /// Cache SELECT results in `cache` for at most `max_age`.
    pub fn with_result_cache(mut self, cache: Arc<dyn ResultCache>, max_age: Duration) -> Self {
        self.result_cache = Some(cache);
        self.config.cache_results = Some(max_age);
        self
    }

    /// Add a custom query monitor.
    pub fn with_monitor<M: QueryMonitor + 'static>(mut self, monitor: M) -> Self {
        self.custom_monitor = Some(Arc::new(monitor));
        self
    }

    /// Add a custom query monitor from an `Arc`.
    pub fn with_monitor_arc(mut self, monitor: Arc<dyn QueryMonitor>) -> Self {
        self.custom_monitor = Some(monitor);
        self
    }

    /// Override how the tracing monitor renders SQL.
    pub fn with_tracing(mut self, tracing: TracingMonitor) -> Self {
        self.tracing = tracing;
        self
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn dialect(&self) -> Dialect {
        self.driver.dialect()
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Relationship registry shared by the entities of this connection.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Get current query statistics.
    pub fn stats(&self) -> QueryStats {
        self.stats.stats()
    }

    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    // ==================== Query log ====================

    /// Statements recorded since the last [`clear_queries`](Self::clear_queries).
    ///
    /// Empty unless `log_queries` is enabled.
    pub fn queries(&self) -> Vec<QueryLogEntry> {
        self.queries.borrow().clone()
    }

    pub fn clear_queries(&self) {
        self.queries.borrow_mut().clear();
    }

    /// Emit every logged statement as an INFO event.
    pub fn log_queries_summary(&self) {
        let queries = self.queries.borrow();
        for (i, entry) in queries.iter().enumerate() {
            tracing::info!(
                target: "arorm.sql",
                index = i,
                elapsed_us = entry.elapsed.as_micros() as u64,
                params = entry.params.len(),
                cached = entry.cached,
                sql = %entry.sql,
                "query log"
            );
        }
        let total: Duration = queries.iter().map(|entry| entry.elapsed).sum();
        tracing::info!(
            target: "arorm.sql",
            count = queries.len(),
            total_us = total.as_micros() as u64,
            "query log total"
        );
    }

    fn record(&self, sql: &str, params: &[Value], elapsed: Duration, cached: bool) {
        if self.config.log_queries {
            self.queries.borrow_mut().push(QueryLogEntry {
                sql: sql.to_string(),
                params: params.to_vec(),
                elapsed,
                cached,
            });
        }
    }

    fn report_result(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult) {
        self.stats.on_query_complete(ctx, duration, result);
        self.tracing.on_query_complete(ctx, duration, result);
        if let Some(monitor) = &self.custom_monitor {
            monitor.on_query_complete(ctx, duration, result);
        }

        if let Some(threshold) = self.config.slow_query_threshold {
            if duration > threshold {
                self.tracing.on_slow_query(ctx, duration);
                if let Some(monitor) = &self.custom_monitor {
                    monitor.on_slow_query(ctx, duration);
                }
            }
        }
    }

    fn report_cache(&self, ctx: &QueryContext, hit: bool) {
        if hit {
            self.stats.on_cache_hit(ctx);
            self.tracing.on_cache_hit(ctx);
            if let Some(monitor) = &self.custom_monitor {
                monitor.on_cache_hit(ctx);
            }
        } else {
            self.stats.on_cache_miss(ctx);
            if let Some(monitor) = &self.custom_monitor {
                monitor.on_cache_miss(ctx);
            }
        }
    }

    // ==================== Statements ====================

    /// Prepare `sql` (builder-style: `"ident"` quoting and `?` placeholders).
    ///
    /// The SQL is rewritten for the connected dialect first; the rewritten
    /// text keys the statement cache.
    pub fn prepare(&self, sql: &str) -> OrmResult<PreparedStatement<'_, D>> {
        let sql = self.dialect().filter(sql).into_owned();

        let cached = self
            .statement_cache
            .as_ref()
            .and_then(|cache| cache.borrow_mut().get(&sql));
        let stmt = match cached {
            Some(stmt) => stmt,
            None => {
                let stmt = self.driver.prepare(&sql)?;
                match &self.statement_cache {
                    Some(cache) => cache.borrow_mut().insert_if_absent(sql.clone(), stmt),
                    None => stmt,
                }
            }
        };

        Ok(PreparedStatement {
            db: self,
            query_type: QueryType::from_sql(&sql),
            yields_rows: QueryType::yields_rows(&sql),
            sql,
            stmt,
            params: Vec::new(),
            results: None,
            cached: false,
            cache_key: None,
            skip_cache: false,
            rows_affected: 0,
        })
    }

    /// Run a statement that returns rows.
    ///
    /// SELECT results may come from the result cache when it is on.
    pub fn fetch(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        let mut stmt = self.prepare(sql)?;
        stmt.execute(params)?;
        Ok(stmt.into_results())
    }

    /// Like [`fetch`](Self::fetch), but always reads through the driver.
    ///
    /// Entity loads and link checks use this so they see their own writes.
    pub fn fetch_uncached(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        let mut stmt = self.prepare(sql)?;
        stmt.skip_result_cache().execute(params)?;
        Ok(stmt.into_results())
    }

    /// Run a statement and map every row to `T`.
    pub fn fetch_as<T: FromRow>(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<T>> {
        self.fetch(sql, params)?.iter().map(T::from_row).collect()
    }

    /// First row of a statement, if any.
    pub fn fetch_optional(&self, sql: &str, params: &[Value]) -> OrmResult<Option<Row>> {
        Ok(self.fetch(sql, params)?.into_iter().next())
    }

    /// First column of the first row as an integer (`SELECT COUNT(*) ...`).
    pub fn count(&self, sql: &str, params: &[Value]) -> OrmResult<i64> {
        first_count(self.fetch(sql, params)?)
    }

    /// [`count`](Self::count) without the result cache.
    pub fn count_uncached(&self, sql: &str, params: &[Value]) -> OrmResult<i64> {
        first_count(self.fetch_uncached(sql, params)?)
    }

    /// Run a statement and return the affected row count.
    pub fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        let mut stmt = self.prepare(sql)?;
        stmt.execute(params)?;
        Ok(stmt.rows_affected())
    }

    /// Run parameterless SQL directly, bypassing statement preparation.
    pub fn exec(&self, sql: &str) -> OrmResult<()> {
        let sql = self.dialect().filter(sql);
        let ctx = QueryContext::new(&sql, 0);
        let start = Instant::now();
        let result = self.driver.batch_execute(&sql);
        let elapsed = start.elapsed();

        match &result {
            Ok(()) => self.report_result(&ctx, elapsed, &QueryResult::Affected(0)),
            Err(e) => self.report_result(&ctx, elapsed, &QueryResult::error(e.to_string())),
        }
        self.record(&sql, &[], elapsed, false);
        result
    }

    /// INSERT a row and return the generated id.
    pub fn insert(&self, table: &str, data: &Row) -> OrmResult<Value> {
        let mut builder = InsertBuilder::new(table);
        builder.dialect(self.dialect()).values(data);
        builder.execute(self)?;
        self.driver.last_insert_id()
    }

    /// UPDATE `data` on the rows matching every `column = value` of `conditions`.
    ///
    /// Fails with [`OrmError::IllegalUpdate`] when `conditions` is empty.
    pub fn update(&self, table: &str, data: &Row, conditions: &Row) -> OrmResult<u64> {
        let mut builder = UpdateBuilder::new(table);
        builder.dialect(self.dialect()).set_row(data);
        for (column, value) in conditions.iter() {
            builder.and_where(Condition::eq(column, value));
        }
        builder.execute(self)
    }

    /// DELETE the rows matching every `column = value` of `conditions`.
    ///
    /// Fails with [`OrmError::IllegalDelete`] when `conditions` is empty.
    pub fn delete(&self, table: &str, conditions: &Row) -> OrmResult<u64> {
        let mut builder = DeleteBuilder::new(table);
        builder.dialect(self.dialect());
        for (column, value) in conditions.iter() {
            builder.and_where(Condition::eq(column, value));
        }
        builder.execute(self)
    }

    /// Escape a value as an SQL literal, the same way IN lists are written.
    /// Prefer bound parameters.
    pub fn escape(&self, value: &Value) -> String {
        self.dialect().quote_literal(value)
    }

    /// Drop every cached SELECT result.
    pub fn clear_result_cache(&self) {
        if let Some(cache) = &self.result_cache {
            cache.clear();
        }
    }

    /// Drop every prepared statement.
    pub fn clear_statement_cache(&self) {
        if let Some(cache) = &self.statement_cache {
            cache.borrow_mut().clear();
        }
    }

    // ==================== Schema ====================

    /// Table names, optionally only those containing `like` (`%` and `_`
    /// act as wildcards).
    pub fn list_tables(&self, like: Option<&str>) -> OrmResult<Vec<String>> {
        let sql = self.dialect().list_tables_sql(like.is_some());
        let params: Vec<Value> = like.map(contains_pattern).into_iter().collect();
        column_names(self.fetch_uncached(&sql, &params)?)
    }

    /// Column names of `table` in declaration order, optionally only those
    /// containing `like`.
    pub fn list_columns(&self, table: &str, like: Option<&str>) -> OrmResult<Vec<String>> {
        let sql = self.dialect().list_columns_sql(like.is_some());
        let mut params = vec![Value::from(table)];
        params.extend(like.map(contains_pattern));
        column_names(self.fetch_uncached(&sql, &params)?)
    }

    /// Switch the connection character set.
    pub fn set_charset(&self, charset: &str) -> OrmResult<()> {
        self.exec(&self.dialect().charset_sql(charset))
    }

    // ==================== Transactions ====================

    /// Run `f` inside a transaction.
    ///
    /// Commits on `Ok`, rolls back on `Err`. Nested calls join the outermost
    /// transaction; only the outermost scope issues BEGIN/COMMIT/ROLLBACK.
    pub fn transaction<T>(&self, f: impl FnOnce(&Self) -> OrmResult<T>) -> OrmResult<T> {
        let depth = self.transaction_depth.get();
        if depth > 0 {
            self.transaction_depth.set(depth + 1);
            let result = f(self);
            self.transaction_depth.set(depth);
            return result;
        }

        self.exec("BEGIN")?;
        self.transaction_depth.set(1);
        let result = f(self);
        self.transaction_depth.set(0);

        match result {
            Ok(value) => {
                self.exec("COMMIT")?;
                Ok(value)
            }
            Err(error) => match self.exec("ROLLBACK") {
                Ok(()) => Err(error),
                Err(rollback_err) => Err(OrmError::Other(format!(
                    "{error} (rollback failed: {rollback_err})"
                ))),
            },
        }
    }

    /// Whether a [`transaction`](Self::transaction) scope is open.
    pub fn in_transaction(&self) -> bool {
        self.transaction_depth.get() > 0
    }
}

fn contains_pattern(like: &str) -> Value {
    Value::from(format!("%{like}%"))
}

fn column_names(rows: Vec<Row>) -> OrmResult<Vec<String>> {
    rows.iter().map(|row| row.try_get("name")).collect()
}

fn first_count(rows: Vec<Row>) -> OrmResult<i64> {
    let Some(row) = rows.into_iter().next() else {
        return Ok(0);
    };
    match row.iter().next() {
        Some((column, value)) => value
            .as_i64()
            .ok_or_else(|| OrmError::decode(column, format!("expected a count, got {}", value.kind()))),
        None => Ok(0),
    }
}

impl<D: Connect> Database<D> {
    /// Open a connection described by `config`.
    pub fn connect(config: &ConnectionConfig) -> OrmResult<Self> {
        Ok(Self::new(D::connect(config)?))
    }
}

/// A prepared statement bound to its [`Database`].
///
/// SELECT results are cached per `(sql, params)` when the result cache is on;
/// [`refresh`](Self::refresh) drops the entry and executes again.
pub struct PreparedStatement<'db, D: Driver> {
    db: &'db Database<D>,
    sql: String,
    stmt: D::Statement,
    query_type: QueryType,
    yields_rows: bool,
    params: Vec<Value>,
    results: Option<Vec<Row>>,
    cached: bool,
    cache_key: Option<String>,
    skip_cache: bool,
    rows_affected: u64,
}

impl<'db, D: Driver> PreparedStatement<'db, D> {
    /// Final SQL sent to the driver.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn query_type(&self) -> QueryType {
        self.query_type
    }

    /// Neither read nor write the result cache on later executions.
    pub fn skip_result_cache(&mut self) -> &mut Self {
        self.skip_cache = true;
        self
    }

    /// Execute with positional `params`.
    pub fn execute(&mut self, params: &[Value]) -> OrmResult<()> {
        self.params = params.to_vec();
        self.results = None;
        self.cached = false;
        self.cache_key = None;
        self.rows_affected = 0;

        let db = self.db;
        let ctx = QueryContext::new(&self.sql, params.len());

        if self.query_type == QueryType::Select && !self.skip_cache {
            if let (Some(cache), Some(max_age)) = (&db.result_cache, db.config.cache_results) {
                let key = cache_key(&self.sql, params);
                if let Some(rows) = cache.get(&key, max_age) {
                    db.report_cache(&ctx, true);
                    db.record(&self.sql, params, Duration::ZERO, true);
                    self.rows_affected = rows.len() as u64;
                    self.results = Some(rows);
                    self.cached = true;
                    self.cache_key = Some(key);
                    return Ok(());
                }
                db.report_cache(&ctx, false);
                self.cache_key = Some(key);
            }
        }

        let start = Instant::now();
        let outcome = if self.yields_rows {
            db.driver.query(&self.stmt, params).map(Outcome::Rows)
        } else {
            db.driver.execute(&self.stmt, params).map(Outcome::Affected)
        };
        let elapsed = start.elapsed();

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                db.report_result(&ctx, elapsed, &QueryResult::error(e.to_string()));
                db.record(&self.sql, params, elapsed, false);
                return Err(e);
            }
        };

        match outcome {
            Outcome::Rows(rows) => {
                db.report_result(&ctx, elapsed, &QueryResult::Rows(rows.len()));
                if !rows.is_empty() {
                    if let (Some(cache), Some(key)) = (&db.result_cache, &self.cache_key) {
                        cache.set(key, &rows);
                    }
                }
                self.rows_affected = rows.len() as u64;
                self.results = Some(rows);
            }
            Outcome::Affected(affected) => {
                db.report_result(&ctx, elapsed, &QueryResult::Affected(affected));
                self.rows_affected = affected;
            }
        }
        db.record(&self.sql, params, elapsed, false);
        Ok(())
    }

    /// Drop the cached result of the last execution and execute again.
    ///
    /// `None` reuses the parameters of the last execution.
    pub fn refresh(&mut self, params: Option<&[Value]>) -> OrmResult<()> {
        let params = params.map_or_else(|| self.params.clone(), <[Value]>::to_vec);
        if let (Some(cache), Some(key)) = (&self.db.result_cache, &self.cache_key) {
            cache.delete(key);
        }
        self.results = None;
        self.execute(&params)
    }

    /// Rows of the last execution.
    pub fn results(&self) -> &[Row] {
        self.results.as_deref().unwrap_or_default()
    }

    /// Rows of the last execution keyed by the text of `column`.
    ///
    /// Rows without the column are skipped; on duplicate keys the later row wins.
    pub fn results_by(&self, column: &str) -> BTreeMap<String, Row> {
        self.results()
            .iter()
            .filter_map(|row| Some((row.get(column)?.to_string(), row.clone())))
            .collect()
    }

    pub fn into_results(self) -> Vec<Row> {
        self.results.unwrap_or_default()
    }

    /// Map the rows of the last execution to `T`.
    pub fn results_as<T: FromRow>(&self) -> OrmResult<Vec<T>> {
        self.results().iter().map(T::from_row).collect()
    }

    /// Whether the last execution was answered from the result cache.
    pub fn is_cached(&self) -> bool {
        self.cached
    }

    /// Affected rows for mutations; returned rows for queries.
    pub fn rows_affected(&self) -> u64 {
        self.rows_affected
    }
}

enum Outcome {
    Rows(Vec<Row>),
    Affected(u64),
}

impl<D: Driver> std::fmt::Debug for PreparedStatement<'_, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedStatement")
            .field("sql", &self.sql)
            .field("query_type", &self.query_type)
            .field("params", &self.params)
            .field("cached", &self.cached)
            .finish_non_exhaustive()
    }
}
