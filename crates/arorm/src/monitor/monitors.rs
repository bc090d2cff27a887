use super::truncate_sql_bytes;
use super::types::{QueryContext, QueryMonitor, QueryResult, QueryType};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Ignores every statement.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMonitor;

impl QueryMonitor for NoopMonitor {
    fn on_query_complete(&self, _ctx: &QueryContext, _duration: Duration, _result: &QueryResult) {}
}

/// Emits one `tracing` event per statement on target `arorm.sql`.
///
/// Completed statements are logged at DEBUG, cache hits at TRACE and slow
/// statements at WARN.
#[derive(Debug, Clone)]
pub struct TracingMonitor {
    /// Byte limit for logged SQL; `None` logs it whole.
    pub max_sql_length: Option<usize>,
}

impl Default for TracingMonitor {
    fn default() -> Self {
        Self {
            max_sql_length: Some(200),
        }
    }
}

impl TracingMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cut logged SQL after `len` bytes.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    pub(crate) fn truncate_sql(&self, sql: &str) -> String {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
            _ => sql.to_string(),
        }
    }
}

impl QueryMonitor for TracingMonitor {
    fn on_query_complete(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult) {
        let sql = self.truncate_sql(&ctx.sql);
        match result {
            QueryResult::Error(error) => tracing::debug!(
                target: "arorm.sql",
                query_type = ?ctx.query_type,
                params = ctx.param_count,
                elapsed_us = duration.as_micros() as u64,
                error = %error,
                sql = %sql,
                "statement failed"
            ),
            _ => tracing::debug!(
                target: "arorm.sql",
                query_type = ?ctx.query_type,
                params = ctx.param_count,
                elapsed_us = duration.as_micros() as u64,
                result = %result,
                sql = %sql,
                "statement executed"
            ),
        }
    }

    fn on_slow_query(&self, ctx: &QueryContext, duration: Duration) {
        tracing::warn!(
            target: "arorm.sql",
            query_type = ?ctx.query_type,
            elapsed_ms = duration.as_millis() as u64,
            sql = %self.truncate_sql(&ctx.sql),
            "slow query"
        );
    }

    fn on_cache_hit(&self, ctx: &QueryContext) {
        tracing::trace!(
            target: "arorm.sql",
            params = ctx.param_count,
            sql = %self.truncate_sql(&ctx.sql),
            "result cache hit"
        );
    }
}

/// Counts statements per kind and keeps the slowest one.
///
/// Every [`Database`](crate::Database) owns one; its snapshot is what
/// `Database::stats` returns.
#[derive(Debug, Default)]
pub struct StatsMonitor {
    total: AtomicU64,
    failed: AtomicU64,
    /// Indexed by [`kind_slot`]: select, insert, update, delete.
    by_kind: [AtomicU64; 4],
    elapsed_nanos: AtomicU64,
    max_nanos: AtomicU64,
    slowest: Mutex<Option<String>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Snapshot of [`StatsMonitor`] counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryStats {
    /// Statements executed against the driver.
    pub total_queries: u64,
    pub failed_queries: u64,
    pub total_duration: Duration,
    pub select_count: u64,
    pub insert_count: u64,
    pub update_count: u64,
    pub delete_count: u64,
    pub max_duration: Duration,
    /// SQL of the statement that took `max_duration`.
    pub slowest_query: Option<String>,
    /// SELECTs answered from the result cache.
    pub cache_hits: u64,
    /// Cacheable SELECTs that had to be executed.
    pub cache_misses: u64,
}

fn kind_slot(kind: QueryType) -> Option<usize> {
    match kind {
        QueryType::Select => Some(0),
        QueryType::Insert => Some(1),
        QueryType::Update => Some(2),
        QueryType::Delete => Some(3),
        QueryType::Other => None,
    }
}

fn nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

impl StatsMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    fn slowest(&self) -> MutexGuard<'_, Option<String>> {
        self.slowest.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn stats(&self) -> QueryStats {
        let read = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        let [select, insert, update, delete] = &self.by_kind;
        QueryStats {
            total_queries: read(&self.total),
            failed_queries: read(&self.failed),
            total_duration: Duration::from_nanos(read(&self.elapsed_nanos)),
            select_count: read(select),
            insert_count: read(insert),
            update_count: read(update),
            delete_count: read(delete),
            max_duration: Duration::from_nanos(read(&self.max_nanos)),
            slowest_query: self.slowest().clone(),
            cache_hits: read(&self.hits),
            cache_misses: read(&self.misses),
        }
    }

    /// Zero every counter and forget the slowest statement.
    pub fn reset(&self) {
        let scalars = [
            &self.total,
            &self.failed,
            &self.elapsed_nanos,
            &self.max_nanos,
            &self.hits,
            &self.misses,
        ];
        for counter in scalars.into_iter().chain(&self.by_kind) {
            counter.store(0, Ordering::Relaxed);
        }
        *self.slowest() = None;
    }
}

impl QueryMonitor for StatsMonitor {
    fn on_query_complete(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult) {
        let elapsed = nanos(duration);
        self.total.fetch_add(1, Ordering::Relaxed);
        if let QueryResult::Error(_) = result {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        if let Some(slot) = kind_slot(ctx.query_type) {
            self.by_kind[slot].fetch_add(1, Ordering::Relaxed);
        }

        // Pins at u64::MAX instead of wrapping.
        let _ = self
            .elapsed_nanos
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |total| {
                Some(total.saturating_add(elapsed))
            });

        if self.max_nanos.fetch_max(elapsed, Ordering::Relaxed) < elapsed {
            *self.slowest() = Some(ctx.sql.clone());
        }
    }

    fn on_cache_hit(&self, _ctx: &QueryContext) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn on_cache_miss(&self, _ctx: &QueryContext) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }
}

impl<M: QueryMonitor + ?Sized> QueryMonitor for Arc<M> {
    fn on_query_complete(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult) {
        M::on_query_complete(self, ctx, duration, result)
    }

    fn on_slow_query(&self, ctx: &QueryContext, duration: Duration) {
        M::on_slow_query(self, ctx, duration)
    }

    fn on_cache_hit(&self, ctx: &QueryContext) {
        M::on_cache_hit(self, ctx)
    }

    fn on_cache_miss(&self, ctx: &QueryContext) {
        M::on_cache_miss(self, ctx)
    }
}

/// Forwards every hook to each registered monitor in insertion order.
#[derive(Default)]
pub struct CompositeMonitor {
    monitors: Vec<Arc<dyn QueryMonitor>>,
}

impl CompositeMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(clippy::should_implement_trait)]
    pub fn add<M: QueryMonitor + 'static>(self, monitor: M) -> Self {
        self.add_arc(Arc::new(monitor))
    }

    pub fn add_arc(mut self, monitor: Arc<dyn QueryMonitor>) -> Self {
        self.monitors.push(monitor);
        self
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    fn each(&self, hook: impl Fn(&dyn QueryMonitor)) {
        self.monitors.iter().for_each(|monitor| hook(monitor.as_ref()));
    }
}

impl QueryMonitor for CompositeMonitor {
    fn on_query_complete(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult) {
        self.each(|m| m.on_query_complete(ctx, duration, result));
    }

    fn on_slow_query(&self, ctx: &QueryContext, duration: Duration) {
        self.each(|m| m.on_slow_query(ctx, duration));
    }

    fn on_cache_hit(&self, ctx: &QueryContext) {
        self.each(|m| m.on_cache_hit(ctx));
    }

    fn on_cache_miss(&self, ctx: &QueryContext) {
        self.each(|m| m.on_cache_miss(ctx));
    }
}
