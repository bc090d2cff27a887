use std::fmt;
use std::time::Duration;

/// Statement kind, used for per-kind counters and cache eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    Select,
    Insert,
    Update,
    Delete,
    /// DDL, transaction control and anything else
    Other,
}

impl QueryType {
    /// Classify a statement by its leading keyword.
    ///
    /// Comments and opening parentheses before the keyword are skipped. For a
    /// CTE (`WITH ...`) the first keyword outside the CTE bodies decides.
    pub fn from_sql(sql: &str) -> Self {
        let body = skip_preamble(sql);
        let word = body
            .split(|c: char| !c.is_ascii_alphabetic())
            .next()
            .unwrap_or_default();
        if word.eq_ignore_ascii_case("WITH") {
            Self::after_cte(body)
        } else {
            Self::from_keyword(word)
        }
    }

    /// Kinds that return rows without a `RETURNING` clause.
    pub fn returns_rows(self) -> bool {
        matches!(self, QueryType::Select | QueryType::Other)
    }

    fn from_keyword(word: &str) -> Self {
        match word.to_ascii_uppercase().as_str() {
            "SELECT" => QueryType::Select,
            "INSERT" => QueryType::Insert,
            "UPDATE" => QueryType::Update,
            "DELETE" => QueryType::Delete,
            _ => QueryType::Other,
        }
    }

    fn after_cte(sql: &str) -> Self {
        top_level_word(sql, |word| match Self::from_keyword(word) {
            QueryType::Other => None,
            found => Some(found),
        })
        .unwrap_or(QueryType::Select)
    }

    /// Whether running `sql` produces a result set: SELECT-like statements and
    /// DML with a top-level `RETURNING` clause.
    pub fn yields_rows(sql: &str) -> bool {
        Self::from_sql(sql).returns_rows()
            || top_level_word(sql, |word| word.eq_ignore_ascii_case("RETURNING").then_some(()))
                .is_some()
    }
}

/// First `Some` that `visit` returns for a word outside parentheses, string
/// literals and quoted identifiers.
fn top_level_word<T>(sql: &str, mut visit: impl FnMut(&str) -> Option<T>) -> Option<T> {
    let mut depth = 0usize;
    let mut quote = None;
    let mut word_start = None;

    let chars = sql.char_indices().chain(std::iter::once((sql.len(), ' ')));
    for (i, ch) in chars {
        if let Some(open) = quote {
            if ch == open {
                quote = None;
            }
            continue;
        }
        if ch.is_ascii_alphanumeric() || ch == '_' {
            word_start.get_or_insert(i);
            continue;
        }
        if let Some(start) = word_start.take() {
            if depth == 0 {
                if let Some(found) = visit(&sql[start..i]) {
                    return Some(found);
                }
            }
        }
        match ch {
            '\'' | '"' | '`' => quote = Some(ch),
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    None
}

/// Skip whitespace, comments and opening parentheses.
fn skip_preamble(mut sql: &str) -> &str {
    loop {
        sql = sql.trim_start_matches(|c: char| c.is_whitespace() || c == '(');
        if let Some(rest) = sql.strip_prefix("--") {
            sql = rest.split_once('\n').map_or("", |(_, after)| after);
        } else if let Some(rest) = sql.strip_prefix("/*") {
            sql = rest.split_once("*/").map_or("", |(_, after)| after);
        } else {
            return sql;
        }
    }
}

/// What a monitor learns about a statement.
#[derive(Debug, Clone)]
pub struct QueryContext {
    /// SQL as sent to the driver (after the dialect filter).
    pub sql: String,
    pub param_count: usize,
    pub query_type: QueryType,
}

impl QueryContext {
    pub fn new(sql: &str, param_count: usize) -> Self {
        Self {
            sql: sql.to_string(),
            param_count,
            query_type: QueryType::from_sql(sql),
        }
    }
}

/// Maximum length for error messages in `QueryResult::Error`.
const MAX_ERROR_LEN: usize = 512;

/// Outcome of one statement as reported to monitors.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    /// Statement returned rows.
    Rows(usize),
    /// Statement affected rows.
    Affected(u64),
    /// Rows served from the result cache.
    Cached(usize),
    /// Statement failed (message truncated to 512 bytes).
    Error(String),
}

impl QueryResult {
    /// An error result with the message cut to 512 bytes.
    pub fn error(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.len() <= MAX_ERROR_LEN {
            return Self::Error(message);
        }
        let short = super::truncate_sql_bytes(&message, MAX_ERROR_LEN);
        Self::Error(format!("{short}..."))
    }
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryResult::Rows(n) => write!(f, "{n} rows"),
            QueryResult::Affected(n) => write!(f, "{n} affected"),
            QueryResult::Cached(n) => write!(f, "{n} rows (cached)"),
            QueryResult::Error(e) => write!(f, "error: {e}"),
        }
    }
}

/// Hooks called by the executor around every statement.
pub trait QueryMonitor: Send + Sync {
    /// Called after a statement completes (success or failure).
    fn on_query_complete(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult);

    /// Called when a statement exceeds the slow query threshold.
    fn on_slow_query(&self, _ctx: &QueryContext, _duration: Duration) {}

    /// Called when a SELECT is answered from the result cache.
    fn on_cache_hit(&self, _ctx: &QueryContext) {}

    /// Called when a cacheable SELECT had to be executed.
    fn on_cache_miss(&self, _ctx: &QueryContext) {}
}
