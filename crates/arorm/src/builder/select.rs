use super::traits::SqlBuilder;
use super::where_builder::{Conjunction, WhereBuilder};
use crate::condition::Condition;
use crate::dialect::Dialect;
use crate::error::OrmResult;
use crate::ident::{TableRef, quote_columns, quote_table};
use crate::value::Value;

/// JOIN flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinType {
    #[default]
    Inner,
    Left,
    Right,
    Full,
}

impl JoinType {
    fn as_sql(self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
            JoinType::Full => "FULL OUTER JOIN",
        }
    }
}

/// ORDER BY direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    fn as_sql(self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }
}

/// SELECT clause accumulator.
///
/// Mutators append to the clause lists and return `&mut Self`. [`compile`](Self::compile)
/// assembles the statement and resets the builder to its empty state, so one
/// builder can be reused for the next statement; [`compile_retained`](Self::compile_retained)
/// leaves the state in place.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    dialect: Dialect,
    /// SELECT expression (default `*`)
    select: String,
    /// FROM tables, already quoted
    from: Vec<String>,
    /// JOIN clauses
    joins: Vec<String>,
    /// WHERE chain
    wheres: WhereBuilder,
    /// HAVING chain
    havings: WhereBuilder,
    /// GROUP BY columns
    group_by: Vec<String>,
    /// ORDER BY clauses
    order_by: Vec<String>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::with_dialect(Dialect::default())
    }
}

impl QueryBuilder {
    /// Create an empty builder for the default dialect.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty builder whose IN lists are escaped for `dialect`.
    pub fn with_dialect(dialect: Dialect) -> Self {
        Self {
            dialect,
            select: "*".to_string(),
            from: Vec::new(),
            joins: Vec::new(),
            wheres: WhereBuilder::new(),
            havings: WhereBuilder::new(),
            group_by: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Reset every clause to the empty state.
    pub fn clear(&mut self) -> &mut Self {
        let dialect = self.dialect;
        *self = Self::with_dialect(dialect);
        self
    }

    /// Set the SELECT expression; plain column lists are quoted.
    pub fn select(&mut self, columns: &str) -> &mut Self {
        self.select = quote_columns(columns.trim().trim_matches(','));
        self
    }

    /// Set the SELECT expression verbatim.
    pub fn select_raw(&mut self, expr: &str) -> &mut Self {
        self.select = expr.to_string();
        self
    }

    /// Add a FROM table: `"name"` or `("name", "alias")`.
    pub fn from(&mut self, table: impl Into<TableRef>) -> &mut Self {
        self.from.push(quote_table(table));
        self
    }

    /// Add a JOIN with `left = right` column pairs combined by AND.
    pub fn join(&mut self, table: impl Into<TableRef>, on: &[(&str, &str)], join_type: JoinType) -> &mut Self {
        let on = on
            .iter()
            .map(|(left, right)| format!("{} = {}", quote_columns(left), quote_columns(right)))
            .collect::<Vec<_>>()
            .join(" AND ");
        self.joins
            .push(format!("{} {} ON {}", join_type.as_sql(), quote_table(table), on));
        self
    }

    pub fn left_join(&mut self, table: impl Into<TableRef>, on: &[(&str, &str)]) -> &mut Self {
        self.join(table, on, JoinType::Left)
    }

    pub fn inner_join(&mut self, table: impl Into<TableRef>, on: &[(&str, &str)]) -> &mut Self {
        self.join(table, on, JoinType::Inner)
    }

    /// Add a pre-built JOIN clause verbatim.
    pub fn join_raw(&mut self, clause: &str) -> &mut Self {
        self.joins.push(clause.to_string());
        self
    }

    // ==================== Conditions ====================

    pub fn and_where(&mut self, condition: Condition) -> &mut Self {
        self.wheres.push(Conjunction::And, condition);
        self
    }

    pub fn or_where(&mut self, condition: Condition) -> &mut Self {
        self.wheres.push(Conjunction::Or, condition);
        self
    }

    /// `AND ( "column" = ? )`
    pub fn and_eq(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.and_where(Condition::eq(column, value))
    }

    /// `OR ( "column" = ? )`
    pub fn or_eq(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.or_where(Condition::eq(column, value))
    }

    /// `AND ( "column" IN (...) )` with escaped literals.
    pub fn and_in(&mut self, column: &str, values: impl IntoIterator<Item = impl Into<Value>>) -> &mut Self {
        self.and_where(Condition::in_list(column, values))
    }

    pub fn and_having(&mut self, condition: Condition) -> &mut Self {
        self.havings.push(Conjunction::And, condition);
        self
    }

    pub fn or_having(&mut self, condition: Condition) -> &mut Self {
        self.havings.push(Conjunction::Or, condition);
        self
    }

    // ==================== Grouping, ordering & pagination ====================

    pub fn group_by(&mut self, columns: &str) -> &mut Self {
        self.group_by.push(quote_columns(columns));
        self
    }

    /// Add an ORDER BY column, optionally with a direction.
    pub fn order_by(&mut self, column: &str, direction: impl Into<Option<Order>>) -> &mut Self {
        let mut clause = quote_columns(column);
        if let Some(direction) = direction.into() {
            clause.push(' ');
            clause.push_str(direction.as_sql());
        }
        self.order_by.push(clause);
        self
    }

    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(&mut self, offset: u64) -> &mut Self {
        self.offset = Some(offset);
        self
    }

    /// Pagination helper.
    ///
    /// `page` is 1-based (clamped to >= 1).
    /// `per_page` is clamped to >= 1.
    pub fn paginate(&mut self, page: u64, per_page: u64) -> &mut Self {
        let page = page.max(1);
        let size = per_page.max(1);
        self.limit = Some(size);
        self.offset = Some((page - 1) * size);
        self
    }

    // ==================== State access ====================

    pub fn has_where(&self) -> bool {
        !self.wheres.is_empty()
    }

    /// Detach the WHERE chain, leaving the builder without one.
    pub fn take_where(&mut self) -> WhereBuilder {
        std::mem::take(&mut self.wheres)
    }

    /// The first FROM entry, already quoted.
    pub fn from_clause(&self) -> Option<&str> {
        self.from.first().map(String::as_str)
    }

    // ==================== SQL build ====================

    /// Compile and reset the builder.
    pub fn compile(&mut self, for_count: bool) -> OrmResult<BuiltQuery> {
        let dialect = self.dialect;
        let state = std::mem::replace(self, Self::with_dialect(dialect));
        state.compile_retained(for_count)
    }

    /// Compile without touching the builder state.
    pub fn compile_retained(&self, for_count: bool) -> OrmResult<BuiltQuery> {
        let mut params = Vec::new();

        if for_count && (!self.group_by.is_empty() || !self.havings.is_empty()) {
            let inner = self.build_body("1", &mut params)?;
            return Ok(BuiltQuery {
                sql: format!("SELECT COUNT(*) FROM ({}) AS t", inner.replace('\n', " ")),
                params,
            });
        }

        let select = if for_count { "COUNT(*)" } else { self.select.as_str() };
        let mut sql = self.build_body(select, &mut params)?;

        if !for_count {
            if !self.order_by.is_empty() {
                sql.push_str("\nORDER BY ");
                sql.push_str(&self.order_by.join(","));
            }

            match (self.limit, self.offset) {
                (Some(limit), Some(offset)) => {
                    sql.push_str(&format!("\nLIMIT {limit} OFFSET {offset}"));
                }
                (Some(limit), None) => sql.push_str(&format!("\nLIMIT {limit}")),
                (None, Some(offset)) => match self.dialect {
                    Dialect::Postgres => sql.push_str(&format!("\nOFFSET {offset}")),
                    Dialect::Sqlite => sql.push_str(&format!("\nLIMIT -1 OFFSET {offset}")),
                    Dialect::MySql => {
                        sql.push_str(&format!("\nLIMIT {} OFFSET {offset}", u64::MAX));
                    }
                },
                (None, None) => {}
            }
        }

        Ok(BuiltQuery { sql, params })
    }

    fn build_body(&self, select: &str, params: &mut Vec<Value>) -> OrmResult<String> {
        let mut sql = format!("SELECT {select}\nFROM {}", self.from.join(","));

        for join in &self.joins {
            sql.push('\n');
            sql.push_str(join);
        }

        if !self.wheres.is_empty() {
            sql.push_str("\nWHERE ");
            self.wheres.append_to(self.dialect, &mut sql, params)?;
        }

        if !self.group_by.is_empty() {
            sql.push_str("\nGROUP BY ");
            sql.push_str(&self.group_by.join(","));
        }

        if !self.havings.is_empty() {
            sql.push_str("\nHAVING ");
            self.havings.append_to(self.dialect, &mut sql, params)?;
        }

        Ok(sql)
    }
}

impl SqlBuilder for QueryBuilder {
    fn build(&self) -> OrmResult<BuiltQuery> {
        self.compile_retained(false)
    }
}

/// Finished SQL with its bound values, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub(crate) sql: String,
    pub(crate) params: Vec<Value>,
}

impl BuiltQuery {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn into_parts(self) -> (String, Vec<Value>) {
        (self.sql, self.params)
    }
}
