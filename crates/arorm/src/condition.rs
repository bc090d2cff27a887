//! Query condition types for WHERE and HAVING clauses.
//!
//! A [`Condition`] is either structured (a column plus an [`Op`]) or raw (a
//! caller-written fragment with `?` placeholders). Both render wrapped in a
//! `( ... )` group so AND/OR chains never depend on operator precedence.
//!
//! Set membership (`IN`/`NOT IN`) is the one place values are not bound: every
//! member is escaped through the dialect's literal-quoting rule and written into
//! the SQL text, so a list of any length works with plain positional binding.
//!
//! # Example
//! ```
//! use arorm::{Condition, Dialect};
//!
//! let (sql, params) = Condition::in_list("status", [1, 2, 3]).to_sql(Dialect::Sqlite).unwrap();
//! assert_eq!(sql, r#"( "status" IN (1,2,3) )"#);
//! assert!(params.is_empty());
//!
//! let (sql, params) = Condition::eq("name", "Mary").to_sql(Dialect::Sqlite).unwrap();
//! assert_eq!(sql, r#"( "name" = ? )"#);
//! assert_eq!(params.len(), 1);
//! ```

use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::ident::quote_column;
use crate::value::Value;

/// Comparison operator of a structured condition, carrying its operands.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// column = ?
    Eq(Value),
    /// column != ?
    Ne(Value),
    /// column > ?
    Gt(Value),
    /// column >= ?
    Gte(Value),
    /// column < ?
    Lt(Value),
    /// column <= ?
    Lte(Value),
    /// column LIKE ?
    Like(Value),
    /// column NOT LIKE ?
    NotLike(Value),
    /// column IS NULL
    IsNull,
    /// column IS NOT NULL
    IsNotNull,
    /// column IN (escaped, literals)
    In(Vec<Value>),
    /// column NOT IN (escaped, literals)
    NotIn(Vec<Value>),
    /// column BETWEEN ? AND ?
    Between(Value, Value),
}

impl Op {
    fn keyword(&self) -> &'static str {
        match self {
            Op::Eq(_) => "=",
            Op::Ne(_) => "!=",
            Op::Gt(_) => ">",
            Op::Gte(_) => ">=",
            Op::Lt(_) => "<",
            Op::Lte(_) => "<=",
            Op::Like(_) => "LIKE",
            Op::NotLike(_) => "NOT LIKE",
            Op::IsNull => "IS NULL",
            Op::IsNotNull => "IS NOT NULL",
            Op::In(_) => "IN",
            Op::NotIn(_) => "NOT IN",
            Op::Between(_, _) => "BETWEEN",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ConditionInner {
    /// A structured condition over a column name.
    Column { column: String, op: Op },
    /// Raw SQL with `?` placeholders.
    Raw { sql: String, params: Vec<Value> },
    /// Raw SQL followed by an escaped value list, e.g. `"id" NOT IN` + `(1,2)`.
    RawList { sql: String, values: Vec<Value> },
}

/// A WHERE/HAVING condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition(ConditionInner);

impl Condition {
    /// Structured condition: quoted column, operator, bound value(s).
    pub fn column(column: impl Into<String>, op: Op) -> Self {
        Self(ConditionInner::Column {
            column: column.into(),
            op,
        })
    }

    /// Raw SQL fragment with `?` placeholders (subqueries, EXISTS, expressions).
    ///
    /// The fragment is not quoted or inspected apart from counting placeholders.
    pub fn raw(sql: impl Into<String>, params: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Self(ConditionInner::Raw {
            sql: sql.into(),
            params: params.into_iter().map(Into::into).collect(),
        })
    }

    /// Raw SQL without parameters.
    pub fn raw_sql(sql: impl Into<String>) -> Self {
        Self(ConditionInner::Raw {
            sql: sql.into(),
            params: Vec::new(),
        })
    }

    /// Raw fragment followed by an escaped value list: `raw_in("LOWER(name) IN", ["a"])`.
    pub fn raw_in(sql: impl Into<String>, values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Self(ConditionInner::RawList {
            sql: sql.into(),
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::column(column, Op::Eq(value.into()))
    }

    pub fn ne(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::column(column, Op::Ne(value.into()))
    }

    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::column(column, Op::Gt(value.into()))
    }

    pub fn gte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::column(column, Op::Gte(value.into()))
    }

    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::column(column, Op::Lt(value.into()))
    }

    pub fn lte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::column(column, Op::Lte(value.into()))
    }

    pub fn like(column: impl Into<String>, pattern: impl Into<Value>) -> Self {
        Self::column(column, Op::Like(pattern.into()))
    }

    pub fn not_like(column: impl Into<String>, pattern: impl Into<Value>) -> Self {
        Self::column(column, Op::NotLike(pattern.into()))
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self::column(column, Op::IsNull)
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Self::column(column, Op::IsNotNull)
    }

    pub fn in_list(column: impl Into<String>, values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Self::column(column, Op::In(values.into_iter().map(Into::into).collect()))
    }

    pub fn not_in(column: impl Into<String>, values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Self::column(column, Op::NotIn(values.into_iter().map(Into::into).collect()))
    }

    pub fn between(column: impl Into<String>, from: impl Into<Value>, to: impl Into<Value>) -> Self {
        Self::column(column, Op::Between(from.into(), to.into()))
    }

    /// Render to `( ... )`, appending bound values to `params`.
    pub fn append_to(&self, dialect: Dialect, sql: &mut String, params: &mut Vec<Value>) -> OrmResult<()> {
        sql.push_str("( ");
        match &self.0 {
            ConditionInner::Column { column, op } => {
                sql.push_str(&quote_column(column));
                sql.push(' ');
                match op {
                    Op::Eq(v)
                    | Op::Ne(v)
                    | Op::Gt(v)
                    | Op::Gte(v)
                    | Op::Lt(v)
                    | Op::Lte(v)
                    | Op::Like(v)
                    | Op::NotLike(v) => {
                        sql.push_str(op.keyword());
                        sql.push_str(" ?");
                        params.push(v.clone());
                    }
                    Op::IsNull | Op::IsNotNull => sql.push_str(op.keyword()),
                    Op::In(values) | Op::NotIn(values) => {
                        sql.push_str(op.keyword());
                        sql.push(' ');
                        push_list(dialect, sql, values);
                    }
                    Op::Between(from, to) => {
                        sql.push_str("BETWEEN ? AND ?");
                        params.push(from.clone());
                        params.push(to.clone());
                    }
                }
            }
            ConditionInner::Raw { sql: fragment, params: values } => {
                let placeholders = count_placeholders(fragment);
                if placeholders != values.len() {
                    return Err(OrmError::validation(format!(
                        "condition '{fragment}' has {placeholders} '?' but {} values were given",
                        values.len()
                    )));
                }
                sql.push_str(fragment);
                params.extend(values.iter().cloned());
            }
            ConditionInner::RawList { sql: fragment, values } => {
                sql.push_str(fragment);
                sql.push(' ');
                push_list(dialect, sql, values);
            }
        }
        sql.push_str(" )");
        Ok(())
    }

    /// Render on its own, returning the SQL and its bound values.
    pub fn to_sql(&self, dialect: Dialect) -> OrmResult<(String, Vec<Value>)> {
        let mut sql = String::new();
        let mut params = Vec::new();
        self.append_to(dialect, &mut sql, &mut params)?;
        Ok((sql, params))
    }
}

/// `(a,b,c)` of escaped literals. An empty list renders `(NULL)`, which matches nothing.
fn push_list(dialect: Dialect, sql: &mut String, values: &[Value]) {
    sql.push('(');
    if values.is_empty() {
        sql.push_str("NULL");
    }
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            sql.push(',');
        }
        sql.push_str(&dialect.quote_literal(v));
    }
    sql.push(')');
}

/// Count `?` placeholders outside of string literals and quoted identifiers.
pub(crate) fn count_placeholders(sql: &str) -> usize {
    let mut count = 0;
    let mut quote: Option<char> = None;
    for ch in sql.chars() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"' | '`') => quote = Some(ch),
            (None, '?') => count += 1,
            _ => {}
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(c: Condition) -> (String, Vec<Value>) {
        c.to_sql(Dialect::Sqlite).unwrap()
    }

    #[test]
    fn equality_binds_one_placeholder() {
        let (sql, params) = render(Condition::eq("student.name", "Ann"));
        assert_eq!(sql, r#"( "student"."name" = ? )"#);
        assert_eq!(params, vec![Value::from("Ann")]);
    }

    #[test]
    fn in_list_is_escaped_inline() {
        let (sql, params) = render(Condition::in_list("status", [1, 2, 3]));
        assert_eq!(sql, r#"( "status" IN (1,2,3) )"#);
        assert!(params.is_empty());

        let (sql, _) = render(Condition::not_in("name", ["O'Hara", "Lee"]));
        assert_eq!(sql, r#"( "name" NOT IN ('O''Hara','Lee') )"#);
    }

    #[test]
    fn empty_in_list_matches_nothing() {
        let (sql, _) = render(Condition::in_list("id", Vec::<i64>::new()));
        assert_eq!(sql, r#"( "id" IN (NULL) )"#);
    }

    #[test]
    fn null_checks_and_between() {
        assert_eq!(render(Condition::is_null("dorm_id")).0, r#"( "dorm_id" IS NULL )"#);
        let (sql, params) = render(Condition::between("age", 18, 30));
        assert_eq!(sql, r#"( "age" BETWEEN ? AND ? )"#);
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn raw_fragment_is_verbatim() {
        let (sql, params) = render(Condition::raw(
            "EXISTS (SELECT 1 FROM car WHERE car.student_id = student.id AND car.year > ?)",
            [2000],
        ));
        assert_eq!(
            sql,
            "( EXISTS (SELECT 1 FROM car WHERE car.student_id = student.id AND car.year > ?) )"
        );
        assert_eq!(params, vec![Value::Int(2000)]);
    }

    #[test]
    fn raw_fragment_placeholder_mismatch() {
        let err = Condition::raw("a = ? OR b = ?", [1])
            .to_sql(Dialect::Sqlite)
            .unwrap_err();
        assert!(matches!(err, OrmError::Validation(_)));
    }

    #[test]
    fn raw_list_appends_escaped_values() {
        let (sql, _) = render(Condition::raw_in("LOWER(name) IN", ["a", "b"]));
        assert_eq!(sql, "( LOWER(name) IN ('a','b') )");
    }

    #[test]
    fn placeholders_inside_literals_are_ignored() {
        assert_eq!(count_placeholders("a = ? AND b = '?' AND \"c?\" = ?"), 2);
    }
}
