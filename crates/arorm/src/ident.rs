//! Identifier quoting.
//!
//! Builders quote every table and column with ANSI double quotes; the
//! [`Dialect`](crate::Dialect) filter swaps the delimiter at prepare time for
//! databases that use something else.
//!
//! - Tokens that already contain `"` or a function call `(` pass through unchanged.
//! - Comma-joined lists are split and each member quoted on its own.
//! - Dotted names are quoted per segment: `t.col` becomes `"t"."col"`.
//! - A bare `*` (also `t.*`) is never quoted.
//!
//! # Example
//! ```
//! use arorm::ident::{quote_columns, quote_table};
//!
//! assert_eq!(quote_columns("t.col"), r#""t"."col""#);
//! assert_eq!(quote_columns("COUNT(*)"), "COUNT(*)");
//! assert_eq!(quote_columns("*"), "*");
//! assert_eq!(quote_table(("student", "s")), r#""student" AS s"#);
//! ```

/// Quote a column expression or a comma-joined list of them.
pub fn quote_columns(columns: &str) -> String {
    // A complex SELECT expression (function calls, subqueries) is left alone.
    if columns.contains('(') {
        return columns.to_string();
    }

    columns
        .split(',')
        .map(quote_column)
        .collect::<Vec<_>>()
        .join(",")
}

/// Quote every member of a column list.
pub fn quote_column_list<I, S>(columns: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    columns
        .into_iter()
        .map(|c| quote_column(c.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Quote a single (possibly dotted) column token.
pub fn quote_column(column: &str) -> String {
    let column = column.trim();

    if column.contains('"') || column.contains('(') {
        return column.to_string();
    }

    let mut out = String::with_capacity(column.len() + 4);
    for (i, part) in column.split('.').enumerate() {
        if i > 0 {
            out.push('.');
        }
        if part == "*" {
            out.push('*');
        } else {
            out.push('"');
            out.push_str(part);
            out.push('"');
        }
    }
    out
}

/// A table reference with an optional alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
}

impl TableRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
        }
    }

    pub fn aliased(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: Some(alias.into()),
        }
    }

    /// Render as `"name"` or `"name" AS alias`.
    pub fn to_sql(&self) -> String {
        let mut out = quote_columns(&self.name);
        if let Some(alias) = &self.alias {
            out.push_str(" AS ");
            out.push_str(alias);
        }
        out
    }
}

impl From<&str> for TableRef {
    fn from(name: &str) -> Self {
        TableRef::new(name)
    }
}

impl From<String> for TableRef {
    fn from(name: String) -> Self {
        TableRef::new(name)
    }
}

impl From<(&str, &str)> for TableRef {
    fn from((name, alias): (&str, &str)) -> Self {
        TableRef::aliased(name, alias)
    }
}

/// Quote a table name, appending `AS alias` when one is given.
pub fn quote_table(table: impl Into<TableRef>) -> String {
    table.into().to_sql()
}
