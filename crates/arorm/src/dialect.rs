//! SQL dialect rules.
//!
//! Builders always emit ANSI `"double-quoted"` identifiers and `?` placeholders.
//! [`Dialect::filter`] rewrites that into what the target database expects just
//! before the statement is prepared, and [`Dialect::quote_literal`] escapes values
//! that must be interpolated into the SQL text (IN lists).

use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use std::borrow::Cow;

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    #[default]
    Sqlite,
    Postgres,
    MySql,
}

impl Dialect {
    /// Derive the dialect from a DSN scheme (`mysql:...`, `pgsql:...`, `sqlite:...`).
    pub fn from_dsn(dsn: &str) -> OrmResult<Self> {
        let scheme = dsn
            .split_once(':')
            .map(|(scheme, _)| scheme)
            .ok_or_else(|| OrmError::configuration(format!("DSN has no scheme: {dsn}")))?;

        match scheme.to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Dialect::Sqlite),
            "pgsql" | "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "mysql" => Ok(Dialect::MySql),
            other => Err(OrmError::configuration(format!(
                "Unsupported database driver: {other}"
            ))),
        }
    }

    /// The identifier delimiter the database itself expects.
    pub fn identifier_quote(self) -> char {
        match self {
            Dialect::MySql => '`',
            Dialect::Sqlite | Dialect::Postgres => '"',
        }
    }

    /// Rewrite builder SQL for this dialect.
    ///
    /// - MySQL: `"ident"` becomes `` `ident` ``.
    /// - PostgreSQL: `?` placeholders become `$1`, `$2`, ...
    /// - SQLite: unchanged.
    ///
    /// String literals (`'...'`) are never touched.
    pub fn filter<'a>(self, sql: &'a str) -> Cow<'a, str> {
        match self {
            Dialect::Sqlite => Cow::Borrowed(sql),
            Dialect::MySql if !sql.contains('"') => Cow::Borrowed(sql),
            Dialect::Postgres if !sql.contains('?') => Cow::Borrowed(sql),
            _ => Cow::Owned(self.rewrite(sql)),
        }
    }

    fn rewrite(self, sql: &str) -> String {
        let mut out = String::with_capacity(sql.len() + 8);
        let mut placeholder = 0usize;
        let mut in_literal = false;
        let mut in_ident = false;

        for ch in sql.chars() {
            if in_literal {
                // A doubled '' closes and immediately reopens, which this toggling handles.
                if ch == '\'' {
                    in_literal = false;
                }
                out.push(ch);
                continue;
            }

            match ch {
                '\'' if !in_ident => {
                    in_literal = true;
                    out.push(ch);
                }
                '"' => {
                    in_ident = !in_ident;
                    if self == Dialect::MySql {
                        out.push('`');
                    } else {
                        out.push(ch);
                    }
                }
                '?' if self == Dialect::Postgres && !in_ident => {
                    placeholder += 1;
                    out.push('$');
                    out.push_str(&placeholder.to_string());
                }
                _ => out.push(ch),
            }
        }

        out
    }

    /// Escape a value as an SQL literal.
    ///
    /// Use bound parameters instead wherever the statement shape allows it.
    pub fn quote_literal(self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => match self {
                Dialect::Postgres => if *b { "TRUE" } else { "FALSE" }.to_string(),
                Dialect::Sqlite | Dialect::MySql => if *b { "1" } else { "0" }.to_string(),
            },
            Value::Int(i) => i.to_string(),
            Value::Float(f) if f.is_finite() => f.to_string(),
            Value::Float(_) => "NULL".to_string(),
            Value::Text(s) => self.quote_text(s),
            Value::Bytes(b) => match self {
                Dialect::Postgres => format!("'\\x{}'::bytea", hex::encode(b)),
                Dialect::Sqlite | Dialect::MySql => format!("X'{}'", hex::encode(b)),
            },
        }
    }

    /// Builder-style SQL listing table names as column `name`, with an
    /// optional `LIKE ?` filter.
    pub fn list_tables_sql(self, filtered: bool) -> String {
        let (base, filter, order) = match self {
            Dialect::Sqlite => (
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
                " AND name LIKE ?",
                " ORDER BY name",
            ),
            Dialect::Postgres => (
                "SELECT table_name::text AS name FROM information_schema.tables \
                 WHERE table_schema IN (current_schema(), pg_my_temp_schema()::regnamespace::text) \
                 AND table_type IN ('BASE TABLE', 'LOCAL TEMPORARY')",
                " AND table_name::text LIKE ?",
                " ORDER BY 1",
            ),
            Dialect::MySql => (
                "SELECT table_name AS name FROM information_schema.tables \
                 WHERE table_schema = DATABASE() AND table_type = 'BASE TABLE'",
                " AND table_name LIKE ?",
                " ORDER BY 1",
            ),
        };
        introspection(base, filtered.then_some(filter), order)
    }

    /// Builder-style SQL listing the columns of the table bound to the first
    /// `?` in declaration order, with an optional second `LIKE ?` filter.
    pub fn list_columns_sql(self, filtered: bool) -> String {
        let (base, filter, order) = match self {
            Dialect::Sqlite => (
                "SELECT name FROM pragma_table_info(?) WHERE 1 = 1",
                " AND name LIKE ?",
                " ORDER BY cid",
            ),
            Dialect::Postgres => (
                "SELECT column_name::text AS name FROM information_schema.columns \
                 WHERE table_name::text = ? \
                 AND table_schema IN (current_schema(), pg_my_temp_schema()::regnamespace::text)",
                " AND column_name::text LIKE ?",
                " ORDER BY ordinal_position",
            ),
            Dialect::MySql => (
                "SELECT column_name AS name FROM information_schema.columns \
                 WHERE table_schema = DATABASE() AND table_name = ?",
                " AND column_name LIKE ?",
                " ORDER BY ordinal_position",
            ),
        };
        introspection(base, filtered.then_some(filter), order)
    }

    /// Statement switching the connection character set.
    ///
    /// SQLite only honours `PRAGMA encoding` before the database file is
    /// created; afterwards the statement is accepted and ignored.
    pub fn charset_sql(self, charset: &str) -> String {
        let charset = self.quote_text(charset);
        match self {
            Dialect::MySql => format!("SET NAMES {charset}"),
            Dialect::Postgres => format!("SET client_encoding TO {charset}"),
            Dialect::Sqlite => format!("PRAGMA encoding = {charset}"),
        }
    }

    fn quote_text(self, s: &str) -> String {
        let mut out = String::with_capacity(s.len() + 2);
        out.push('\'');
        for ch in s.chars() {
            match ch {
                '\'' => out.push_str("''"),
                '\\' if self == Dialect::MySql => out.push_str("\\\\"),
                '\0' if self == Dialect::MySql => out.push_str("\\0"),
                '\0' => {}
                _ => out.push(ch),
            }
        }
        out.push('\'');
        out
    }
}

fn introspection(base: &str, filter: Option<&str>, order: &str) -> String {
    let mut sql = String::from(base);
    sql.push_str(filter.unwrap_or_default());
    sql.push_str(order);
    sql
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dialect_from_dsn() {
        assert_eq!(
            Dialect::from_dsn("mysql:host=localhost;dbname=campus").unwrap(),
            Dialect::MySql
        );
        assert_eq!(
            Dialect::from_dsn("postgresql://localhost/app").unwrap(),
            Dialect::Postgres
        );
        assert_eq!(Dialect::from_dsn("sqlite::memory:").unwrap(), Dialect::Sqlite);
        assert!(Dialect::from_dsn("oracle:whatever").is_err());
        assert!(Dialect::from_dsn("nocolon").is_err());
    }

    #[test]
    fn mysql_swaps_identifier_quotes_outside_literals() {
        let sql = r#"SELECT "a"."b" FROM "t" WHERE ( "c" = 'say "hi"' )"#;
        assert_eq!(
            Dialect::MySql.filter(sql),
            "SELECT `a`.`b` FROM `t` WHERE ( `c` = 'say \"hi\"' )"
        );
    }

    #[test]
    fn postgres_numbers_placeholders() {
        let sql = r#"SELECT * FROM "t" WHERE ( "a" = ? ) AND ( "b" IN ('?','x') ) OR ( "c" > ? )"#;
        assert_eq!(
            Dialect::Postgres.filter(sql),
            r#"SELECT * FROM "t" WHERE ( "a" = $1 ) AND ( "b" IN ('?','x') ) OR ( "c" > $2 )"#
        );
    }

    #[test]
    fn sqlite_filter_borrows() {
        assert!(matches!(
            Dialect::Sqlite.filter("SELECT ?"),
            Cow::Borrowed("SELECT ?")
        ));
    }

    #[test]
    fn introspection_statements() {
        assert_eq!(
            Dialect::Sqlite.list_tables_sql(true),
            "SELECT name FROM sqlite_master WHERE type = 'table' \
             AND name NOT LIKE 'sqlite_%' AND name LIKE ? ORDER BY name"
        );
        assert!(!Dialect::Sqlite.list_tables_sql(false).contains('?'));
        assert!(
            Dialect::Postgres
                .list_columns_sql(true)
                .ends_with("AND column_name::text LIKE ? ORDER BY ordinal_position")
        );
        assert_eq!(Dialect::MySql.charset_sql("utf8mb4"), "SET NAMES 'utf8mb4'");
        assert_eq!(
            Dialect::Postgres.charset_sql("UTF8"),
            "SET client_encoding TO 'UTF8'"
        );
    }

    #[test]
    fn quote_literal_escapes() {
        assert_eq!(Dialect::Sqlite.quote_literal(&Value::from("O'Neil")), "'O''Neil'");
        assert_eq!(Dialect::MySql.quote_literal(&Value::from(r"a\b")), r"'a\\b'");
        assert_eq!(Dialect::Postgres.quote_literal(&Value::Int(42)), "42");
        assert_eq!(Dialect::Postgres.quote_literal(&Value::Null), "NULL");
        assert_eq!(Dialect::Postgres.quote_literal(&Value::Bool(true)), "TRUE");
        assert_eq!(
            Dialect::Sqlite.quote_literal(&Value::Bytes(vec![0xde, 0xad])),
            "X'dead'"
        );
    }
}
