//! SQLite driver over `rusqlite` (bundled SQLite).

use super::{Connect, Driver};
use crate::config::ConnectionConfig;
use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::row::Row;
use crate::value::Value;
use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{Connection, ToSql, params_from_iter};

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(rusqlite::types::Value::Null),
            Value::Bool(b) => ToSqlOutput::Owned(rusqlite::types::Value::Integer(i64::from(*b))),
            Value::Int(i) => ToSqlOutput::Owned(rusqlite::types::Value::Integer(*i)),
            Value::Float(f) => ToSqlOutput::Owned(rusqlite::types::Value::Real(*f)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Bytes(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Int(i),
            ValueRef::Real(r) => Value::Float(r),
            ValueRef::Text(items) => Value::Text(String::from_utf8_lossy(items).into_owned()),
            ValueRef::Blob(items) => Value::Bytes(items.to_vec()),
        }
    }
}

/// A single SQLite connection.
///
/// Statements are compiled through rusqlite's own per-connection cache, so the
/// statement handle is just the SQL text.
pub struct SqliteDriver {
    conn: Connection,
}

impl SqliteDriver {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn open_in_memory() -> OrmResult<Self> {
        Ok(Self::new(Connection::open_in_memory()?))
    }

    pub fn open(path: &str) -> OrmResult<Self> {
        Ok(Self::new(Connection::open(path)?))
    }

    /// The underlying rusqlite connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Driver for SqliteDriver {
    type Statement = String;

    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn prepare(&self, sql: &str) -> OrmResult<String> {
        // Compile once so syntax errors surface at prepare time.
        self.conn.prepare_cached(sql)?;
        Ok(sql.to_string())
    }

    fn query(&self, sql: &String, params: &[Value]) -> OrmResult<Vec<Row>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt.query(params_from_iter(params.iter()))?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Row::new();
            for (i, name) in names.iter().enumerate() {
                record.set(name.as_str(), Value::from(row.get_ref(i)?));
            }
            out.push(record);
        }
        Ok(out)
    }

    fn execute(&self, sql: &String, params: &[Value]) -> OrmResult<u64> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let affected = stmt.execute(params_from_iter(params.iter()))?;
        Ok(affected as u64)
    }

    fn last_insert_id(&self) -> OrmResult<Value> {
        Ok(Value::Int(self.conn.last_insert_rowid()))
    }

    fn batch_execute(&self, sql: &str) -> OrmResult<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }
}

impl Connect for SqliteDriver {
    fn connect(config: &ConnectionConfig) -> OrmResult<Self> {
        if config.dialect()? != Dialect::Sqlite {
            return Err(OrmError::configuration(format!(
                "not an SQLite DSN: {}",
                config.dsn
            )));
        }
        match config.dsn_body() {
            "" | ":memory:" => Self::open_in_memory(),
            path => Self::open(path),
        }
    }
}
