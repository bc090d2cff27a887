//! PostgreSQL driver over `tokio-postgres`.
//!
//! The connection future runs on a private current-thread runtime; every call
//! blocks on it, so the driver exposes the same synchronous surface as SQLite.

use super::{Connect, Driver};
use crate::config::ConnectionConfig;
use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::row::Row;
use crate::value::Value;
use tokio::runtime::{Builder, Runtime};
use tokio_postgres::error::SqlState;
use tokio_postgres::types::{ToSql, Type};
use tokio_postgres::{Client, NoTls, Statement};

/// A single blocking PostgreSQL connection.
pub struct PgDriver {
    runtime: Runtime,
    client: Client,
}

impl PgDriver {
    /// Connect with a libpq-style connection string or a `postgresql://` URL.
    pub fn connect_str(conn_str: &str) -> OrmResult<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| OrmError::driver(format!("failed to start runtime: {e}")))?;

        let (client, connection) = runtime.block_on(tokio_postgres::connect(conn_str, NoTls))?;
        runtime.spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(target: "arorm.sql", error = %e, "postgres connection closed");
            }
        });

        Ok(Self { runtime, client })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Translate a DSN body into a tokio-postgres connection string.
///
/// `host=localhost;dbname=app` becomes `host=localhost dbname=app`; URL forms
/// pass through. Credentials from the config are appended when present.
pub(crate) fn connection_string(config: &ConnectionConfig) -> String {
    if config.dsn.contains("://") {
        return config.dsn.clone();
    }

    let mut parts: Vec<String> = config
        .dsn_body()
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    if let Some(user) = &config.username {
        parts.push(format!("user={user}"));
    }
    if let Some(password) = &config.password {
        parts.push(format!("password='{}'", password.replace('\\', "\\\\").replace('\'', "\\'")));
    }
    parts.join(" ")
}

type BoxedParam = Box<dyn ToSql + Sync + Send>;

/// Convert a value to the Rust type the server expects for a parameter slot.
fn bind(value: &Value, ty: &Type, index: usize) -> OrmResult<BoxedParam> {
    let mismatch = || {
        OrmError::driver(format!(
            "parameter ${} of type {ty} cannot accept a {} value",
            index + 1,
            value.kind()
        ))
    };

    let boxed: BoxedParam = match ty {
        t if *t == Type::BOOL => Box::new(match value {
            Value::Null => None,
            other => Some(other.as_bool().ok_or_else(mismatch)?),
        }),
        t if *t == Type::INT2 => Box::new(match value {
            Value::Null => None,
            other => Some(
                other
                    .as_i64()
                    .and_then(|i| i16::try_from(i).ok())
                    .ok_or_else(mismatch)?,
            ),
        }),
        t if *t == Type::INT4 => Box::new(match value {
            Value::Null => None,
            other => Some(
                other
                    .as_i64()
                    .and_then(|i| i32::try_from(i).ok())
                    .ok_or_else(mismatch)?,
            ),
        }),
        t if *t == Type::INT8 => Box::new(match value {
            Value::Null => None,
            other => Some(other.as_i64().ok_or_else(mismatch)?),
        }),
        t if *t == Type::FLOAT4 => Box::new(match value {
            Value::Null => None,
            other => Some(other.as_f64().ok_or_else(mismatch)? as f32),
        }),
        t if *t == Type::FLOAT8 => Box::new(match value {
            Value::Null => None,
            other => Some(other.as_f64().ok_or_else(mismatch)?),
        }),
        t if *t == Type::BYTEA => Box::new(match value {
            Value::Null => None,
            other => Some(other.as_bytes().ok_or_else(mismatch)?.to_vec()),
        }),
        _ => Box::new(match value {
            Value::Null => None,
            Value::Bytes(_) => return Err(mismatch()),
            other => Some(other.to_string()),
        }),
    };
    Ok(boxed)
}

fn decode_row(row: &tokio_postgres::Row) -> OrmResult<Row> {
    let mut out = Row::new();
    for (i, column) in row.columns().iter().enumerate() {
        let name = column.name();
        let ty = column.type_();
        let value: Value = match ty {
            t if *t == Type::BOOL => row.try_get::<_, Option<bool>>(i)?.into(),
            t if *t == Type::INT2 => row.try_get::<_, Option<i16>>(i)?.into(),
            t if *t == Type::INT4 => row.try_get::<_, Option<i32>>(i)?.into(),
            t if *t == Type::INT8 => row.try_get::<_, Option<i64>>(i)?.into(),
            t if *t == Type::OID => row.try_get::<_, Option<u32>>(i)?.into(),
            t if *t == Type::FLOAT4 => row.try_get::<_, Option<f32>>(i)?.into(),
            t if *t == Type::FLOAT8 => row.try_get::<_, Option<f64>>(i)?.into(),
            t if *t == Type::BYTEA => row.try_get::<_, Option<Vec<u8>>>(i)?.into(),
            _ => row
                .try_get::<_, Option<String>>(i)
                .map_err(|e| OrmError::decode(name, e.to_string()))?
                .into(),
        };
        out.set(name, value);
    }
    Ok(out)
}

impl PgDriver {
    fn bind_all(stmt: &Statement, params: &[Value]) -> OrmResult<Vec<BoxedParam>> {
        let types = stmt.params();
        if types.len() != params.len() {
            return Err(OrmError::driver(format!(
                "statement expects {} parameters, {} given",
                types.len(),
                params.len()
            )));
        }
        params
            .iter()
            .zip(types)
            .enumerate()
            .map(|(i, (value, ty))| bind(value, ty, i))
            .collect()
    }
}

impl Driver for PgDriver {
    type Statement = Statement;

    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn prepare(&self, sql: &str) -> OrmResult<Statement> {
        Ok(self.runtime.block_on(self.client.prepare(sql))?)
    }

    fn query(&self, stmt: &Statement, params: &[Value]) -> OrmResult<Vec<Row>> {
        let bound = Self::bind_all(stmt, params)?;
        let refs: Vec<&(dyn ToSql + Sync)> = bound.iter().map(|b| &**b as &(dyn ToSql + Sync)).collect();
        let rows = self.runtime.block_on(self.client.query(stmt, &refs))?;
        rows.iter().map(decode_row).collect()
    }

    fn execute(&self, stmt: &Statement, params: &[Value]) -> OrmResult<u64> {
        let bound = Self::bind_all(stmt, params)?;
        let refs: Vec<&(dyn ToSql + Sync)> = bound.iter().map(|b| &**b as &(dyn ToSql + Sync)).collect();
        Ok(self.runtime.block_on(self.client.execute(stmt, &refs))?)
    }

    fn last_insert_id(&self) -> OrmResult<Value> {
        match self
            .runtime
            .block_on(self.client.query_one("SELECT lastval()", &[]))
        {
            Ok(row) => Ok(Value::Int(row.try_get::<_, i64>(0)?)),
            // No sequence was used in this session (explicit keys).
            Err(e) if e.code() == Some(&SqlState::OBJECT_NOT_IN_PREREQUISITE_STATE) => Ok(Value::Null),
            Err(e) => Err(e.into()),
        }
    }

    fn batch_execute(&self, sql: &str) -> OrmResult<()> {
        Ok(self.runtime.block_on(self.client.batch_execute(sql))?)
    }
}

impl Connect for PgDriver {
    fn connect(config: &ConnectionConfig) -> OrmResult<Self> {
        if config.dialect()? != Dialect::Postgres {
            return Err(OrmError::configuration(format!(
                "not a PostgreSQL DSN: {}",
                config.dsn
            )));
        }
        Self::connect_str(&connection_string(config))
    }
}
