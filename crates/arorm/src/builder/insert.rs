use super::select::BuiltQuery;
use super::traits::{MutationBuilder, SqlBuilder};
use crate::dialect::Dialect;
use crate::error::OrmResult;
use crate::ident::{quote_column, quote_columns};
use crate::row::Row;
use crate::value::Value;

/// INSERT builder over a column map.
#[derive(Debug, Clone)]
pub struct InsertBuilder {
    table: String,
    dialect: Dialect,
    row: Row,
}

impl InsertBuilder {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            dialect: Dialect::default(),
            row: Row::new(),
        }
    }

    pub fn dialect(&mut self, dialect: Dialect) -> &mut Self {
        self.dialect = dialect;
        self
    }

    /// Set a column value.
    pub fn set(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.row.set(column, value);
        self
    }

    /// Set every column of `row`.
    pub fn values(&mut self, row: &Row) -> &mut Self {
        self.row
            .extend(row.iter().map(|(k, v)| (k.to_string(), v.clone())));
        self
    }
}

impl SqlBuilder for InsertBuilder {
    fn build(&self) -> OrmResult<BuiltQuery> {
        let table = quote_columns(&self.table);

        if self.row.is_empty() {
            let sql = match self.dialect {
                Dialect::MySql => format!("INSERT INTO {table} () VALUES ()"),
                Dialect::Sqlite | Dialect::Postgres => format!("INSERT INTO {table} DEFAULT VALUES"),
            };
            return Ok(BuiltQuery::new(sql, Vec::new()));
        }

        let columns = self
            .row
            .columns()
            .map(quote_column)
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; self.row.len()].join(", ");

        Ok(BuiltQuery::new(
            format!("INSERT INTO {table} ({columns}) VALUES ({placeholders})"),
            self.row.values().cloned().collect(),
        ))
    }
}

impl MutationBuilder for InsertBuilder {}
