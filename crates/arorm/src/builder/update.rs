use super::select::BuiltQuery;
use super::traits::{MutationBuilder, SqlBuilder};
use super::where_builder::WhereBuilder;
use crate::condition::Condition;
use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::ident::{quote_column, quote_columns};
use crate::row::Row;
use crate::value::Value;

/// UPDATE builder.
///
/// Building fails with [`OrmError::IllegalUpdate`] when there is nothing to SET
/// or no WHERE condition; a full-table update cannot be issued through it.
#[derive(Debug, Clone)]
pub struct UpdateBuilder {
    table: String,
    dialect: Dialect,
    set_fields: Row,
    where_builder: WhereBuilder,
}

impl UpdateBuilder {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            dialect: Dialect::default(),
            set_fields: Row::new(),
            where_builder: WhereBuilder::new(),
        }
    }

    pub fn dialect(&mut self, dialect: Dialect) -> &mut Self {
        self.dialect = dialect;
        self
    }

    /// Set a column.
    pub fn set(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.set_fields.set(column, value);
        self
    }

    /// Set every column of `row`.
    pub fn set_row(&mut self, row: &Row) -> &mut Self {
        self.set_fields
            .extend(row.iter().map(|(k, v)| (k.to_string(), v.clone())));
        self
    }

    pub fn and_where(&mut self, condition: Condition) -> &mut Self {
        self.where_builder.and(condition);
        self
    }

    pub fn or_where(&mut self, condition: Condition) -> &mut Self {
        self.where_builder.or(condition);
        self
    }

    /// Add AND equality condition.
    pub fn and_eq(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.and_where(Condition::eq(column, value))
    }

    /// Replace the WHERE chain.
    pub fn with_where(&mut self, where_builder: WhereBuilder) -> &mut Self {
        self.where_builder = where_builder;
        self
    }
}

impl SqlBuilder for UpdateBuilder {
    fn build(&self) -> OrmResult<BuiltQuery> {
        if self.set_fields.is_empty() {
            return Err(OrmError::IllegalUpdate(format!(
                "no columns to set on {}",
                self.table
            )));
        }
        if self.where_builder.is_empty() {
            return Err(OrmError::IllegalUpdate(format!(
                "UPDATE {} without WHERE",
                self.table
            )));
        }

        let mut params: Vec<Value> = Vec::with_capacity(self.set_fields.len());
        let assignments = self
            .set_fields
            .iter()
            .map(|(column, value)| {
                params.push(value.clone());
                format!("{} = ?", quote_column(column))
            })
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = format!(
            "UPDATE {} SET {assignments} WHERE ",
            quote_columns(&self.table)
        );
        self.where_builder
            .append_to(self.dialect, &mut sql, &mut params)?;

        Ok(BuiltQuery::new(sql, params))
    }
}

impl MutationBuilder for UpdateBuilder {}
