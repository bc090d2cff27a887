use super::select::BuiltQuery;
use super::traits::{MutationBuilder, SqlBuilder};
use super::where_builder::WhereBuilder;
use crate::condition::Condition;
use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::ident::quote_columns;
use crate::value::Value;

/// DELETE builder.
///
/// A DELETE without any WHERE condition fails with [`OrmError::IllegalDelete`].
#[derive(Debug, Clone)]
pub struct DeleteBuilder {
    table: String,
    dialect: Dialect,
    where_builder: WhereBuilder,
}

impl DeleteBuilder {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            dialect: Dialect::default(),
            where_builder: WhereBuilder::new(),
        }
    }

    pub fn dialect(&mut self, dialect: Dialect) -> &mut Self {
        self.dialect = dialect;
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

    /// Add AND IN (...) condition with escaped literals.
    pub fn and_in(&mut self, column: &str, values: impl IntoIterator<Item = impl Into<Value>>) -> &mut Self {
        self.and_where(Condition::in_list(column, values))
    }

    /// Replace the WHERE chain.
    pub fn with_where(&mut self, where_builder: WhereBuilder) -> &mut Self {
        self.where_builder = where_builder;
        self
    }
}

impl SqlBuilder for DeleteBuilder {
    fn build(&self) -> OrmResult<BuiltQuery> {
        if self.where_builder.is_empty() {
            return Err(OrmError::IllegalDelete(format!(
                "DELETE FROM {} without WHERE",
                self.table
            )));
        }

        let mut sql = format!("DELETE FROM {} WHERE ", quote_columns(&self.table));
        let mut params = Vec::new();
        self.where_builder
            .append_to(self.dialect, &mut sql, &mut params)?;

        Ok(BuiltQuery::new(sql, params))
    }
}

impl MutationBuilder for DeleteBuilder {}
