use super::select::BuiltQuery;
use crate::database::Database;
use crate::driver::Driver;
use crate::error::OrmResult;
use crate::row::{FromRow, Row};

/// Base trait for SQL builders.
pub trait SqlBuilder {
    /// Build the SQL and its bound values, validating builder state.
    fn build(&self) -> OrmResult<BuiltQuery>;

    /// Debug helper.
    fn to_sql(&self) -> OrmResult<String> {
        self.build().map(|q| q.sql)
    }

    /// Execute and return all rows.
    fn query<D: Driver>(&self, db: &Database<D>) -> OrmResult<Vec<Row>> {
        let built = self.build()?;
        db.fetch(built.sql(), built.params())
    }

    /// Execute and map all rows to `T`.
    fn query_as<T: FromRow, D: Driver>(&self, db: &Database<D>) -> OrmResult<Vec<T>> {
        self.query(db)?.iter().map(T::from_row).collect()
    }
}

/// Trait for mutation builders (INSERT/UPDATE/DELETE).
pub trait MutationBuilder: SqlBuilder {
    /// Execute and return the affected row count.
    fn execute<D: Driver>(&self, db: &Database<D>) -> OrmResult<u64> {
        let built = self.build()?;
        db.execute(built.sql(), built.params())
    }
}
