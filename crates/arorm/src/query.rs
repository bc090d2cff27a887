//! Builders bound to a database and a table.
//!
//! [`Query`] is the untyped form returning [`Row`]s; [`ModelQuery`] wraps it
//! for a [`Model`] and hydrates [`Entity`]s. Both expose the
//! [`QueryBuilder`] mutators directly and reset their clauses after every
//! terminal call, keeping only the bound table.

use crate::builder::{
    DeleteBuilder, JoinType, MutationBuilder, Order, QueryBuilder, UpdateBuilder,
};
use crate::condition::Condition;
use crate::database::Database;
use crate::driver::Driver;
use crate::entity::Entity;
use crate::error::OrmResult;
use crate::ident::TableRef;
use crate::model::Model;
use crate::row::{FromRow, Row};
use crate::value::Value;
use std::marker::PhantomData;

/// Builder mutators forwarded to an inner builder field.
macro_rules! forward_builder {
    ($($field:ident).+) => {
        /// Set the SELECT column list.
        pub fn select(&mut self, columns: &str) -> &mut Self {
            self.$($field).+.select(columns);
            self
        }

        pub fn select_raw(&mut self, expr: &str) -> &mut Self {
            self.$($field).+.select_raw(expr);
            self
        }

        pub fn join(&mut self, table: impl Into<TableRef>, on: &[(&str, &str)], join_type: JoinType) -> &mut Self {
            self.$($field).+.join(table, on, join_type);
            self
        }

        pub fn left_join(&mut self, table: impl Into<TableRef>, on: &[(&str, &str)]) -> &mut Self {
            self.$($field).+.left_join(table, on);
            self
        }

        pub fn inner_join(&mut self, table: impl Into<TableRef>, on: &[(&str, &str)]) -> &mut Self {
            self.$($field).+.inner_join(table, on);
            self
        }

        pub fn join_raw(&mut self, clause: &str) -> &mut Self {
            self.$($field).+.join_raw(clause);
            self
        }

        pub fn and_where(&mut self, condition: Condition) -> &mut Self {
            self.$($field).+.and_where(condition);
            self
        }

        pub fn or_where(&mut self, condition: Condition) -> &mut Self {
            self.$($field).+.or_where(condition);
            self
        }

        pub fn and_eq(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
            self.$($field).+.and_eq(column, value);
            self
        }

        pub fn or_eq(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
            self.$($field).+.or_eq(column, value);
            self
        }

        pub fn and_in(&mut self, column: &str, values: impl IntoIterator<Item = impl Into<Value>>) -> &mut Self {
            self.$($field).+.and_in(column, values);
            self
        }

        pub fn and_having(&mut self, condition: Condition) -> &mut Self {
            self.$($field).+.and_having(condition);
            self
        }

        pub fn or_having(&mut self, condition: Condition) -> &mut Self {
            self.$($field).+.or_having(condition);
            self
        }

        pub fn group_by(&mut self, columns: &str) -> &mut Self {
            self.$($field).+.group_by(columns);
            self
        }

        pub fn order_by(&mut self, column: &str, direction: impl Into<Option<Order>>) -> &mut Self {
            self.$($field).+.order_by(column, direction);
            self
        }

        pub fn limit(&mut self, limit: u64) -> &mut Self {
            self.$($field).+.limit(limit);
            self
        }

        pub fn offset(&mut self, offset: u64) -> &mut Self {
            self.$($field).+.offset(offset);
            self
        }

        pub fn paginate(&mut self, page: u64, per_page: u64) -> &mut Self {
            self.$($field).+.paginate(page, per_page);
            self
        }
    };
}

/// A [`QueryBuilder`] bound to a database and a table.
pub struct Query<'db, D: Driver> {
    db: &'db Database<D>,
    table: TableRef,
    primary_key: String,
    builder: QueryBuilder,
}

impl<'db, D: Driver> Query<'db, D> {
    pub fn new(db: &'db Database<D>, table: impl Into<TableRef>) -> Self {
        let table = table.into();
        let mut builder = QueryBuilder::with_dialect(db.dialect());
        builder.from(table.clone());
        Self {
            db,
            table,
            primary_key: "id".to_string(),
            builder,
        }
    }

    /// Column used by [`find`](Self::find).
    pub fn primary_key(&mut self, column: &str) -> &mut Self {
        self.primary_key = column.to_string();
        self
    }

    pub fn table(&self) -> &TableRef {
        &self.table
    }

    pub fn database(&self) -> &'db Database<D> {
        self.db
    }

    pub fn builder(&self) -> &QueryBuilder {
        &self.builder
    }

    /// Direct access for mutators not forwarded here.
    pub fn builder_mut(&mut self) -> &mut QueryBuilder {
        &mut self.builder
    }

    forward_builder!(builder);

    /// Drop every clause except the bound table.
    pub fn clear(&mut self) -> &mut Self {
        self.builder.clear();
        self.builder.from(self.table.clone());
        self
    }

    /// SQL of the current state (state is kept).
    pub fn to_sql(&self) -> OrmResult<String> {
        Ok(self.builder.compile_retained(false)?.sql)
    }

    fn compile(&mut self, for_count: bool) -> OrmResult<(String, Vec<Value>)> {
        let built = self.builder.compile(for_count);
        self.clear();
        Ok(built?.into_parts())
    }

    // ==================== Terminal operations ====================

    /// Run the SELECT and return every row.
    pub fn fetch(&mut self) -> OrmResult<Vec<Row>> {
        let (sql, params) = self.compile(false)?;
        self.db.fetch(&sql, &params)
    }

    pub fn fetch_as<T: FromRow>(&mut self) -> OrmResult<Vec<T>> {
        self.fetch()?.iter().map(T::from_row).collect()
    }

    /// Count the rows the SELECT would return (ORDER BY and LIMIT are ignored).
    pub fn count(&mut self) -> OrmResult<i64> {
        let (sql, params) = self.compile(true)?;
        self.db.count(&sql, &params)
    }

    /// First row, if any.
    pub fn first(&mut self) -> OrmResult<Option<Row>> {
        self.builder.limit(1);
        Ok(self.fetch()?.into_iter().next())
    }

    /// Row whose primary key equals `id`, if any.
    pub fn find(&mut self, id: impl Into<Value>) -> OrmResult<Option<Row>> {
        let column = self.primary_key.clone();
        self.builder.and_eq(&column, id);
        self.first()
    }

    /// INSERT `row` into the bound table and return the generated id.
    pub fn insert(&mut self, row: &Row) -> OrmResult<Value> {
        self.db.insert(&self.table.name, row)
    }

    /// UPDATE the rows matched by the WHERE chain.
    ///
    /// Fails with [`OrmError::IllegalUpdate`](crate::OrmError::IllegalUpdate)
    /// when no WHERE condition was added.
    pub fn update(&mut self, row: &Row) -> OrmResult<u64> {
        let wheres = self.builder.take_where();
        self.clear();
        let mut builder = UpdateBuilder::new(&self.table.name);
        builder
            .dialect(self.db.dialect())
            .set_row(row)
            .with_where(wheres);
        builder.execute(self.db)
    }

    /// DELETE the rows matched by the WHERE chain.
    ///
    /// Fails with [`OrmError::IllegalDelete`](crate::OrmError::IllegalDelete)
    /// when no WHERE condition was added.
    pub fn delete(&mut self) -> OrmResult<u64> {
        let wheres = self.builder.take_where();
        self.clear();
        let mut builder = DeleteBuilder::new(&self.table.name);
        builder.dialect(self.db.dialect()).with_where(wheres);
        builder.execute(self.db)
    }
}

/// A [`Query`] over the table of `M`, hydrating [`Entity`]s.
pub struct ModelQuery<'db, M: Model, D: Driver> {
    query: Query<'db, D>,
    _model: PhantomData<M>,
}

impl<'db, M: Model, D: Driver> ModelQuery<'db, M, D> {
    pub fn new(db: &'db Database<D>) -> Self {
        let mut query = Query::new(db, M::TABLE);
        query.primary_key(M::PRIMARY_KEY);
        Self::from_query(query)
    }

    /// Wrap a query already scoped to rows of `M` (joins, aliases).
    pub fn from_query(query: Query<'db, D>) -> Self {
        Self {
            query,
            _model: PhantomData,
        }
    }

    pub fn query(&self) -> &Query<'db, D> {
        &self.query
    }

    pub fn query_mut(&mut self) -> &mut Query<'db, D> {
        &mut self.query
    }

    pub fn into_query(self) -> Query<'db, D> {
        self.query
    }

    forward_builder!(query.builder);

    pub fn to_sql(&self) -> OrmResult<String> {
        self.query.to_sql()
    }

    fn hydrate(&self, rows: Vec<Row>) -> Vec<Entity<'db, M, D>> {
        let db = self.query.database();
        rows.into_iter().map(|row| Entity::from_row(db, row)).collect()
    }

    pub fn fetch(&mut self) -> OrmResult<Vec<Entity<'db, M, D>>> {
        let rows = self.query.fetch()?;
        Ok(self.hydrate(rows))
    }

    /// Raw rows without hydration.
    pub fn fetch_rows(&mut self) -> OrmResult<Vec<Row>> {
        self.query.fetch()
    }

    pub fn count(&mut self) -> OrmResult<i64> {
        self.query.count()
    }

    pub fn first(&mut self) -> OrmResult<Option<Entity<'db, M, D>>> {
        let row = self.query.first()?;
        Ok(self.hydrate(row.into_iter().collect()).pop())
    }

    pub fn find(&mut self, id: impl Into<Value>) -> OrmResult<Option<Entity<'db, M, D>>> {
        let row = self.query.find(id)?;
        Ok(self.hydrate(row.into_iter().collect()).pop())
    }

    pub fn update(&mut self, row: &Row) -> OrmResult<u64> {
        self.query.update(row)
    }

    pub fn delete(&mut self) -> OrmResult<u64> {
        self.query.delete()
    }
}

impl<D: Driver> Database<D> {
    /// Start a query on `table`.
    pub fn table(&self, table: impl Into<TableRef>) -> Query<'_, D> {
        Query::new(self, table)
    }

    /// Start a query on the table of `M`.
    pub fn model<M: Model>(&self) -> ModelQuery<'_, M, D> {
        ModelQuery::new(self)
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::driver::SqliteDriver;

    fn db() -> Database<SqliteDriver> {
        let db = Database::with_config(
            SqliteDriver::open_in_memory().unwrap(),
            DatabaseConfig::new().with_logging(),
        );
        db.exec(
            "CREATE TABLE student (id INTEGER PRIMARY KEY, name TEXT, dorm_id INTEGER);
             INSERT INTO student (name, dorm_id) VALUES ('Mary', 1), ('John', 1), ('Sam', 2);",
        )
        .unwrap();
        db.clear_queries();
        db
    }

    #[test]
    fn terminal_call_resets_clauses_but_keeps_table() {
        let db = db();
        let mut query = db.table("student");
        query.and_eq("dorm_id", 1).order_by("name", Order::Asc);
        let names: Vec<String> = query
            .fetch()
            .unwrap()
            .iter()
            .map(|row| row.try_get("name").unwrap())
            .collect();
        assert_eq!(names, vec!["John", "Mary"]);

        assert_eq!(query.to_sql().unwrap(), "SELECT *\nFROM \"student\"");
        assert_eq!(query.count().unwrap(), 3);
    }

    #[test]
    fn find_and_first() {
        let db = db();
        let row = db.table("student").find(3).unwrap().unwrap();
        assert_eq!(row.try_get::<String>("name").unwrap(), "Sam");
        assert!(db.table("student").find(99).unwrap().is_none());

        let sql = &db.queries()[0].sql;
        assert!(sql.ends_with("WHERE ( \"id\" = ? )\nLIMIT 1"), "{sql}");
    }

    #[test]
    fn update_and_delete_use_where_chain() {
        let db = db();
        let mut query = db.table("student");
        let changed = query
            .and_eq("dorm_id", 2)
            .update(&Row::new().with("dorm_id", 3))
            .unwrap();
        assert_eq!(changed, 1);

        assert!(query.update(&Row::new().with("dorm_id", 3)).unwrap_err().is_illegal_update());
        assert!(query.delete().unwrap_err().is_illegal_delete());
        assert_eq!(query.and_eq("dorm_id", 1).delete().unwrap(), 2);
        assert_eq!(db.table("student").count().unwrap(), 1);
    }

    #[test]
    fn count_with_grouping() {
        let db = db();
        let groups = db.table("student").group_by("dorm_id").count().unwrap();
        assert_eq!(groups, 2);
    }
}
