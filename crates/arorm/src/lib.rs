//! # arorm
//!
//! A fluent SQL query builder with a lazy-loading active-record layer.
//!
//! ## Features
//!
//! - **Clause accumulator**: [`QueryBuilder`] collects SELECT/FROM/JOIN/WHERE/
//!   GROUP BY/HAVING/ORDER BY/LIMIT clauses and compiles them once into
//!   parameterized SQL, resetting itself afterwards
//! - **Explicit conditions**: [`Condition`] separates quoted column comparisons
//!   from raw SQL fragments; IN lists are escaped inline
//! - **Statement executor**: [`Database`] applies the dialect filter, caches
//!   prepared statements and SELECT results, and logs every statement through
//!   `tracing` and an optional in-memory query log
//! - **Active record**: [`Entity`] tracks changed columns, loads lazily and
//!   resolves `belongs_to`/`has_one`/`has_many` relationships declared on a
//!   [`Model`], including many-to-many links through a join table
//! - **Safe defaults**: DELETE and UPDATE require a WHERE clause
//!
//! ## Example
//!
//! ```
//! # #[cfg(feature = "sqlite")]
//! # fn main() -> arorm::OrmResult<()> {
//! use arorm::prelude::*;
//!
//! struct Student;
//!
//! impl Model for Student {
//!     const NAME: &'static str = "student";
//!
//!     fn relations() -> RelationDefs {
//!         RelationDefs::new().belongs_to("dorm", RelationDef::new())
//!     }
//! }
//!
//! let db = Database::new(SqliteDriver::open_in_memory()?);
//! db.exec(
//!     "CREATE TABLE dorm (id INTEGER PRIMARY KEY, name TEXT);
//!      CREATE TABLE student (id INTEGER PRIMARY KEY, name TEXT, dorm_id INTEGER);
//!      INSERT INTO dorm (name) VALUES ('North');",
//! )?;
//!
//! let mut mary = Entity::<Student, _>::new(&db);
//! mary.set("name", "Mary").set("dorm_id", 1);
//! mary.save()?;
//!
//! let dorm = mary.related_row("dorm")?.expect("dorm 1 exists");
//! assert_eq!(dorm.try_get::<String>("name")?, "North");
//!
//! let names: Vec<String> = db
//!     .table("student")
//!     .and_where(Condition::like("name", "M%"))
//!     .fetch()?
//!     .iter()
//!     .map(|row| row.try_get("name"))
//!     .collect::<OrmResult<_>>()?;
//! assert_eq!(names, ["Mary"]);
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "sqlite"))]
//! # fn main() {}
//! ```

pub mod builder;
pub mod cache;
pub mod condition;
pub mod config;
pub mod database;
pub mod dialect;
pub mod driver;
pub mod entity;
pub mod error;
pub mod ident;
pub mod instance;
pub mod model;
pub mod monitor;
pub mod prelude;
pub mod query;
pub mod registry;
pub mod row;
pub mod value;

mod statement_cache;

pub use builder::{
    BuiltQuery, Conjunction, DeleteBuilder, InsertBuilder, JoinType, MutationBuilder, Order,
    QueryBuilder, SqlBuilder, UpdateBuilder, WhereBuilder,
};
pub use cache::{MemoryCache, ResultCache, cache_key};
pub use condition::{Condition, Op};
pub use config::{ConnectionConfig, DatabaseConfig, StatementCacheConfig};
pub use database::{Database, PreparedStatement};
pub use dialect::Dialect;
pub use driver::{Connect, Driver};
pub use entity::{Entity, Property};
pub use error::{OrmError, OrmResult};
pub use ident::TableRef;
pub use instance::Instances;
pub use model::Model;
pub use monitor::{
    CompositeMonitor, NoopMonitor, QueryContext, QueryLogEntry, QueryMonitor, QueryResult,
    QueryStats, QueryType, StatsMonitor, TracingMonitor,
};
pub use query::{ModelQuery, Query};
pub use registry::{ModelRelations, Registry, Relation, RelationDef, RelationDefs, RelationKind};
pub use row::{FromRow, Row};
pub use value::{FromValue, Value};

#[cfg(feature = "sqlite")]
pub use driver::SqliteDriver;

#[cfg(feature = "postgres")]
pub use driver::PgDriver;
