//! Convenient imports for typical `arorm` usage.
//!
//! ```
//! use arorm::prelude::*;
//! ```

pub use crate::{
    Condition, Database, DatabaseConfig, Entity, FromRow, Model, MutationBuilder, Op, Order,
    OrmError, OrmResult, Property, QueryBuilder, RelationDef, RelationDefs, Row, SqlBuilder, Value,
};

#[cfg(feature = "sqlite")]
pub use crate::SqliteDriver;

#[cfg(feature = "postgres")]
pub use crate::PgDriver;
