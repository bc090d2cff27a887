//! Structured SQL builders.
//!
//! - [`QueryBuilder`] accumulates SELECT clauses and compiles them once.
//! - [`InsertBuilder`], [`UpdateBuilder`] and [`DeleteBuilder`] assemble
//!   parameterized mutations from column maps and condition chains.
//! - Every builder emits `"quoted"` identifiers and `?` placeholders; the
//!   executor adapts both to the connected dialect.
//! - UPDATE and DELETE refuse to build without a WHERE condition.

pub mod delete;
pub mod insert;
pub mod select;
pub mod traits;
pub mod update;
pub mod where_builder;

pub use delete::DeleteBuilder;
pub use insert::InsertBuilder;
pub use select::{BuiltQuery, JoinType, Order, QueryBuilder};
pub use traits::{MutationBuilder, SqlBuilder};
pub use update::UpdateBuilder;
pub use where_builder::{Conjunction, WhereBuilder};

#[cfg(test)]
mod tests;
