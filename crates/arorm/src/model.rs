//! Model declarations.
//!
//! A model is a zero-sized marker type naming a table and its relationships:
//!
//! ```
//! use arorm::{Model, RelationDef, RelationDefs};
//!
//! struct Student;
//!
//! impl Model for Student {
//!     const NAME: &'static str = "student";
//!     const CASCADE_DELETE: bool = true;
//!
//!     fn relations() -> RelationDefs {
//!         RelationDefs::new()
//!             .has_many("clubs", RelationDef::new().through("memberships"))
//!             .has_one("car", RelationDef::new())
//!             .belongs_to("dorm", RelationDef::new())
//!     }
//! }
//!
//! assert_eq!(Student::TABLE, "student");
//! ```

use crate::registry::RelationDefs;

pub trait Model: 'static {
    /// Model name; prefixes the default foreign keys of `has_one`/`has_many`.
    const NAME: &'static str;

    /// Table holding the rows.
    const TABLE: &'static str = Self::NAME;

    const PRIMARY_KEY: &'static str = "id";

    const FOREIGN_KEY_SUFFIX: &'static str = "_id";

    /// Delete owned `has_one`/`has_many` rows together with the entity.
    const CASCADE_DELETE: bool = false;

    /// Declared relationships. Resolved once per model by the
    /// [`Registry`](crate::Registry).
    fn relations() -> RelationDefs {
        RelationDefs::new()
    }

    /// Foreign key other tables use to point at this model.
    fn foreign_key() -> String {
        format!("{}{}", Self::NAME, Self::FOREIGN_KEY_SUFFIX)
    }
}
