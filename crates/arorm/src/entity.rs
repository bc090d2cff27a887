//! Active-record entities.
//!
//! An [`Entity`] wraps one row of a [`Model`]'s table and tracks which columns
//! changed since it was last saved. A stub built from a primary key loads the
//! row lazily on first read. Relationships declared on the model are resolved
//! on demand:
//! - `belongs_to` and `has_one` fetch a single related row, cached per alias
//!   until [`reload`](Entity::reload)
//! - `has_many` returns a pending [`ModelQuery`] for the caller to filter,
//!   fetch or count
//!
//! ```
//! # #[cfg(feature = "sqlite")]
//! # fn main() -> arorm::OrmResult<()> {
//! use arorm::{Database, Entity, Model, SqliteDriver};
//!
//! struct Dorm;
//!
//! impl Model for Dorm {
//!     const NAME: &'static str = "dorm";
//! }
//!
//! let db = Database::new(SqliteDriver::open_in_memory()?);
//! db.exec("CREATE TABLE dorm (id INTEGER PRIMARY KEY, name TEXT)")?;
//!
//! let mut north = Entity::<Dorm, _>::new(&db);
//! north.set("name", "North Hall");
//! assert!(north.save()?);
//! assert!(!north.save()?);
//!
//! let mut found = Entity::<Dorm, _>::with_id(&db, north.pk().clone());
//! assert_eq!(found.get("name")?, "North Hall".into());
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "sqlite"))]
//! # fn main() {}
//! ```

use crate::builder::{DeleteBuilder, InsertBuilder, MutationBuilder, QueryBuilder};
use crate::condition::Condition;
use crate::database::Database;
use crate::driver::Driver;
use crate::error::{OrmError, OrmResult};
use crate::model::Model;
use crate::query::{ModelQuery, Query};
use crate::registry::{ModelRelations, Relation, RelationKind};
use crate::row::{FromRow, Row};
use crate::value::{FromValue, Value, decode};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// A resolved entity property.
pub enum Property<'db, D: Driver> {
    /// Column value.
    Column(Value),
    /// `belongs_to`/`has_one` row, `None` when no row matches.
    One(Option<Row>),
    /// Pending query over the `has_many` rows.
    Many(Query<'db, D>),
}

impl<D: Driver> fmt::Debug for Property<'_, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Property::Column(value) => f.debug_tuple("Column").field(value).finish(),
            Property::One(row) => f.debug_tuple("One").field(row).finish(),
            Property::Many(query) => f.debug_tuple("Many").field(&query.to_sql()).finish(),
        }
    }
}

/// One row of `M`'s table with change tracking.
pub struct Entity<'db, M: Model, D: Driver> {
    db: &'db Database<D>,
    relations: Arc<ModelRelations>,
    object: Row,
    changed: BTreeSet<String>,
    related: HashMap<String, Row>,
    loaded: bool,
    saved: bool,
    _model: PhantomData<M>,
}

impl<'db, M: Model, D: Driver> Entity<'db, M, D> {
    /// A new row, inserted on the first [`save`](Self::save).
    pub fn new(db: &'db Database<D>) -> Self {
        Self {
            db,
            relations: db.registry().for_model::<M>(),
            object: Row::new(),
            changed: BTreeSet::new(),
            related: HashMap::new(),
            loaded: false,
            saved: false,
            _model: PhantomData,
        }
    }

    /// A stub for an existing row, loaded on first access.
    pub fn with_id(db: &'db Database<D>, id: impl Into<Value>) -> Self {
        let mut entity = Self::new(db);
        entity.object.set(M::PRIMARY_KEY, id);
        entity.saved = true;
        entity
    }

    /// An entity over a fetched row.
    ///
    /// A row carrying a primary key is taken as loaded and saved; a row without
    /// one is treated as new values pending insert.
    pub fn from_row(db: &'db Database<D>, row: Row) -> Self {
        let mut entity = Self::new(db);
        let has_pk = row.get(M::PRIMARY_KEY).is_some_and(|pk| !pk.is_empty_key());
        if has_pk {
            entity.object = row;
            entity.loaded = true;
            entity.saved = true;
        } else {
            entity.values(row);
        }
        entity
    }

    /// Load the entity whose primary key is `id`.
    pub fn find(db: &'db Database<D>, id: impl Into<Value>) -> OrmResult<Option<Self>> {
        let mut entity = Self::with_id(db, id);
        Ok(entity.load()?.then_some(entity))
    }

    /// Entities whose columns equal every value in `columns`.
    pub fn fetch_where(
        db: &'db Database<D>,
        columns: &Row,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> OrmResult<Vec<Self>> {
        let mut query = db.model::<M>();
        for (column, value) in columns.iter() {
            query.and_eq(column, value);
        }
        if let Some(limit) = limit {
            query.limit(limit);
        }
        if let Some(offset) = offset {
            query.offset(offset);
        }
        query.fetch()
    }

    /// Number of rows whose columns equal every value in `columns`.
    pub fn count_where(db: &'db Database<D>, columns: &Row) -> OrmResult<i64> {
        let mut query = db.model::<M>();
        for (column, value) in columns.iter() {
            query.and_eq(column, value);
        }
        query.count()
    }

    pub fn database(&self) -> &'db Database<D> {
        self.db
    }

    pub fn relations(&self) -> &ModelRelations {
        &self.relations
    }

    /// Primary key value (`Null` for a new entity).
    pub fn pk(&self) -> &Value {
        static NULL: Value = Value::Null;
        self.object.get(M::PRIMARY_KEY).unwrap_or(&NULL)
    }

    /// Whether the primary key is missing, NULL, zero or empty.
    pub fn empty_pk(&self) -> bool {
        self.pk().is_empty_key()
    }

    /// The full row has been read from storage.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// No changes are pending.
    pub fn is_saved(&self) -> bool {
        self.saved
    }

    /// Columns changed since the last save.
    pub fn changed(&self) -> impl Iterator<Item = &str> {
        self.changed.iter().map(String::as_str)
    }

    /// Current values without loading.
    pub fn row(&self) -> &Row {
        &self.object
    }

    // ==================== Column access ====================

    /// Value of a column, loading the row first.
    ///
    /// Fails with [`OrmError::MissingProperty`] when the row has no such column.
    pub fn get(&mut self, column: &str) -> OrmResult<Value> {
        self.load()?;
        self.object
            .get(column)
            .cloned()
            .ok_or_else(|| OrmError::missing_property(M::NAME, column))
    }

    /// Typed value of a column.
    pub fn get_as<T: FromValue>(&mut self, column: &str) -> OrmResult<T> {
        let value = self.get(column)?;
        decode(column, &value)
    }

    /// Set a column. Only a value that differs from the current one marks the
    /// column changed.
    pub fn set(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        let value = value.into();
        if self.object.get(column) != Some(&value) {
            self.object.set(column, value);
            self.changed.insert(column.to_string());
            self.saved = false;
        }
        self
    }

    /// Set several columns at once.
    pub fn values<K, V>(&mut self, values: impl IntoIterator<Item = (K, V)>) -> &mut Self
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (column, value) in values {
            self.set(column.as_ref(), value);
        }
        self
    }

    /// Whether a column or a resolved related row exists under `name`.
    pub fn is_set(&mut self, name: &str) -> OrmResult<bool> {
        self.load()?;
        Ok(self.object.contains(name) || self.related.contains_key(name))
    }

    /// Forget a column (and any related row cached under the same name).
    pub fn unset(&mut self, name: &str) -> OrmResult<()> {
        self.load()?;
        self.object.remove(name);
        self.changed.remove(name);
        self.related.remove(name);
        Ok(())
    }

    /// The row as a column map.
    pub fn to_array(&mut self) -> OrmResult<Row> {
        self.load()?;
        Ok(self.object.clone())
    }

    /// The row as a JSON object.
    pub fn to_object(&mut self) -> OrmResult<serde_json::Value> {
        self.load()?;
        Ok(self.object.to_json())
    }

    /// Map the row into `T`.
    pub fn hydrate<T: FromRow>(&mut self) -> OrmResult<T> {
        self.load()?;
        T::from_row(&self.object)
    }

    // ==================== Persistence ====================

    /// Read the row named by the primary key.
    ///
    /// Returns `Ok(false)` without querying when the key is empty, and
    /// `Ok(false)` when no row matches. Changes made before loading are kept
    /// on top of the loaded values.
    pub fn load(&mut self) -> OrmResult<bool> {
        if self.loaded {
            return Ok(true);
        }
        if self.empty_pk() {
            return Ok(false);
        }

        let mut qb = QueryBuilder::with_dialect(self.db.dialect());
        qb.from(M::TABLE)
            .and_eq(M::PRIMARY_KEY, self.pk().clone())
            .limit(1);
        let (sql, params) = qb.compile(false)?.into_parts();

        let Some(mut row) = self.db.fetch_uncached(&sql, &params)?.into_iter().next() else {
            return Ok(false);
        };
        for column in &self.changed {
            if let Some(value) = self.object.get(column) {
                row.set(column.as_str(), value.clone());
            }
        }
        self.object = row;
        self.loaded = true;
        self.saved = self.changed.is_empty();
        Ok(true)
    }

    /// Discard local state and read the row again.
    pub fn reload(&mut self) -> OrmResult<bool> {
        let pk = self.pk().clone();
        self.object.clear();
        self.changed.clear();
        self.related.clear();
        self.loaded = false;
        self.object.set(M::PRIMARY_KEY, pk);
        self.load()
    }

    /// Write pending changes.
    ///
    /// Inserts when the primary key is empty or was itself changed, otherwise
    /// updates only the changed columns. Returns whether a statement was
    /// issued.
    pub fn save(&mut self) -> OrmResult<bool> {
        if self.changed.is_empty() {
            return Ok(false);
        }

        let data: Row = self
            .changed
            .iter()
            .filter_map(|column| {
                self.object
                    .get(column)
                    .map(|value| (column.clone(), value.clone()))
            })
            .collect();

        if !self.empty_pk() && !self.changed.contains(M::PRIMARY_KEY) {
            let key = Row::new().with(M::PRIMARY_KEY, self.pk().clone());
            self.db.update(M::TABLE, &data, &key)?;
        } else {
            let id = self.db.insert(M::TABLE, &data)?;
            if self.empty_pk() && !id.is_null() {
                self.object.set(M::PRIMARY_KEY, id);
            }
            self.loaded = true;
        }

        self.changed.clear();
        self.saved = true;
        Ok(true)
    }

    /// Delete this row, cascading first when the model enables it.
    ///
    /// Returns the number of rows removed, cascaded rows included.
    pub fn delete(&self) -> OrmResult<u64> {
        self.delete_by_id(self.pk().clone())
    }

    /// Delete the row of `M` with primary key `id`, cascading first when the
    /// model enables it.
    pub fn delete_by_id(&self, id: impl Into<Value>) -> OrmResult<u64> {
        let id = self.require_id(id.into())?;
        self.db.transaction(|db| {
            let mut removed = 0;
            if M::CASCADE_DELETE {
                removed += self
                    .cascade(db, &id)
                    .map_err(|e| e.context(&format!("cascade delete of {} {id}", M::NAME)))?;
            }
            let mut builder = DeleteBuilder::new(M::TABLE);
            builder
                .dialect(db.dialect())
                .and_eq(M::PRIMARY_KEY, id.clone());
            removed += builder.execute(db)?;
            Ok(removed)
        })
    }

    /// Delete every `has_one` and `has_many` row owned by this entity while
    /// keeping the row itself. Join table rows are removed for `through`
    /// relationships, target rows otherwise.
    pub fn delete_all_relations(&self) -> OrmResult<u64> {
        let id = self.require_id(self.pk().clone())?;
        self.db.transaction(|db| self.cascade(db, &id))
    }

    fn require_id(&self, id: Value) -> OrmResult<Value> {
        if id.is_empty_key() {
            return Err(OrmError::IllegalDelete(format!(
                "no {} id given to delete",
                M::NAME
            )));
        }
        Ok(id)
    }

    fn cascade(&self, db: &Database<D>, id: &Value) -> OrmResult<u64> {
        let mut removed = 0;
        for relation in self.relations.has_one.values() {
            let mut builder = DeleteBuilder::new(&relation.model);
            builder
                .dialect(db.dialect())
                .and_eq(&relation.foreign_key, id.clone());
            removed += builder.execute(db)?;
        }
        for relation in self.relations.has_many.values() {
            let table = relation.through.as_deref().unwrap_or(&relation.model);
            let mut builder = DeleteBuilder::new(table);
            builder
                .dialect(db.dialect())
                .and_eq(&relation.foreign_key, id.clone());
            removed += builder.execute(db)?;
        }
        Ok(removed)
    }

    // ==================== Relationships ====================

    /// Resolve `name` as a column, a cached related row, or a relationship.
    ///
    /// Fails with [`OrmError::MissingProperty`] when `name` is none of them.
    pub fn property(&mut self, name: &str) -> OrmResult<Property<'db, D>> {
        self.load()?;
        if let Some(value) = self.object.get(name) {
            return Ok(Property::Column(value.clone()));
        }
        if let Some(row) = self.related.get(name) {
            return Ok(Property::One(Some(row.clone())));
        }
        match self.relations.get(name).map(|relation| relation.kind) {
            Some(RelationKind::BelongsTo | RelationKind::HasOne) => {
                Ok(Property::One(self.related_row(name)?))
            }
            Some(RelationKind::HasMany) => Ok(Property::Many(self.many_query(name)?)),
            None => Err(OrmError::missing_property(M::NAME, name)),
        }
    }

    /// The single row behind a `belongs_to` or `has_one` alias.
    pub fn related_row(&mut self, alias: &str) -> OrmResult<Option<Row>> {
        if let Some(row) = self.related.get(alias) {
            return Ok(Some(row.clone()));
        }

        let relation = self.relations.require(alias)?.clone();
        let key = match relation.kind {
            RelationKind::BelongsTo => {
                self.load()?;
                self.object.get(&relation.foreign_key).cloned()
            }
            RelationKind::HasOne => Some(self.pk().clone()),
            RelationKind::HasMany => {
                return Err(OrmError::unknown_relation(
                    M::NAME,
                    format!("{alias} (has_many has no single row)"),
                ));
            }
        };
        let Some(key) = key.filter(|key| !key.is_null()) else {
            return Ok(None);
        };
        if relation.kind == RelationKind::HasOne && key.is_empty_key() {
            return Ok(None);
        }

        let column = match relation.kind {
            RelationKind::BelongsTo => &relation.target_key,
            _ => &relation.foreign_key,
        };
        let mut qb = QueryBuilder::with_dialect(self.db.dialect());
        qb.from(relation.model.as_str()).and_eq(column, key).limit(1);
        let (sql, params) = qb.compile(false)?.into_parts();

        let row = self.db.fetch_uncached(&sql, &params)?.into_iter().next();
        if let Some(row) = &row {
            self.related.insert(alias.to_string(), row.clone());
        }
        Ok(row)
    }

    /// Pending query over the rows behind a `has_many` alias.
    ///
    /// With a `through` table the target rows are joined to it:
    /// `SELECT t2.*, t1.* FROM target AS t1 LEFT JOIN through AS t2
    /// ON t2.far_key = t1.target_key WHERE t2.foreign_key = ?`.
    pub fn many_query(&self, alias: &str) -> OrmResult<Query<'db, D>> {
        Ok(self.scoped_query(self.many_relation(alias)?))
    }

    fn many_relation(&self, alias: &str) -> OrmResult<&Relation> {
        self.relations
            .has_many
            .get(alias)
            .ok_or_else(|| OrmError::unknown_relation(M::NAME, alias))
    }

    fn scoped_query(&self, relation: &Relation) -> Query<'db, D> {
        let pk = self.pk().clone();
        match (&relation.through, &relation.far_key) {
            (Some(through), Some(far_key)) => {
                let mut query = Query::new(self.db, (relation.model.as_str(), "t1"));
                let far = format!("t2.{far_key}");
                let target = format!("t1.{}", relation.target_key);
                query
                    .select("t2.*, t1.*")
                    .left_join((through.as_str(), "t2"), &[(far.as_str(), target.as_str())])
                    .and_eq(&format!("t2.{}", relation.foreign_key), pk)
                    .primary_key(&target);
                query
            }
            _ => {
                let mut query = Query::new(self.db, relation.model.as_str());
                query
                    .and_eq(&relation.foreign_key, pk)
                    .primary_key(&relation.target_key);
                query
            }
        }
    }

    /// The `belongs_to` entity behind `alias`.
    pub fn belongs_to<R: Model>(&mut self, alias: &str) -> OrmResult<Option<Entity<'db, R, D>>> {
        self.expect_kind(alias, RelationKind::BelongsTo)?;
        let row = self.related_row(alias)?;
        Ok(row.map(|row| Entity::from_row(self.db, row)))
    }

    /// The `has_one` entity behind `alias`.
    pub fn has_one<R: Model>(&mut self, alias: &str) -> OrmResult<Option<Entity<'db, R, D>>> {
        self.expect_kind(alias, RelationKind::HasOne)?;
        let row = self.related_row(alias)?;
        Ok(row.map(|row| Entity::from_row(self.db, row)))
    }

    /// Pending typed query over the `has_many` entities behind `alias`.
    ///
    /// Through a join table the target is aliased `t1`, so `find` matches
    /// `t1.<primary key>`.
    pub fn has_many<R: Model>(&self, alias: &str) -> OrmResult<ModelQuery<'db, R, D>> {
        let relation = self.many_relation(alias)?;
        let mut query = self.scoped_query(relation);
        match relation.through {
            Some(_) => query.primary_key(&format!("t1.{}", R::PRIMARY_KEY)),
            None => query.primary_key(R::PRIMARY_KEY),
        };
        Ok(ModelQuery::from_query(query))
    }

    fn expect_kind(&self, alias: &str, kind: RelationKind) -> OrmResult<()> {
        match self.relations.get(alias) {
            Some(relation) if relation.kind == kind => Ok(()),
            _ => Err(OrmError::unknown_relation(M::NAME, alias)),
        }
    }

    // ==================== Many-to-many links ====================

    fn link_keys<R: Model>(&self, alias: &str, other: &Entity<'_, R, D>) -> OrmResult<(String, Row)> {
        let (relation, through, far_key) = self.relations.require_through(alias)?;
        if self.empty_pk() || other.empty_pk() {
            return Err(OrmError::validation(format!(
                "{}::{alias} links need saved entities on both sides",
                M::NAME
            )));
        }
        let keys = Row::new()
            .with(relation.foreign_key.as_str(), self.pk().clone())
            .with(far_key, other.pk().clone());
        Ok((through.to_string(), keys))
    }

    /// Link `other` through the join table of `alias`.
    pub fn add<R: Model>(&self, alias: &str, other: &Entity<'_, R, D>) -> OrmResult<()> {
        let (through, keys) = self.link_keys(alias, other)?;
        let mut builder = InsertBuilder::new(&through);
        builder.dialect(self.db.dialect()).values(&keys);
        builder.execute(self.db)?;
        Ok(())
    }

    /// Remove the join table rows linking `other`. Returns whether any existed.
    pub fn remove<R: Model>(&self, alias: &str, other: &Entity<'_, R, D>) -> OrmResult<bool> {
        let (through, keys) = self.link_keys(alias, other)?;
        let mut builder = DeleteBuilder::new(&through);
        builder.dialect(self.db.dialect());
        for (column, value) in keys.iter() {
            builder.and_where(Condition::eq(column, value));
        }
        Ok(builder.execute(self.db)? > 0)
    }

    /// Whether `other` is linked through the join table of `alias`.
    pub fn has<R: Model>(&self, alias: &str, other: &Entity<'_, R, D>) -> OrmResult<bool> {
        let (through, keys) = self.link_keys(alias, other)?;
        let mut qb = QueryBuilder::with_dialect(self.db.dialect());
        qb.from(through.as_str());
        for (column, value) in keys.iter() {
            qb.and_eq(column, value);
        }
        let (sql, params) = qb.compile(true)?.into_parts();
        Ok(self.db.count_uncached(&sql, &params)? > 0)
    }
}

impl<M: Model, D: Driver> fmt::Debug for Entity<'_, M, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("model", &M::NAME)
            .field("object", &self.object)
            .field("changed", &self.changed)
            .field("loaded", &self.loaded)
            .field("saved", &self.saved)
            .finish_non_exhaustive()
    }
}
