//! Relationship registry.
//!
//! Relationship declarations ([`RelationDefs`]) are resolved into
//! [`Relation`]s once per model name and shared by every entity of that model.

use crate::error::{OrmError, OrmResult};
use crate::model::Model;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

/// Relationship cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// This row holds the foreign key of the target.
    BelongsTo,
    /// The target row holds this row's key.
    HasOne,
    /// Many target rows hold this row's key, directly or through a join table.
    HasMany,
}

/// Overrides for one declared relationship. Unset fields take the defaults
/// described on [`Registry`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationDef {
    model: Option<String>,
    foreign_key: Option<String>,
    through: Option<String>,
    far_key: Option<String>,
    target_key: Option<String>,
}

impl RelationDef {
    pub fn new() -> Self {
        Self::default()
    }

    /// Target model (table) name.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn foreign_key(mut self, column: impl Into<String>) -> Self {
        self.foreign_key = Some(column.into());
        self
    }

    /// Join table of a many-to-many relationship.
    pub fn through(mut self, table: impl Into<String>) -> Self {
        self.through = Some(table.into());
        self
    }

    /// Join table column pointing at the target row.
    pub fn far_key(mut self, column: impl Into<String>) -> Self {
        self.far_key = Some(column.into());
        self
    }

    /// Target column matched by the key (defaults to `id`).
    pub fn target_key(mut self, column: impl Into<String>) -> Self {
        self.target_key = Some(column.into());
        self
    }
}

/// Declared relationships of a model, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct RelationDefs {
    entries: Vec<(RelationKind, String, RelationDef)>,
}

impl RelationDefs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn belongs_to(self, alias: impl Into<String>, def: RelationDef) -> Self {
        self.push(RelationKind::BelongsTo, alias, def)
    }

    pub fn has_one(self, alias: impl Into<String>, def: RelationDef) -> Self {
        self.push(RelationKind::HasOne, alias, def)
    }

    pub fn has_many(self, alias: impl Into<String>, def: RelationDef) -> Self {
        self.push(RelationKind::HasMany, alias, def)
    }

    fn push(mut self, kind: RelationKind, alias: impl Into<String>, def: RelationDef) -> Self {
        self.entries.push((kind, alias.into(), def));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A resolved relationship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub kind: RelationKind,
    pub alias: String,
    /// Target model (and table) name.
    pub model: String,
    /// For `belongs_to`, the column on this row; otherwise the column on the
    /// target (or join) table holding this row's key.
    pub foreign_key: String,
    pub through: Option<String>,
    /// Join table column holding the target key (`has_many` only).
    pub far_key: Option<String>,
    pub target_key: String,
}

/// Every resolved relationship of one model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelRelations {
    pub model: String,
    pub belongs_to: BTreeMap<String, Relation>,
    pub has_one: BTreeMap<String, Relation>,
    pub has_many: BTreeMap<String, Relation>,
}

impl ModelRelations {
    /// Resolve declarations for a model named `model` whose foreign keys end
    /// in `suffix`.
    pub fn resolve(model: &str, suffix: &str, defs: RelationDefs) -> Self {
        let mut out = ModelRelations {
            model: model.to_string(),
            ..Self::default()
        };

        for (kind, alias, def) in defs.entries {
            let target_key = def.target_key.unwrap_or_else(|| "id".to_string());
            let relation = match kind {
                RelationKind::BelongsTo => {
                    let target = def.model.unwrap_or_else(|| alias.clone());
                    Relation {
                        kind,
                        foreign_key: def.foreign_key.unwrap_or_else(|| format!("{alias}{suffix}")),
                        model: target,
                        through: None,
                        far_key: None,
                        alias: alias.clone(),
                        target_key,
                    }
                }
                RelationKind::HasOne => Relation {
                    kind,
                    model: def.model.unwrap_or_else(|| alias.clone()),
                    foreign_key: def.foreign_key.unwrap_or_else(|| format!("{model}{suffix}")),
                    through: None,
                    far_key: None,
                    alias: alias.clone(),
                    target_key,
                },
                RelationKind::HasMany => {
                    let target = def.model.unwrap_or_else(|| singular(&alias));
                    let far_key = def.far_key.unwrap_or_else(|| format!("{target}{suffix}"));
                    Relation {
                        kind,
                        foreign_key: def.foreign_key.unwrap_or_else(|| format!("{model}{suffix}")),
                        far_key: Some(far_key),
                        through: def.through,
                        model: target,
                        alias: alias.clone(),
                        target_key,
                    }
                }
            };

            let map = match kind {
                RelationKind::BelongsTo => &mut out.belongs_to,
                RelationKind::HasOne => &mut out.has_one,
                RelationKind::HasMany => &mut out.has_many,
            };
            map.insert(alias, relation);
        }

        out
    }

    /// Look an alias up in every relationship map.
    pub fn get(&self, alias: &str) -> Option<&Relation> {
        self.belongs_to
            .get(alias)
            .or_else(|| self.has_one.get(alias))
            .or_else(|| self.has_many.get(alias))
    }

    /// Look an alias up, failing with [`OrmError::UnknownRelation`].
    pub fn require(&self, alias: &str) -> OrmResult<&Relation> {
        self.get(alias)
            .ok_or_else(|| OrmError::unknown_relation(&self.model, alias))
    }

    /// The `has_many` relationship behind `alias`, which must have a join table.
    pub fn require_through(&self, alias: &str) -> OrmResult<(&Relation, &str, &str)> {
        let relation = self
            .has_many
            .get(alias)
            .ok_or_else(|| OrmError::unknown_relation(&self.model, alias))?;
        match (relation.through.as_deref(), relation.far_key.as_deref()) {
            (Some(through), Some(far_key)) => Ok((relation, through, far_key)),
            _ => Err(OrmError::unknown_relation(
                &self.model,
                format!("{alias} (no through table)"),
            )),
        }
    }
}

/// Shared cache of resolved relationships, keyed by model name.
///
/// Defaults applied when a [`RelationDef`] leaves a field unset:
/// - `belongs_to(alias)`: target `alias`, foreign key `alias + suffix` on this row
/// - `has_one(alias)`: target `alias`, foreign key `model + suffix` on the target
/// - `has_many(alias)`: target `singular(alias)`, foreign key `model + suffix`,
///   far key `singular(alias) + suffix` (only used with a `through` table)
///
/// Entries are computed on first use and never evicted.
#[derive(Debug, Default)]
pub struct Registry {
    models: RwLock<HashMap<String, Arc<ModelRelations>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolved relationships of `M`, computing them on first use.
    pub fn for_model<M: Model>(&self) -> Arc<ModelRelations> {
        self.get_or_resolve(M::NAME, || {
            ModelRelations::resolve(M::NAME, M::FOREIGN_KEY_SUFFIX, M::relations())
        })
    }

    /// Cached entry for `name`, or the result of `resolve` stored under it.
    ///
    /// Concurrent first use resolves under the write lock, so every caller
    /// observes the same entry.
    pub fn get_or_resolve(&self, name: &str, resolve: impl FnOnce() -> ModelRelations) -> Arc<ModelRelations> {
        if let Some(found) = self
            .models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return Arc::clone(found);
        }

        let mut models = self.models.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            models
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(resolve())),
        )
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// English singular of a plural alias (`clubs` -> `club`, `dormitories` -> `dormitory`).
pub fn singular(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ies") {
        if !stem.is_empty() {
            return format!("{stem}y");
        }
    }
    for suffix in ["sses", "shes", "ches", "xes"] {
        if word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    match word.strip_suffix('s') {
        Some(stem) if !stem.is_empty() && !stem.ends_with('s') && !stem.ends_with('u') => {
            stem.to_string()
        }
        _ => word.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Student;

    impl Model for Student {
        const NAME: &'static str = "student";

        fn relations() -> RelationDefs {
            RelationDefs::new()
                .has_many("clubs", RelationDef::new().through("memberships"))
                .has_one("car", RelationDef::new())
                .belongs_to("dorm", RelationDef::new())
        }
    }

    struct Dorm;

    impl Model for Dorm {
        const NAME: &'static str = "dorm";

        fn relations() -> RelationDefs {
            RelationDefs::new().has_many("students", RelationDef::new())
        }
    }

    #[test]
    fn default_keys() {
        let registry = Registry::new();
        let student = registry.for_model::<Student>();

        let dorm = &student.belongs_to["dorm"];
        assert_eq!(dorm.model, "dorm");
        assert_eq!(dorm.foreign_key, "dorm_id");

        let car = &student.has_one["car"];
        assert_eq!(car.model, "car");
        assert_eq!(car.foreign_key, "student_id");

        let clubs = &student.has_many["clubs"];
        assert_eq!(clubs.model, "club");
        assert_eq!(clubs.foreign_key, "student_id");
        assert_eq!(clubs.through.as_deref(), Some("memberships"));
        assert_eq!(clubs.far_key.as_deref(), Some("club_id"));
        assert_eq!(clubs.target_key, "id");

        let students = &registry.for_model::<Dorm>().has_many["students"];
        assert_eq!(students.model, "student");
        assert_eq!(students.foreign_key, "dorm_id");
        assert_eq!(students.through, None);
    }

    #[test]
    fn overrides_win() {
        let relations = ModelRelations::resolve(
            "student",
            "_fk",
            RelationDefs::new().belongs_to(
                "home",
                RelationDef::new().model("dorm").foreign_key("home_dorm").target_key("dorm_no"),
            ),
        );
        let home = relations.require("home").unwrap();
        assert_eq!(home.model, "dorm");
        assert_eq!(home.foreign_key, "home_dorm");
        assert_eq!(home.target_key, "dorm_no");
        assert!(relations.require("nothing").is_err());
    }

    #[test]
    fn resolved_once_per_model() {
        let registry = Registry::new();
        let a = registry.for_model::<Student>();
        let b = registry.for_model::<Student>();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("student"));
    }

    #[test]
    fn through_is_required_for_link_operations() {
        let registry = Registry::new();
        assert!(registry.for_model::<Student>().require_through("clubs").is_ok());
        let err = registry.for_model::<Dorm>().require_through("students").unwrap_err();
        assert!(matches!(err, OrmError::UnknownRelation { .. }));
    }

    #[test]
    fn singularize() {
        assert_eq!(singular("clubs"), "club");
        assert_eq!(singular("students"), "student");
        assert_eq!(singular("dormitories"), "dormitory");
        assert_eq!(singular("classes"), "class");
        assert_eq!(singular("boxes"), "box");
        assert_eq!(singular("status"), "status");
        assert_eq!(singular("car"), "car");
    }
}
