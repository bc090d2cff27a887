//! Named database instances.
//!
//! Applications that talk to several databases register each under a name
//! the first time it is requested with a [`ConnectionConfig`], and look it up
//! by name afterwards. Every instance shares one relationship [`Registry`].

use crate::config::{ConnectionConfig, DatabaseConfig};
use crate::database::Database;
use crate::driver::Connect;
use crate::error::{OrmError, OrmResult};
use crate::registry::Registry;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

struct Instance<D: Connect> {
    config: ConnectionConfig,
    db: Rc<Database<D>>,
}

/// Connections by name.
pub struct Instances<D: Connect> {
    instances: HashMap<String, Instance<D>>,
    registry: Arc<Registry>,
    config: DatabaseConfig,
}

impl<D: Connect> Default for Instances<D> {
    fn default() -> Self {
        Self::new(DatabaseConfig::default())
    }
}

impl<D: Connect> Instances<D> {
    /// Instances whose connections all use `config`.
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            instances: HashMap::new(),
            registry: Arc::new(Registry::new()),
            config,
        }
    }

    /// Share an existing relationship registry with every instance.
    pub fn with_registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = registry;
        self
    }

    /// The instance registered as `name`.
    ///
    /// Connects and registers it when `config` is given and the name is new,
    /// or when the stored configuration differs and the existing connection is
    /// not persistent. Fails with [`OrmError::Configuration`] for an unknown
    /// name without configuration.
    pub fn get(&mut self, name: &str, config: Option<&ConnectionConfig>) -> OrmResult<Rc<Database<D>>> {
        if let Some(instance) = self.instances.get(name) {
            let reuse = match config {
                None => true,
                Some(config) => instance.config.persistent || instance.config == *config,
            };
            if reuse {
                return Ok(Rc::clone(&instance.db));
            }
        }

        let Some(config) = config else {
            return Err(OrmError::configuration(format!(
                "Database configuration not found for {name}"
            )));
        };

        let db = Database::with_config(D::connect(config)?, self.config.clone())
            .with_registry(Arc::clone(&self.registry));
        let db = Rc::new(db);
        tracing::debug!(target: "arorm.sql", instance = name, dialect = ?db.dialect(), "connected");
        self.instances.insert(
            name.to_string(),
            Instance {
                config: config.clone(),
                db: Rc::clone(&db),
            },
        );
        Ok(db)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.instances.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Forget `name`. The connection closes once the last handle is dropped.
    pub fn disconnect(&mut self, name: &str) -> bool {
        self.instances.remove(name).is_some()
    }

    /// Forget every instance that is not persistent.
    pub fn disconnect_all(&mut self) {
        self.instances.retain(|_, instance| instance.config.persistent);
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::driver::SqliteDriver;

    fn memory() -> ConnectionConfig {
        ConnectionConfig::new("sqlite::memory:")
    }

    #[test]
    fn unknown_instance_needs_configuration() {
        let mut instances = Instances::<SqliteDriver>::default();
        let err = instances.get("main", None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: Database configuration not found for main"
        );
    }

    #[test]
    fn registered_instance_is_reused() {
        let mut instances = Instances::<SqliteDriver>::new(DatabaseConfig::new().with_logging());
        let first = instances.get("main", Some(&memory())).unwrap();
        first.exec("CREATE TABLE t (id INTEGER PRIMARY KEY)").unwrap();

        let again = instances.get("main", None).unwrap();
        assert!(Rc::ptr_eq(&first, &again));
        assert!(again.config().log_queries);
        assert!(Arc::ptr_eq(again.registry(), instances.registry()));
    }

    #[test]
    fn disconnect_all_keeps_persistent() {
        let mut instances = Instances::<SqliteDriver>::default();
        instances.get("cache", Some(&memory().persistent(true))).unwrap();
        instances.get("scratch", Some(&memory())).unwrap();
        assert_eq!(instances.len(), 2);

        instances.disconnect_all();
        assert!(instances.contains("cache"));
        assert!(!instances.contains("scratch"));
        assert!(instances.disconnect("cache"));
        assert!(instances.is_empty());
    }
}
