//! Explicit logical-name to manager registry.

use crate::error::MapResult;
use crate::model::record::Entity;
use crate::repo::manager::{Manager, RecordSource};
use crate::storage::Storage;
use log::debug;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, PoisonError};

/// Builds one manager instance over the registry's storage.
pub type ManagerFactory =
    Box<dyn Fn(Arc<dyn Storage>) -> MapResult<Arc<dyn RecordSource>> + Send + Sync>;

/// Manager registration/lookup errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    InvalidName(String),
    DuplicateName(String),
    NotFound(String),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName(value) => write!(f, "manager name is invalid: {value}"),
            Self::DuplicateName(value) => write!(f, "manager name already registered: {value}"),
            Self::NotFound(value) => write!(f, "manager not found: {value}"),
        }
    }
}

impl Error for RegistryError {}

/// Registry of manager factories, scoped to one storage handle.
///
/// `resolve` builds each manager at most once and hands out the same
/// instance afterwards; `fresh` always builds a new one.
pub struct ManagerRegistry {
    storage: Arc<dyn Storage>,
    factories: BTreeMap<String, ManagerFactory>,
    instances: Mutex<BTreeMap<String, Arc<dyn RecordSource>>>,
}

impl ManagerRegistry {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            factories: BTreeMap::new(),
            instances: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Registers one factory under `name`.
    pub fn register<F>(&mut self, name: &str, factory: F) -> Result<(), RegistryError>
    where
        F: Fn(Arc<dyn Storage>) -> MapResult<Arc<dyn RecordSource>> + Send + Sync + 'static,
    {
        let name = name.trim().to_string();
        if !is_valid_manager_name(&name) {
            return Err(RegistryError::InvalidName(name));
        }
        if self.factories.contains_key(name.as_str()) {
            return Err(RegistryError::DuplicateName(name));
        }

        self.factories.insert(name, Box::new(factory));
        Ok(())
    }

    /// Registers `Manager<E>` under `name`.
    pub fn register_entity<E: Entity + 'static>(&mut self, name: &str) -> Result<(), RegistryError> {
        self.register(name, |storage| {
            let manager: Arc<dyn RecordSource> = Arc::new(Manager::<E>::new(storage)?);
            Ok(manager)
        })
    }

    /// Returns the shared manager for `name`, building it on first use.
    pub fn resolve(&self, name: &str) -> MapResult<Arc<dyn RecordSource>> {
        let name = name.trim();
        let mut instances = self
            .instances
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(manager) = instances.get(name) {
            return Ok(Arc::clone(manager));
        }

        let manager = self.build(name)?;
        instances.insert(name.to_string(), Arc::clone(&manager));
        debug!("event=manager_resolve module=registry status=built name={name}");
        Ok(manager)
    }

    /// Builds a new, unshared manager for `name`.
    pub fn fresh(&self, name: &str) -> MapResult<Arc<dyn RecordSource>> {
        self.build(name.trim())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name.trim())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    fn build(&self, name: &str) -> MapResult<Arc<dyn RecordSource>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        factory(Arc::clone(&self.storage))
    }
}

fn is_valid_manager_name(value: &str) -> bool {
    if value.is_empty() {
        return false;
    }
    value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}
