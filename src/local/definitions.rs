//! In-memory definition storage and an explicit definition cache.

use crate::components::{ComponentError, ContextComponent, DefinitionStore};
use crate::context::{ContextError, ContextSlice};
use crate::definition::StateMachine;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

const LOCATION_KEY: &str = "location";

/// Shared map of definition id to parsed definition.
///
/// Cloning shares the same underlying map, so one cache handed to several
/// stores lives as long as the longest holder (typically the process).
#[derive(Clone, Debug, Default)]
pub struct DefinitionCache {
    entries: Arc<RwLock<HashMap<String, Arc<StateMachine>>>>,
}

impl DefinitionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, definition_id: &str) -> Option<Arc<StateMachine>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(definition_id)
            .cloned()
    }

    pub fn insert(&self, definition_id: &str, definition: Arc<StateMachine>) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(definition_id.to_string(), definition);
    }

    pub fn contains(&self, definition_id: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(definition_id)
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Definition store keeping everything in memory, keyed by content hash.
///
/// An optional `location` names where the definitions live. It travels in
/// the context so a store hydrated elsewhere points at the same place.
#[derive(Debug, Default)]
pub struct LocalDefinitionStore {
    definitions: DefinitionCache,
    location: RwLock<Option<String>>,
}

impl LocalDefinitionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store backed by an existing (possibly shared) map.
    pub fn with_cache(definitions: DefinitionCache) -> Self {
        Self {
            definitions,
            location: RwLock::new(None),
        }
    }

    pub fn with_location(self, location: impl Into<String>) -> Self {
        *self.location.write().unwrap_or_else(PoisonError::into_inner) = Some(location.into());
        self
    }

    pub fn location(&self) -> Option<String> {
        self.location
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl ContextComponent for LocalDefinitionStore {
    fn namespace(&self) -> &'static str {
        "definitions"
    }

    fn export_context(&self) -> Result<ContextSlice, ContextError> {
        let mut slice = ContextSlice::new();
        if let Some(location) = self.location() {
            slice.put(LOCATION_KEY, &location)?;
        }
        Ok(slice)
    }
}

impl DefinitionStore for LocalDefinitionStore {
    fn put_anonymous(&self, definition: &StateMachine) -> Result<String, ComponentError> {
        let definition_id = definition.content_hash();
        if self.definitions.contains(&definition_id) {
            debug!(definition_id = %definition_id, "definition already stored");
        } else {
            self.definitions
                .insert(&definition_id, Arc::new(definition.clone()));
            debug!(definition_id = %definition_id, "stored definition");
        }
        Ok(definition_id)
    }

    fn hydrate_definition(&self, definition_id: &str) -> Result<Arc<StateMachine>, ComponentError> {
        self.definitions
            .get(definition_id)
            .ok_or_else(|| ComponentError::NotFound {
                kind: "definition",
                id: definition_id.to_string(),
            })
    }

    fn import_context(&self, slice: &ContextSlice) -> Result<(), ContextError> {
        let location: Option<String> = slice.get_as(LOCATION_KEY)?;
        *self.location.write().unwrap_or_else(PoisonError::into_inner) = location;
        Ok(())
    }
}

/// Read-through cache in front of any definition store.
///
/// Hydration is served from the cache when possible and only falls back to
/// the wrapped store on a miss.
#[derive(Debug)]
pub struct CachingDefinitionStore<S> {
    inner: S,
    cache: DefinitionCache,
}

impl<S: DefinitionStore> CachingDefinitionStore<S> {
    pub fn new(inner: S, cache: DefinitionCache) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &DefinitionCache {
        &self.cache
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: DefinitionStore> ContextComponent for CachingDefinitionStore<S> {
    fn namespace(&self) -> &'static str {
        self.inner.namespace()
    }

    fn export_context(&self) -> Result<ContextSlice, ContextError> {
        self.inner.export_context()
    }
}

impl<S: DefinitionStore> DefinitionStore for CachingDefinitionStore<S> {
    fn put_anonymous(&self, definition: &StateMachine) -> Result<String, ComponentError> {
        let definition_id = self.inner.put_anonymous(definition)?;
        if !self.cache.contains(&definition_id) {
            self.cache
                .insert(&definition_id, Arc::new(definition.clone()));
        }
        Ok(definition_id)
    }

    fn hydrate_definition(&self, definition_id: &str) -> Result<Arc<StateMachine>, ComponentError> {
        if let Some(definition) = self.cache.get(definition_id) {
            debug!(definition_id = %definition_id, "definition cache hit");
            return Ok(definition);
        }

        debug!(definition_id = %definition_id, "definition cache miss");
        let definition = self.inner.hydrate_definition(definition_id)?;
        self.cache.insert(definition_id, Arc::clone(&definition));
        Ok(definition)
    }

    fn import_context(&self, slice: &ContextSlice) -> Result<(), ContextError> {
        self.inner.import_context(slice)
    }
}
