//! The context blob that carries an execution across invocations.
//!
//! A [`Context`] is a flat map of string keys to JSON values. Every
//! component owns a namespace and only ever sees a [`ContextSlice`]: the
//! entries under `x-stately-<namespace>-`, with that prefix stripped. The
//! executor does the prefixing, so components can be swapped independently
//! and never read each other's keys.
//!
//! # Example
//!
//! ```rust
//! use stately::context::{Context, ContextSlice};
//! use serde_json::json;
//!
//! let mut context = Context::new();
//! context
//!     .merge_slice("logger", ContextSlice::new().with("seq", json!(3)))
//!     .unwrap();
//!
//! assert_eq!(context.get("x-stately-logger-seq"), Some(&json!(3)));
//!
//! let wire = context.to_json_string().unwrap();
//! let back = Context::from_json_str(&wire).unwrap();
//! assert_eq!(back.slice("logger").get("seq"), Some(&json!(3)));
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub mod error;

pub use error::ContextError;

/// Version identifier for the context format
pub const CONTEXT_VERSION: u32 = 1;

/// Prefix shared by every key this crate writes into a context
pub const KEY_PREFIX: &str = "x-stately-";

/// Full key for `key` inside `namespace`.
pub fn namespaced_key(namespace: &str, key: &str) -> String {
    format!("{KEY_PREFIX}{namespace}-{key}")
}

fn check_namespace(namespace: &str) -> Result<(), ContextError> {
    let valid = !namespace.is_empty()
        && namespace
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ContextError::InvalidNamespace(namespace.to_string()))
    }
}

/// Flat, namespaced continuation for one execution.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context {
    entries: BTreeMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    /// Entries owned by `namespace`, with the namespace prefix stripped.
    pub fn slice(&self, namespace: &str) -> ContextSlice {
        let prefix = namespaced_key(namespace, "");
        let entries = self
            .entries
            .iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(&prefix)
                    .map(|local| (local.to_string(), value.clone()))
            })
            .collect();
        ContextSlice { entries }
    }

    /// Add a component's slice under its namespace.
    ///
    /// Fails on an invalid namespace or if any resulting key already exists.
    pub fn merge_slice(&mut self, namespace: &str, slice: ContextSlice) -> Result<(), ContextError> {
        check_namespace(namespace)?;
        for (local, value) in slice.entries {
            let key = namespaced_key(namespace, &local);
            if self.entries.contains_key(&key) {
                return Err(ContextError::Collision(key));
            }
            self.entries.insert(key, value);
        }
        Ok(())
    }

    /// Encode for transport as a single JSON payload.
    pub fn to_json_string(&self) -> Result<String, ContextError> {
        serde_json::to_string(self).map_err(|e| ContextError::SerializationFailed(e.to_string()))
    }

    /// Decode a context produced by [`Context::to_json_string`].
    pub fn from_json_str(json: &str) -> Result<Self, ContextError> {
        serde_json::from_str(json).map_err(|e| ContextError::DeserializationFailed(e.to_string()))
    }
}

impl FromIterator<(String, Value)> for Context {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// The part of a context owned by one component, keyed without prefix.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContextSlice {
    entries: BTreeMap<String, Value>,
}

impl ContextSlice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Serialize `value` into the slice under `key`.
    pub fn put<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), ContextError> {
        let value = serde_json::to_value(value).map_err(|e| ContextError::InvalidValue {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    /// Decode the value under `key`; `Ok(None)` when absent or `null`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ContextError> {
        match self.entries.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| ContextError::InvalidValue {
                    key: key.to_string(),
                    reason: e.to_string(),
                }),
        }
    }

    /// Decode the value under `key`, failing when it is absent.
    pub fn require<T: DeserializeOwned>(&self, key: &str) -> Result<T, ContextError> {
        self.get_as(key)?
            .ok_or_else(|| ContextError::MissingKey(key.to_string()))
    }
}
