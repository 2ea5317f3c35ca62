//! Read side of the consumer.
//!
//! A [`Reader`] only ever loads whole snapshots, so a value obtained from it
//! never observes a half-applied update. Callers that need several keys from
//! one consistent version should take [`Reader::config`] once and read from
//! the returned `Arc`.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::config::ResourceKind;
use crate::error::{Result, SailorError};
use crate::store::SnapshotStore;

/// Keyed access into a decoded config or secret value.
pub trait Lookup {
    type Value;

    fn lookup(&self, key: &str) -> Option<Self::Value>;
}

impl Lookup for Value {
    type Value = Value;

    fn lookup(&self, key: &str) -> Option<Value> {
        self.get(key).cloned()
    }
}

impl Lookup for Map<String, Value> {
    type Value = Value;

    fn lookup(&self, key: &str) -> Option<Value> {
        self.get(key).cloned()
    }
}

impl<V: Clone> Lookup for HashMap<String, V> {
    type Value = V;

    fn lookup(&self, key: &str) -> Option<V> {
        self.get(key).cloned()
    }
}

impl<V: Clone> Lookup for BTreeMap<String, V> {
    type Value = V;

    fn lookup(&self, key: &str) -> Option<V> {
        self.get(key).cloned()
    }
}

/// Cheap, cloneable handle for reading the live snapshots.
pub struct Reader<C, S> {
    store: Arc<SnapshotStore<C, S>>,
}

impl<C, S> Clone for Reader<C, S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<C, S> Reader<C, S> {
    pub(crate) fn new(store: Arc<SnapshotStore<C, S>>) -> Self {
        Self { store }
    }

    /// The whole current config.
    pub fn config(&self) -> Result<Arc<C>> {
        self.store
            .config()
            .map(|s| Arc::clone(s.value()))
            .ok_or(SailorError::ConfigsNotLoaded)
    }

    /// The whole current secret set.
    pub fn secrets(&self) -> Result<Arc<S>> {
        self.store
            .secrets()
            .map(|s| Arc::clone(s.value()))
            .ok_or(SailorError::SecretsNotLoaded)
    }

    /// Value of one top-level config key.
    pub fn get(&self, key: &str) -> Result<C::Value>
    where
        C: Lookup,
    {
        self.config()?
            .lookup(key)
            .ok_or_else(|| SailorError::KeyNotFound {
                kind: ResourceKind::Config,
                key: key.to_string(),
            })
    }

    /// Plaintext of one secret.
    pub fn get_secret(&self, key: &str) -> Result<S::Value>
    where
        S: Lookup,
    {
        self.secrets()?
            .lookup(key)
            .ok_or_else(|| SailorError::KeyNotFound {
                kind: ResourceKind::Secret,
                key: key.to_string(),
            })
    }

    /// Raw contents of a misc resource.
    pub fn get_misc(&self, name: &str) -> Result<Arc<[u8]>> {
        self.store
            .misc(name)
            .ok_or_else(|| SailorError::MiscNotFound(name.to_string()))
    }

    pub fn misc_names(&self) -> Vec<String> {
        self.store.misc_names()
    }

    /// Revision of a category, 0 until its first commit.
    pub fn revision(&self, kind: ResourceKind) -> u64 {
        self.store.revision(kind)
    }
}

impl<C, S> std::fmt::Debug for Reader<C, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reader")
            .field("config_revision", &self.store.revision(ResourceKind::Config))
            .field("secret_revision", &self.store.revision(ResourceKind::Secret))
            .field("misc_revision", &self.store.revision(ResourceKind::Misc))
            .finish()
    }
}
