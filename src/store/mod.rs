//! Snapshot store.
//!
//! # Data Flow
//! ```text
//! startup / watcher / poller
//!     → decoded value
//!     → commit_* (read-copy-update of an ArcSwap cell)
//!     → readers load the current Arc without locking
//! ```
//!
//! # Design Decisions
//! - One cell per category; a commit replaces the whole immutable value
//! - Revisions advance by one per commit within a category
//! - Misc entries are overlaid onto a copy of the current map, so concurrent
//!   commits to different names never drop each other

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};

use crate::config::ResourceKind;

/// Misc payloads by resource name.
pub type MiscMap = HashMap<String, Arc<[u8]>>;

/// An immutable published value.
#[derive(Debug)]
pub struct Snapshot<T> {
    revision: u64,
    value: Arc<T>,
}

impl<T> Snapshot<T> {
    /// Publication counter, starting at 1 for the first commit.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn value(&self) -> &Arc<T> {
        &self.value
    }
}

/// Holds the live snapshot of every category.
pub struct SnapshotStore<C, S> {
    config: ArcSwapOption<Snapshot<C>>,
    secrets: ArcSwapOption<Snapshot<S>>,
    misc: ArcSwap<Snapshot<MiscMap>>,
}

impl<C, S> SnapshotStore<C, S> {
    pub fn new() -> Self {
        Self {
            config: ArcSwapOption::empty(),
            secrets: ArcSwapOption::empty(),
            misc: ArcSwap::from_pointee(Snapshot {
                revision: 0,
                value: Arc::new(MiscMap::new()),
            }),
        }
    }

    /// Replace the live config. Returns the new revision.
    pub fn commit_config(&self, value: C) -> u64 {
        commit_whole(&self.config, Arc::new(value))
    }

    /// Replace the live secrets. Returns the new revision.
    pub fn commit_secrets(&self, value: S) -> u64 {
        commit_whole(&self.secrets, Arc::new(value))
    }

    /// Overlay one misc entry onto a copy of the live map. Returns the new revision.
    pub fn commit_misc(&self, name: &str, payload: Arc<[u8]>) -> u64 {
        let previous = self.misc.rcu(|current| {
            let mut map = MiscMap::clone(&current.value);
            map.insert(name.to_string(), Arc::clone(&payload));
            Snapshot {
                revision: current.revision + 1,
                value: Arc::new(map),
            }
        });
        previous.revision + 1
    }

    /// Drop every published value. Readers holding an old `Arc` keep it.
    pub fn clear(&self) {
        self.config.store(None);
        self.secrets.store(None);
        self.misc.store(Arc::new(Snapshot {
            revision: 0,
            value: Arc::new(MiscMap::new()),
        }));
    }

    pub fn config(&self) -> Option<Arc<Snapshot<C>>> {
        self.config.load_full()
    }

    pub fn secrets(&self) -> Option<Arc<Snapshot<S>>> {
        self.secrets.load_full()
    }

    pub fn misc(&self, name: &str) -> Option<Arc<[u8]>> {
        self.misc.load().value.get(name).cloned()
    }

    /// Names of every committed misc entry.
    pub fn misc_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.misc.load().value.keys().cloned().collect();
        names.sort();
        names
    }

    /// Current revision of a category, 0 if nothing was committed yet.
    pub fn revision(&self, kind: ResourceKind) -> u64 {
        match kind {
            ResourceKind::Config => self.config.load_full().map_or(0, |s| s.revision),
            ResourceKind::Secret => self.secrets.load_full().map_or(0, |s| s.revision),
            ResourceKind::Misc => self.misc.load().revision,
        }
    }
}

impl<C, S> Default for SnapshotStore<C, S> {
    fn default() -> Self {
        Self::new()
    }
}

fn commit_whole<T>(cell: &ArcSwapOption<Snapshot<T>>, value: Arc<T>) -> u64 {
    let previous = cell.rcu(|current| {
        let revision = current.as_ref().map_or(0, |s| s.revision) + 1;
        Some(Arc::new(Snapshot {
            revision,
            value: Arc::clone(&value),
        }))
    });
    previous.as_ref().map_or(0, |s| s.revision) + 1
}
