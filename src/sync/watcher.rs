//! Change watcher for volume resources.
//!
//! Watches the directory containing each resource file rather than the
//! file itself: mounted volumes are updated by swapping a symlink, which a
//! watch on the file would miss.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::{FetchStrategy, ResourceKind};
use crate::consumer::{shape_for, Decodable, Shared};
use crate::error::AcquireError;
use crate::observability::metrics;
use crate::source::mounted;

/// Entry Kubernetes swaps atomically when a projected volume changes.
const VOLUME_DATA_LINK: &str = "..data";

/// Maps a watched file back to the resource it holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchRegistration {
    /// Misc resource name, empty for config and secrets.
    pub resource_name: String,
    pub kind: ResourceKind,
    /// Full path of the resource file.
    pub path: PathBuf,
}

impl WatchRegistration {
    fn file_name(&self) -> Option<String> {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
    }
}

/// Single long-lived listener for every volume resource.
pub(crate) struct ChangeWatcher<C, S> {
    shared: Arc<Shared<C, S>>,
    watcher: RecommendedWatcher,
    events: mpsc::UnboundedReceiver<notify::Result<Event>>,
    watched_dirs: HashSet<PathBuf>,
}

impl<C: Decodable, S: Decodable> ChangeWatcher<C, S> {
    pub(crate) fn new(shared: Arc<Shared<C, S>>) -> Result<Self, notify::Error> {
        let (tx, events) = mpsc::unbounded_channel();

        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let _ = tx.send(res);
            },
            Config::default(),
        )?;

        Ok(Self {
            shared,
            watcher,
            events,
            watched_dirs: HashSet::new(),
        })
    }

    /// Record the registration and watch its directory if not watched yet.
    pub(crate) fn register(&mut self, registration: WatchRegistration) -> Result<(), notify::Error> {
        let dir = registration
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        if !self.watched_dirs.contains(&dir) {
            self.watcher.watch(&dir, RecursiveMode::NonRecursive)?;
            tracing::info!(path = %dir.display(), "Watching resource directory");
            self.watched_dirs.insert(dir);
        }

        if let Some(file_name) = registration.file_name() {
            self.shared.registrations.insert(file_name, registration);
        }
        Ok(())
    }

    pub(crate) fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        let ChangeWatcher {
            shared,
            watcher: _watcher,
            mut events,
            watched_dirs,
        } = self;

        tracing::info!(directories = watched_dirs.len(), "Resource watcher started");

        while let Some(res) = events.recv().await {
            match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        for path in &event.paths {
                            handle_path(&shared, path).await;
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            }
        }
    }
}

/// Resolve which registrations a changed path belongs to and reload them.
async fn handle_path<C: Decodable, S: Decodable>(shared: &Shared<C, S>, path: &Path) {
    let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
        return;
    };

    let affected: Vec<WatchRegistration> = if file_name == VOLUME_DATA_LINK {
        let dir = path.parent();
        shared
            .registrations
            .iter()
            .filter(|r| r.value().path.parent() == dir)
            .map(|r| r.value().clone())
            .collect()
    } else {
        shared
            .registrations
            .get(file_name)
            .map(|r| r.value().clone())
            .into_iter()
            .collect()
    };

    for registration in affected {
        reingest(shared, &registration).await;
    }
}

/// Reload one resource; on failure the previous snapshot stays live.
async fn reingest<C: Decodable, S: Decodable>(shared: &Shared<C, S>, registration: &WatchRegistration) {
    let kind = registration.kind;
    tracing::info!(kind = %kind, path = %registration.path.display(), "Resource change detected, reloading...");

    let result = match mounted::read(&registration.path).await {
        Ok(bytes) => shared
            .ingest(
                kind,
                &registration.resource_name,
                &bytes,
                shape_for(kind, FetchStrategy::Volume),
            )
            .map_err(AcquireError::from),
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        metrics::record_reingest_failure(kind);
        tracing::error!(
            kind = %kind,
            path = %registration.path.display(),
            error = %e,
            "Failed to reload resource. Keeping current snapshot."
        );
    }
}
