//! The resource synchronization engine.
//!
//! # Responsibilities
//! - Validate declarations and connection details
//! - Acquire every declared resource in declaration order at startup
//! - Route primary failures to the fallback resolver
//! - Register watched paths and spawn poll loops for refreshable resources
//!
//! # Design Decisions
//! - The engine is an explicit object; several can coexist in one process
//! - Startup fails on the first resource that cannot be served at all and
//!   leaves nothing published behind
//! - `start` is serialized; concurrent callers wait for the running attempt
//! - Background tasks share the engine state through an `Arc`

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::env::{connection_from_env, fallback_base_from_env};
use crate::config::validation::{validate_connection, validate_resources};
use crate::config::{ConnectionOptions, FetchStrategy, InitOptions, ResourceKind, ResourceOption};
use crate::error::{AcquireError, DecodeError, Result, SailorError};
use crate::facade::Reader;
use crate::observability::metrics;
use crate::resource::decode::{decode_config, decode_misc, decode_secrets};
use crate::resource::PayloadShape;
use crate::source::{mounted, remote, FallbackResolver, Fetch, HttpFetcher};
use crate::store::SnapshotStore;
use crate::sync::poller::PollLoop;
use crate::sync::watcher::{ChangeWatcher, WatchRegistration};
use crate::vault::{self, Kek, VaultError};

/// Types a config or secret payload can be decoded into.
pub trait Decodable: DeserializeOwned + Send + Sync + 'static {}

impl<T: DeserializeOwned + Send + Sync + 'static> Decodable for T {}

/// State shared between the consumer, its watcher and its poll loops.
pub(crate) struct Shared<C, S> {
    pub(crate) conn: ConnectionOptions,
    pub(crate) store: Arc<SnapshotStore<C, S>>,
    pub(crate) fetcher: Arc<dyn Fetch>,
    pub(crate) fallback: FallbackResolver,
    pub(crate) registrations: DashMap<String, WatchRegistration>,
    kek: OnceLock<Kek>,
}

impl<C: Decodable, S: Decodable> Shared<C, S> {
    fn kek(&self) -> std::result::Result<&Kek, DecodeError> {
        if let Some(kek) = self.kek.get() {
            return Ok(kek);
        }
        let kek = vault::derive_kek(&self.conn.secret_key, self.conn.access_key.as_bytes())
            .map_err(DecodeError::KeyDerivation)?;
        Ok(self.kek.get_or_init(|| kek))
    }

    /// Derive the KEK on the blocking pool so background tasks never run
    /// Argon2 on a runtime worker.
    async fn prepare_kek(self: &Arc<Self>) -> std::result::Result<(), DecodeError> {
        if self.kek.get().is_some() {
            return Ok(());
        }
        let shared = Arc::clone(self);
        let kek = tokio::task::spawn_blocking(move || {
            vault::derive_kek(&shared.conn.secret_key, shared.conn.access_key.as_bytes())
        })
        .await
        .map_err(|e| DecodeError::KeyDerivation(VaultError::KeyDerivation(e.to_string())))?
        .map_err(DecodeError::KeyDerivation)?;
        let _ = self.kek.set(kek);
        Ok(())
    }

    /// Decode a payload and commit it. Returns the new revision.
    pub(crate) fn ingest(
        &self,
        kind: ResourceKind,
        name: &str,
        bytes: &[u8],
        shape: PayloadShape,
    ) -> std::result::Result<u64, DecodeError> {
        let revision = match kind {
            ResourceKind::Config => self.store.commit_config(decode_config(bytes, shape)?),
            ResourceKind::Secret => self.store.commit_secrets(decode_secrets(bytes, self.kek()?)?),
            ResourceKind::Misc => self.store.commit_misc(name, decode_misc(bytes, shape)?),
        };

        metrics::record_commit(kind, revision);
        tracing::debug!(kind = %kind, name = %name, revision, "Snapshot committed");
        Ok(revision)
    }

    pub(crate) fn fetcher(&self) -> &dyn Fetch {
        self.fetcher.as_ref()
    }
}

/// Keeps declared resources synchronized with Sailor.
///
/// `C` is the config type and `S` the secret type; both are decoded with
/// Serde. Decrypted secrets are handed to `S` as a map of name to plaintext.
pub struct Consumer<C = Value, S = HashMap<String, String>> {
    shared: Arc<Shared<C, S>>,
    resources: Arc<[ResourceOption]>,
    started: Arc<Mutex<bool>>,
}

impl<C, S> Clone for Consumer<C, S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            resources: Arc::clone(&self.resources),
            started: Arc::clone(&self.started),
        }
    }
}

impl<C: Decodable, S: Decodable> Consumer<C, S> {
    /// Create a consumer using the reqwest transport.
    ///
    /// When `options.connection` is `None` the connection is read from
    /// `SAILOR_*` environment variables.
    pub fn new(options: InitOptions) -> Result<Self> {
        validate_resources(&options.resources)?;
        let conn = resolve_connection(options.connection.clone())?;
        let fetcher = HttpFetcher::new(conn.socket_timeout())?;
        Ok(Self::build(options, conn, Arc::new(fetcher)))
    }

    /// Create a consumer with a custom transport.
    pub fn with_fetcher(options: InitOptions, fetcher: Arc<dyn Fetch>) -> Result<Self> {
        validate_resources(&options.resources)?;
        let conn = resolve_connection(options.connection.clone())?;
        Ok(Self::build(options, conn, fetcher))
    }

    fn build(options: InitOptions, conn: ConnectionOptions, fetcher: Arc<dyn Fetch>) -> Self {
        let fallback_base = options.fallback_base_url.or_else(fallback_base_from_env);

        let shared = Shared {
            conn,
            store: Arc::new(SnapshotStore::new()),
            fetcher,
            fallback: FallbackResolver::new(fallback_base),
            registrations: DashMap::new(),
            kek: OnceLock::new(),
        };

        Self {
            shared: Arc::new(shared),
            resources: options.resources.into(),
            started: Arc::new(Mutex::new(false)),
        }
    }

    /// Acquire every declared resource, then start the watcher and poll loops.
    ///
    /// Must be called inside a Tokio runtime. Returns the first resource
    /// that could be served neither by its source nor by the fallback; in
    /// that case nothing stays published and `start` may be called again.
    ///
    /// Calls from clones are serialized: a caller arriving while another
    /// start is running waits for it, then returns `Ok` if it succeeded or
    /// makes its own attempt if it failed.
    pub async fn start(&self) -> Result<()> {
        let mut started = self.started.lock().await;
        if *started {
            tracing::warn!(app = %self.shared.conn.app, "Consumer already started");
            return Ok(());
        }

        tracing::info!(
            app = %self.shared.conn.app,
            namespace = %self.shared.conn.namespace,
            resources = self.resources.len(),
            fallback = self.shared.fallback.is_configured(),
            "Starting sailor consumer"
        );

        if self.resources.iter().any(|r| r.kind == ResourceKind::Secret) {
            if let Err(e) = self.shared.prepare_kek().await {
                tracing::error!(error = %e, "Failed to derive secret key");
            }
        }

        let mut startup = Startup::default();
        for res in self.resources.iter() {
            if let Err(e) = self.acquire(res, &mut startup).await {
                startup.abort();
                self.shared.registrations.clear();
                self.shared.store.clear();
                return Err(e);
            }
        }
        *started = true;

        if let Some(watcher) = startup.watcher.take() {
            watcher.spawn();
        }

        tracing::info!(
            app = %self.shared.conn.app,
            watched = self.shared.registrations.len(),
            pollers = startup.pollers.len(),
            "Sailor consumer started"
        );
        Ok(())
    }

    async fn acquire(&self, res: &ResourceOption, startup: &mut Startup<C, S>) -> Result<()> {
        let primary = match res.fetch {
            FetchStrategy::Volume => self.acquire_mounted(res, startup).await,
            FetchStrategy::Pull => self.acquire_remote(res, startup).await,
        };

        match primary {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!(
                    kind = %res.kind,
                    name = %res.label(),
                    error = %e,
                    "Primary source failed"
                );
                metrics::record_acquire_failure(res.kind, "primary");
                self.acquire_fallback(res, e).await
            }
        }
    }

    async fn acquire_mounted(
        &self,
        res: &ResourceOption,
        startup: &mut Startup<C, S>,
    ) -> std::result::Result<(), AcquireError> {
        let path = mounted::resource_path(res, &self.shared.conn.app);
        let bytes = mounted::read(&path).await?;
        self.shared
            .ingest(res.kind, &res.name, &bytes, shape_for(res.kind, FetchStrategy::Volume))?;

        tracing::info!(kind = %res.kind, name = %res.label(), path = %path.display(), "Loaded resource from volume");

        if !res.once {
            self.watch(res, path, startup);
        }
        Ok(())
    }

    /// Register a loaded volume resource with the watcher.
    ///
    /// Failing to watch leaves the loaded snapshot in place; the resource
    /// just stops refreshing.
    fn watch(&self, res: &ResourceOption, path: PathBuf, startup: &mut Startup<C, S>) {
        if startup.watcher.is_none() {
            match ChangeWatcher::new(Arc::clone(&self.shared)) {
                Ok(watcher) => startup.watcher = Some(watcher),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to create resource watcher");
                    return;
                }
            }
        }

        let Some(watcher) = startup.watcher.as_mut() else {
            return;
        };

        let registration = WatchRegistration {
            resource_name: res.name.clone(),
            kind: res.kind,
            path,
        };
        if let Err(e) = watcher.register(registration) {
            tracing::error!(
                kind = %res.kind,
                name = %res.label(),
                error = %e,
                "Failed to watch resource directory, changes will not be picked up"
            );
        }
    }

    async fn acquire_remote(
        &self,
        res: &ResourceOption,
        startup: &mut Startup<C, S>,
    ) -> std::result::Result<(), AcquireError> {
        let url = remote::resource_url(&self.shared.conn, res.kind, &res.name);
        let bytes = remote::pull(self.shared.fetcher(), &url).await?;
        self.shared
            .ingest(res.kind, &res.name, &bytes, shape_for(res.kind, FetchStrategy::Pull))?;

        tracing::info!(kind = %res.kind, name = %res.label(), url = %url, "Pulled resource");

        if !res.once {
            let poller = PollLoop::new(Arc::clone(&self.shared), res.clone(), url);
            startup.pollers.push(poller.spawn());
        }
        Ok(())
    }

    async fn acquire_fallback(&self, res: &ResourceOption, primary: AcquireError) -> Result<()> {
        let exhausted = |reason: String| SailorError::FallbackExhausted {
            kind: res.kind,
            name: res.label().to_string(),
            reason,
        };

        if !res.fallback_enabled {
            return Err(exhausted(format!("fallback disabled, primary failed: {}", primary)));
        }

        metrics::record_fallback(res.kind);
        let bytes = self
            .shared
            .fallback
            .resolve(self.shared.fetcher(), &self.shared.conn.app, res.kind)
            .await
            .map_err(|e| {
                metrics::record_acquire_failure(res.kind, "fallback");
                exhausted(e.to_string())
            })?;

        self.shared
            .ingest(res.kind, &res.name, &bytes, PayloadShape::Raw)
            .map_err(|e| {
                metrics::record_acquire_failure(res.kind, "fallback");
                exhausted(e.to_string())
            })?;

        tracing::info!(kind = %res.kind, name = %res.label(), "Loaded resource from fallback");
        Ok(())
    }

    /// Read-only view of the live snapshots.
    pub fn reader(&self) -> Reader<C, S> {
        Reader::new(Arc::clone(&self.shared.store))
    }

    /// Revision of a category, 0 until its first commit.
    pub fn revision(&self, kind: ResourceKind) -> u64 {
        self.shared.store.revision(kind)
    }

    /// Paths currently watched for changes.
    pub fn watch_registrations(&self) -> Vec<WatchRegistration> {
        self.shared
            .registrations
            .iter()
            .map(|r| r.value().clone())
            .collect()
    }

    pub fn connection(&self) -> &ConnectionOptions {
        &self.shared.conn
    }

    pub fn resources(&self) -> &[ResourceOption] {
        &self.resources
    }
}

impl<C, S> std::fmt::Debug for Consumer<C, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Consumer")
            .field("addr", &self.shared.conn.addr)
            .field("namespace", &self.shared.conn.namespace)
            .field("app", &self.shared.conn.app)
            .field("resources", &self.resources.len())
            .finish()
    }
}

/// Background work created while starting; discarded if startup fails.
struct Startup<C, S> {
    watcher: Option<ChangeWatcher<C, S>>,
    pollers: Vec<JoinHandle<()>>,
}

impl<C, S> Default for Startup<C, S> {
    fn default() -> Self {
        Self {
            watcher: None,
            pollers: Vec::new(),
        }
    }
}

impl<C, S> Startup<C, S> {
    fn abort(&mut self) {
        for poller in self.pollers.drain(..) {
            poller.abort();
        }
        self.watcher = None;
    }
}

fn resolve_connection(conn: Option<ConnectionOptions>) -> Result<ConnectionOptions> {
    match conn {
        Some(conn) => {
            validate_connection(&conn)?;
            Ok(conn)
        }
        None => connection_from_env(),
    }
}

/// Mounted config and misc files are enveloped; everything else is raw.
pub(crate) fn shape_for(kind: ResourceKind, fetch: FetchStrategy) -> PayloadShape {
    match (kind, fetch) {
        (ResourceKind::Secret, _) => PayloadShape::Raw,
        (_, FetchStrategy::Volume) => PayloadShape::Enveloped,
        (_, FetchStrategy::Pull) => PayloadShape::Raw,
    }
}
