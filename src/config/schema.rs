//! Resource declaration schema.
//!
//! These types describe what the consumer keeps synchronized and how it
//! reaches the Sailor control plane. All of them derive Serde traits so a
//! declaration file can describe them as well as code.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Directory where platform volumes are mounted unless a resource says otherwise.
pub const DEFAULT_MOUNT_PATH: &str = "/etc/sailor";

/// Interval used by pull resources that do not set one.
pub const DEFAULT_PULL_INTERVAL: Duration = Duration::from_secs(10);

/// The category a resource belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Application configuration (ConfigMap / AppConfig).
    Config,
    /// Encrypted secrets for the app inside the namespace.
    Secret,
    /// Any text based resource, addressed by name.
    Misc,
}

impl ResourceKind {
    /// Segment used in URLs and file names for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Config => "config",
            ResourceKind::Secret => "secret",
            ResourceKind::Misc => "misc",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a resource is acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStrategy {
    /// Read from a mounted directory and watch it for changes.
    Volume,
    /// Pull from the Sailor API, optionally on an interval.
    Pull,
}

/// Identity and credentials of the app being synchronized.
#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectionOptions {
    /// Base address of the Sailor API (e.g., "http://sailor:7766").
    pub addr: String,

    /// Namespace the app lives in.
    pub namespace: String,

    /// App name inside the namespace.
    pub app: String,

    /// Access key, also the salt for key derivation.
    pub access_key: String,

    /// Secret key used to derive the key-encryption-key.
    #[serde(skip_serializing)]
    pub secret_key: String,

    /// HTTP socket timeout in seconds. Zero disables the timeout.
    pub socket_timeout_secs: u64,
}

impl fmt::Debug for ConnectionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionOptions")
            .field("addr", &self.addr)
            .field("namespace", &self.namespace)
            .field("app", &self.app)
            .field("access_key", &self.access_key)
            .field("secret_key", &"...")
            .field("socket_timeout_secs", &self.socket_timeout_secs)
            .finish()
    }
}

impl ConnectionOptions {
    pub fn socket_timeout(&self) -> Option<Duration> {
        match self.socket_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Address with any trailing slash removed.
    pub(crate) fn base_address(&self) -> &str {
        self.addr.trim_end_matches('/')
    }
}

/// A single declared resource.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResourceOption {
    pub kind: ResourceKind,

    /// Resource name. Required for misc, ignored otherwise.
    #[serde(default)]
    pub name: String,

    /// Mount directory for volume resources.
    #[serde(default = "default_mount_path")]
    pub path: String,

    pub fetch: FetchStrategy,

    /// Fetch a pull resource once and never refresh it.
    #[serde(default)]
    pub once: bool,

    /// Refresh interval for pull resources, in milliseconds.
    #[serde(default)]
    pub pull_interval_ms: u64,

    /// Try the fallback origin when the primary source fails.
    #[serde(default)]
    pub fallback_enabled: bool,
}

fn default_mount_path() -> String {
    DEFAULT_MOUNT_PATH.to_string()
}

impl ResourceOption {
    /// Declare a resource with default settings for the given strategy.
    pub fn new(kind: ResourceKind, fetch: FetchStrategy) -> Self {
        Self {
            kind,
            name: String::new(),
            path: default_mount_path(),
            fetch,
            once: false,
            pull_interval_ms: 0,
            fallback_enabled: false,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn at_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }

    pub fn every(mut self, interval: Duration) -> Self {
        self.pull_interval_ms = (interval.as_millis() as u64).max(1);
        self
    }

    pub fn with_fallback(mut self) -> Self {
        self.fallback_enabled = true;
        self
    }

    /// Effective poll interval, falling back to [`DEFAULT_PULL_INTERVAL`].
    pub fn pull_interval(&self) -> Duration {
        match self.pull_interval_ms {
            0 => DEFAULT_PULL_INTERVAL,
            ms => Duration::from_millis(ms),
        }
    }

    /// Name used in logs: the misc name, or the kind for singletons.
    pub fn label(&self) -> &str {
        match self.kind {
            ResourceKind::Misc => &self.name,
            _ => self.kind.as_str(),
        }
    }
}

/// Everything needed to construct a consumer.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct InitOptions {
    /// Connection details. When absent they are read from `SAILOR_*` variables.
    pub connection: Option<ConnectionOptions>,

    /// Resources the consumer manages, acquired in declaration order.
    pub resources: Vec<ResourceOption>,

    /// Overrides `SAILOR_FALLBACK_BASE_URL`.
    pub fallback_base_url: Option<String>,
}

impl InitOptions {
    pub fn new(connection: ConnectionOptions) -> Self {
        Self {
            connection: Some(connection),
            ..Self::default()
        }
    }

    pub fn resource(mut self, resource: ResourceOption) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn fallback_base_url(mut self, url: impl Into<String>) -> Self {
        self.fallback_base_url = Some(url.into());
        self
    }
}
