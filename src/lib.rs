//! Sailor client library.
//!
//! Keeps an application's configuration, secrets and named misc resources
//! synchronized with the Sailor control plane. Resources come from a
//! mounted volume or the Sailor API, fall back to a static origin when the
//! primary source is down, and are refreshed in the background. Reads go
//! through immutable snapshots and never block writers.
//!
//! ```text
//!   InitOptions ──▶ Consumer::start ──▶ source (mounted | remote | fallback)
//!                                           │
//!                                           ▼
//!                               resource::decode (+ vault)
//!                                           │
//!                                           ▼
//!   Reader::get ◀── SnapshotStore ◀── commit ◀── sync (watcher | poller)
//! ```

pub mod config;
pub mod consumer;
pub mod error;
pub mod facade;
pub mod observability;
pub mod resource;
pub mod source;
pub mod store;
pub mod sync;
pub mod vault;

pub use config::defaults;
pub use config::{ConnectionOptions, FetchStrategy, InitOptions, ResourceKind, ResourceOption};
pub use consumer::{Consumer, Decodable};
pub use error::{Result, SailorError};
pub use facade::{Lookup, Reader};
