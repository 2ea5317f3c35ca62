//! Background synchronization.
//!
//! # Data Flow
//! ```text
//! volume resources → watcher.rs (one notify watcher, directory level)
//! pull resources   → poller.rs  (one task per resource, fixed interval)
//!     → Shared::ingest → SnapshotStore commit
//! ```
//!
//! Both paths keep the previous snapshot when a refresh fails.

pub mod poller;
pub mod watcher;

pub use watcher::WatchRegistration;
