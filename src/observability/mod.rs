//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! consumer / watcher / poll loops produce:
//!     → tracing events (structured fields: kind, name, revision, error)
//!     → metrics.rs (counters and gauges through the `metrics` facade)
//!
//! Consumers:
//!     → logging.rs installs a fmt subscriber for binaries
//!     → any `metrics` recorder the embedding process installs
//! ```
//!
//! # Design Decisions
//! - The library never installs a subscriber or recorder itself
//! - Metric updates are no-ops until the host installs a recorder

pub mod logging;
pub mod metrics;
