//! Acquisition sources.
//!
//! # Data Flow
//! ```text
//! Volume resource:
//!     mounted.rs (read <path>/<app>-<kind>)
//!     → on failure: fallback.rs
//!
//! Pull resource:
//!     remote.rs (GET <addr>/api/v1/resource/<ns>/<app>/<kind>)
//!     → on failure: fallback.rs
//!
//! Fallback:
//!     GET <fallback base>/<app>-<kind>.sailor.fall
//! ```
//!
//! # Design Decisions
//! - Sources only produce bytes; decoding happens in `resource`
//! - A source failure is never fatal on its own
//! - Network access goes through the `Fetch` trait

pub mod fallback;
pub mod mounted;
pub mod remote;
pub mod transport;

pub use fallback::FallbackResolver;
pub use transport::{Fetch, FetchResponse, HttpFetcher};
