//! Declaration and connection management.
//!
//! # Data Flow
//! ```text
//! InitOptions (code) or declaration file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (connection precedence, misc names)
//!     → env.rs fills the connection from SAILOR_* when absent
//!     → Consumer (immutable after start)
//! ```
//!
//! # Design Decisions
//! - Declarations are immutable once the consumer starts
//! - Missing connection fields are reported one at a time, in a fixed order
//! - The fallback base address is read once, never per attempt

pub mod defaults;
pub mod env;
pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::ConnectionOptions;
pub use schema::FetchStrategy;
pub use schema::InitOptions;
pub use schema::ResourceKind;
pub use schema::ResourceOption;
