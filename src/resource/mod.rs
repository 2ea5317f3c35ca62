//! Resource payload handling.
//!
//! # Data Flow
//! ```text
//! raw bytes (file, API, fallback)
//!     → decode.rs (envelope unwrap, JSON decode, secret decryption)
//!     → typed value
//!     → store (atomic commit)
//! ```

pub mod decode;

pub use decode::PayloadShape;
