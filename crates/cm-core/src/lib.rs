//! commune/crates/cm-core/src/lib.rs
//!
//! The central domain logic and interface definitions for commune.

pub mod authz;
pub mod error;
pub mod models;
pub mod traits;
pub mod validate;

// Re-exporting for easier access in other crates
pub use authz::*;
pub use error::*;
pub use models::*;
pub use traits::*;
pub use validate::*;
