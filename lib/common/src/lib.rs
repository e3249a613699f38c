//! Shared building blocks for the r2db2 crates: identifiers, configuration
//! and tracing setup.

pub mod config;
pub mod ids;
pub mod util;

pub use config::*;
pub use ids::*;
