//! # Storage
//!
//! Physical side of index creation. The DDL layer decides *what* index to
//! build; an [`IndexBuilder`] builds it, registers it in the catalog and
//! records the physical handle in the [`IndexManager`].

pub mod index;

pub use index::*;
