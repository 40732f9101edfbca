//! Tabula - archetype entity-component storage with relationships and queries
//!
//! This crate re-exports all layers of the Tabula system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 2: tabula_query       — Terms, filters, cached queries, iterators
//! Layer 1: tabula_storage     — Entities, components, tables, relationships
//! Layer 0: tabula_foundation  — Core types (EntityId, Id, Layout, Error)
//! ```

pub use tabula_foundation as foundation;
pub use tabula_query as query;
pub use tabula_storage as storage;
