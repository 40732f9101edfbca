//! Entity store, component registry, archetype tables, and relationships for Tabula.
//!
//! This crate provides:
//! - [`EntityStore`] - Generational entity allocation and row locations
//! - [`ComponentRegistry`] - Component names and byte layouts
//! - [`TableStore`] - Archetype tables with column-major component bytes
//! - [`RelationStore`] - Bidirectional pair indices and relation policies
//! - [`World`] - The owning aggregate all operations go through

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod component;
pub mod config;
pub mod entity;
pub mod event;
pub mod lock;
pub mod name;
pub mod relationship;
pub mod schema;
pub mod table;
pub mod world;

pub use component::ComponentRegistry;
pub use config::WorldConfig;
pub use entity::{EntityStore, Location};
pub use event::{StorageEvent, Subscription};
pub use lock::IterationToken;
pub use name::NameIndex;
pub use relationship::RelationStore;
pub use schema::{ComponentInfo, OnDelete, RelationPolicy};
pub use table::{Column, Table, TableId, TableStore, Type};
pub use world::World;
