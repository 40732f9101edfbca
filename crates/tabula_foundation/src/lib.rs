//! Core identifiers, layouts, and errors for Tabula.
//!
//! This crate provides:
//! - [`EntityId`] - Generational entity identifiers
//! - [`Id`] - Plain entity ids and `(relation, object)` pairs
//! - [`Layout`] - Byte size and alignment of component payloads
//! - [`Error`] - Rich error types with context

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod entity;
pub mod error;
pub mod id;
pub mod layout;

pub use entity::EntityId;
pub use error::{Error, ErrorContext, ErrorKind, Result};
pub use id::{Id, IdBits};
pub use layout::{Layout, MAX_ALIGN};
