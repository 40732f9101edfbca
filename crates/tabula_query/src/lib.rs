//! Filters, cached queries, and table iteration for Tabula.
//!
//! This crate provides:
//! - [`Term`] - One `(id, mode, access)` entry of a term list
//! - [`Filter`] - Matches tables from scratch on every iteration
//! - [`Query`] - Keeps its matches current from storage events
//! - [`Iter`] - Cursor that walks matched tables batch by batch

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod filter;
pub mod iter;
pub mod plan;
pub mod query;
pub mod term;

pub use filter::{Filter, FilterBuilder};
pub use iter::{Iter, IterState};
pub use plan::{Plan, TableMatch, TermSource};
pub use query::Query;
pub use term::{Access, Term, TermMode};
