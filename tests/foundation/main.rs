//! Integration tests for Layer 0: Foundation
//!
//! Tests for core types: EntityId, Id, Layout, and Error.

mod errors;
mod ids;
