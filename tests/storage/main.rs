//! Integration tests for Layer 1: Storage
//!
//! Tests for entity lifecycle, components, relationships, and world state.

mod components;
mod relationships;

/// Little-endian bytes of a two-`i32` position.
pub fn pos(x: i32, y: i32) -> Vec<u8> {
    let mut bytes = x.to_le_bytes().to_vec();
    bytes.extend_from_slice(&y.to_le_bytes());
    bytes
}
