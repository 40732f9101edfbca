//! Integration tests for Layer 2: Query
//!
//! Tests for filters, cached queries, and iteration.

mod queries;

/// Little-endian bytes of a two-`i32` position.
pub fn pos(x: i32, y: i32) -> Vec<u8> {
    let mut bytes = x.to_le_bytes().to_vec();
    bytes.extend_from_slice(&y.to_le_bytes());
    bytes
}

/// Decodes every position in a column span.
pub fn positions(bytes: &[u8]) -> Vec<(i32, i32)> {
    bytes
        .chunks_exact(8)
        .map(|chunk| {
            let x = i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            let y = i32::from_le_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]);
            (x, y)
        })
        .collect()
}
