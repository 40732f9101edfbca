//! Integration tests for identifiers
//!
//! Tests entity ids, pair ids, the packed encoding, and layouts.

use tabula_foundation::{EntityId, Id, Layout, MAX_ALIGN};

// =============================================================================
// Entity Ids
// =============================================================================

#[test]
fn builtins_are_distinct() {
    let builtins = [EntityId::CHILD_OF, EntityId::IS_A, EntityId::PREFAB];
    for (i, a) in builtins.iter().enumerate() {
        assert!(a.is_builtin());
        for b in &builtins[i + 1..] {
            assert_ne!(a, b);
        }
    }
    assert!(!EntityId::new(3, 1).is_builtin());
    assert!(!EntityId::new(0, 2).is_builtin());
}

#[test]
fn null_sentinel() {
    assert!(EntityId::null().is_null());
    assert!(!EntityId::new(0, 1).is_null());
}

// =============================================================================
// Pairs
// =============================================================================

#[test]
fn pair_halves() {
    let rel = EntityId::new(10, 1);
    let obj = EntityId::new(20, 3);
    let id = Id::pair(rel, obj);

    assert!(id.is_pair());
    assert_eq!(id.relation(), Some(rel));
    assert_eq!(id.object(), Some(obj));
    assert_eq!(id.as_entity(), None);
    assert!(id.has_relation(rel));
    assert!(id.references(obj));
    assert_eq!(id.entities().collect::<Vec<_>>(), vec![rel, obj]);
}

#[test]
fn plain_and_pair_never_equal() {
    let e = EntityId::new(4, 1);
    assert_ne!(Id::entity(e), Id::pair(e, e));
}

// =============================================================================
// Packed Encoding
// =============================================================================

#[test]
fn plain_bits_keep_generation() {
    let e = EntityId::new(77, 5);
    let bits = Id::entity(e).to_bits();
    assert!(!bits.is_pair());
    assert_eq!(bits.0, (5u64 << 32) | 77);
    assert_eq!(bits.entity(), Some(e));
}

#[test]
fn pair_bits_decode_indices() {
    let id = Id::pair(EntityId::new(0x7FFF_FFFF, 1), EntityId::new(u32::MAX - 1, 1));
    let bits = id.to_bits();
    assert!(bits.is_pair());
    assert_eq!(bits.relation_index(), Some(0x7FFF_FFFF));
    assert_eq!(bits.object_index(), Some(u32::MAX - 1));
    assert_eq!(bits.entity(), None);
}

// =============================================================================
// Layouts
// =============================================================================

#[test]
fn tag_layout() {
    assert!(Layout::TAG.is_tag());
    assert_eq!(Layout::TAG.size(), 0);
}

#[test]
fn layout_validation() {
    assert!(Layout::new(12, 4).is_ok());
    assert!(Layout::new(0, 1).unwrap().is_tag());
    assert!(Layout::new(8, 3).is_err());
    assert!(Layout::new(6, 4).is_err());
    assert!(Layout::new(MAX_ALIGN * 2, MAX_ALIGN * 2).is_err());
    assert!(Layout::new(MAX_ALIGN, MAX_ALIGN).is_ok());
}
