//! Integration tests for Error types
//!
//! Tests error construction, display, context, and error kinds.

use tabula_foundation::{EntityId, Error, ErrorContext, ErrorKind, Id};

// =============================================================================
// Error Construction
// =============================================================================

#[test]
fn error_stale_entity() {
    let err = Error::stale_entity(EntityId::new(5, 2));
    assert!(matches!(err.kind, ErrorKind::StaleEntity(_)));
    assert!(err.is_stale());
    assert!(format!("{err}").contains('5'));
}

#[test]
fn error_unknown_id_counts_as_stale() {
    let err = Error::unknown_id(Id::entity(EntityId::new(900, 1)));
    assert!(matches!(err.kind, ErrorKind::UnknownId(_)));
    assert!(err.is_stale());
}

#[test]
fn error_duplicate_name() {
    let err = Error::duplicate_name("Sun");
    assert!(matches!(err.kind, ErrorKind::DuplicateName(ref name) if name == "Sun"));
    assert!(format!("{err}").contains("Sun"));
    assert!(!err.is_stale());
}

#[test]
fn error_size_mismatch() {
    let err = Error::size_mismatch(Id::entity(EntityId::new(3, 1)), 8, 4);
    let msg = format!("{err}");
    assert!(msg.contains('8'));
    assert!(msg.contains('4'));
}

#[test]
fn error_concurrent_mutation() {
    let err = Error::concurrent_mutation("add");
    assert!(matches!(
        err.kind,
        ErrorKind::ConcurrentStructuralMutation("add")
    ));
    assert!(format!("{err}").contains("add"));
}

#[test]
fn term_errors_display_index() {
    let err = Error::new(ErrorKind::TermIndexOutOfRange { index: 3, count: 2 });
    let msg = format!("{err}");
    assert!(msg.contains('3'));
    assert!(msg.contains('2'));
    assert!(format!("{}", Error::new(ErrorKind::TermNotInOutput(1))).contains('1'));
}

// =============================================================================
// Error Context
// =============================================================================

#[test]
fn error_context_display() {
    let ctx = ErrorContext::new()
        .with_operation("destroy")
        .with_entity(EntityId::new(9, 1))
        .with_frame("cascade");
    let text = format!("{ctx}");
    assert!(text.contains("in destroy"));
    assert!(text.contains("Entity(9)"));
    assert!(text.contains("in cascade"));
}

#[test]
fn error_keeps_context() {
    let err = Error::unknown_component(Id::entity(EntityId::new(12, 1)))
        .with_context(ErrorContext::new().with_operation("set"));
    let ctx = err.context.unwrap();
    assert_eq!(ctx.operation.as_deref(), Some("set"));
    assert!(ctx.entity.is_none());
}
