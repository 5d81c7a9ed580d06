//! Supports, Mandatory, NotSupported and Never

use crate::common::*;

// ============================================================================
// Supports
// ============================================================================

#[test]
fn supports_without_transaction_runs_empty() {
    let coordinator = coordinator();
    let mut ctx = coordinator.new_context();

    let handle = coordinator
        .begin(&mut ctx, &with(Propagation::Supports))
        .unwrap();
    assert!(!handle.has_transaction());
    assert!(!handle.is_new_transaction());
    assert_eq!(handle.id(), None);
    assert!(!ctx.has_transaction());
    assert_eq!(ctx.logical_depth(), 1);

    coordinator.commit(&mut ctx, handle).unwrap();
    assert!(coordinator.resource().events().is_empty());
    assert!(ctx.is_idle());
}

#[test]
fn supports_joins_existing() {
    let coordinator = coordinator();
    let mut ctx = coordinator.new_context();

    let outer = coordinator.begin(&mut ctx, &required()).unwrap();
    let inner = coordinator
        .begin(&mut ctx, &with(Propagation::Supports))
        .unwrap();
    assert!(inner.is_participating());
    assert_eq!(inner.id(), outer.id());

    coordinator.rollback(&mut ctx, inner).unwrap();
    assert!(coordinator.commit(&mut ctx, outer).unwrap_err().is_unexpected_rollback());
}

#[test]
fn empty_handle_rollback_touches_nothing() {
    let coordinator = coordinator();
    let mut ctx = coordinator.new_context();

    let mut handle = coordinator
        .begin(&mut ctx, &with(Propagation::Supports))
        .unwrap();
    handle.set_rollback_only();
    assert!(handle.is_rollback_only());

    // No transaction behind the handle, so nothing to report
    coordinator.commit(&mut ctx, handle).unwrap();
    assert!(coordinator.resource().events().is_empty());
    assert!(ctx.is_idle());
}

// ============================================================================
// Mandatory
// ============================================================================

#[test]
fn mandatory_without_transaction_is_illegal() {
    let coordinator = coordinator();
    let mut ctx = coordinator.new_context();

    let err = coordinator
        .begin(&mut ctx, &with(Propagation::Mandatory))
        .unwrap_err();
    assert!(err.is_illegal_state());
    assert!(err.to_string().contains("mandatory"));
    assert!(ctx.is_idle());
    assert_eq!(coordinator.resource().opens(), 0);
}

#[test]
fn mandatory_joins_existing() {
    let coordinator = coordinator();
    let mut ctx = coordinator.new_context();

    let outer = coordinator.begin(&mut ctx, &required()).unwrap();
    let inner = coordinator
        .begin(&mut ctx, &with(Propagation::Mandatory))
        .unwrap();
    assert!(inner.is_participating());

    coordinator.commit(&mut ctx, inner).unwrap();
    coordinator.commit(&mut ctx, outer).unwrap();
    assert_eq!(coordinator.resource().commits(), 1);
}

// ============================================================================
// NotSupported
// ============================================================================

#[test]
fn not_supported_suspends_and_restores() {
    let coordinator = coordinator();
    let mut ctx = coordinator.new_context();

    let outer = coordinator.begin(&mut ctx, &required()).unwrap();
    let inner = coordinator
        .begin(&mut ctx, &with(Propagation::NotSupported))
        .unwrap();
    assert!(!inner.has_transaction());
    assert!(inner.has_suspended());
    assert!(!ctx.has_transaction());
    assert_eq!(ctx.suspended_count(), 1);

    // Work inside NotSupported that asks for Required gets its own transaction
    let nested = coordinator.begin(&mut ctx, &required()).unwrap();
    assert!(nested.is_new_transaction());
    assert_ne!(nested.id(), outer.id());
    coordinator.commit(&mut ctx, nested).unwrap();
    assert!(!ctx.has_transaction());

    coordinator.rollback(&mut ctx, inner).unwrap();
    assert_eq!(ctx.current_transaction_id(), outer.id());
    assert!(!outer.is_rollback_only());

    coordinator.commit(&mut ctx, outer).unwrap();
    assert_eq!(coordinator.resource().commits(), 2);
    assert!(ctx.is_idle());
}

#[test]
fn not_supported_without_transaction_runs_empty() {
    let coordinator = coordinator();
    let mut ctx = coordinator.new_context();

    let handle = coordinator
        .begin(&mut ctx, &with(Propagation::NotSupported))
        .unwrap();
    assert!(!handle.has_transaction());
    assert!(!handle.has_suspended());

    coordinator.commit(&mut ctx, handle).unwrap();
    assert!(ctx.is_idle());
}

// ============================================================================
// Never
// ============================================================================

#[test]
fn never_with_transaction_is_illegal() {
    let coordinator = coordinator();
    let mut ctx = coordinator.new_context();

    let outer = coordinator.begin(&mut ctx, &required()).unwrap();
    let err = coordinator
        .begin(&mut ctx, &with(Propagation::Never))
        .unwrap_err();
    assert!(err.is_illegal_state());
    assert_eq!(ctx.logical_depth(), 1);
    assert_eq!(ctx.current_transaction_id(), outer.id());

    coordinator.commit(&mut ctx, outer).unwrap();
    assert!(ctx.is_idle());
}

#[test]
fn never_without_transaction_runs_empty() {
    let coordinator = coordinator();
    let mut ctx = coordinator.new_context();

    let handle = coordinator
        .begin(&mut ctx, &with(Propagation::Never))
        .unwrap();
    assert!(!handle.has_transaction());
    coordinator.rollback(&mut ctx, handle).unwrap();
    assert!(ctx.is_idle());
}

#[test]
fn every_policy_leaves_context_idle() {
    for propagation in Propagation::ALL {
        let coordinator = coordinator();
        let mut ctx = coordinator.new_context();

        if propagation == Propagation::Mandatory {
            assert!(coordinator.begin(&mut ctx, &with(propagation)).is_err());
        } else {
            let handle = coordinator.begin(&mut ctx, &with(propagation)).unwrap();
            assert_eq!(handle.propagation(), propagation);
            assert_eq!(handle.is_new_transaction(), propagation.opens_when_absent());
            coordinator.commit(&mut ctx, handle).unwrap();
        }
        assert!(ctx.is_idle(), "{} left state behind", propagation);
    }
}
