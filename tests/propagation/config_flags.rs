//! Behavior switches from `CoordinatorConfig` and `txnest.toml`

use crate::common::*;
use tempfile::TempDir;

#[test]
fn fail_early_raises_on_participant_commit() {
    let coordinator =
        coordinator_with(CoordinatorConfig::default().with_fail_early_on_global_rollback_only(true));
    let mut ctx = coordinator.new_context();

    let outer = coordinator.begin(&mut ctx, &required()).unwrap();
    let first = coordinator.begin(&mut ctx, &required()).unwrap();
    coordinator.rollback(&mut ctx, first).unwrap();

    let second = coordinator.begin(&mut ctx, &required()).unwrap();
    let err = coordinator.commit(&mut ctx, second).unwrap_err();
    assert!(err.is_unexpected_rollback());
    assert_eq!(coordinator.resource().rollbacks(), 0);

    assert!(coordinator.commit(&mut ctx, outer).unwrap_err().is_unexpected_rollback());
    assert_eq!(coordinator.resource().rollbacks(), 1);
    assert_eq!(coordinator.metrics().total_unexpected_rollbacks, 2);
}

#[test]
fn participant_rollback_without_global_marking() {
    let coordinator = coordinator_with(
        CoordinatorConfig::default().with_global_rollback_on_participation_failure(false),
    );
    let mut ctx = coordinator.new_context();

    let outer = coordinator.begin(&mut ctx, &required()).unwrap();
    let inner = coordinator.begin(&mut ctx, &required()).unwrap();
    coordinator.rollback(&mut ctx, inner).unwrap();
    assert!(!outer.is_rollback_only());

    let token = token_of(&outer).unwrap();
    coordinator.commit(&mut ctx, outer).unwrap();
    assert_committed(&coordinator, token);
}

#[test]
fn explicit_mark_still_applies_without_global_marking() {
    let coordinator = coordinator_with(
        CoordinatorConfig::default().with_global_rollback_on_participation_failure(false),
    );
    let mut ctx = coordinator.new_context();

    let outer = coordinator.begin(&mut ctx, &required()).unwrap();
    let mut inner = coordinator.begin(&mut ctx, &required()).unwrap();
    inner.set_rollback_only();
    coordinator.rollback(&mut ctx, inner).unwrap();

    assert!(outer.is_rollback_only());
    assert!(coordinator.commit(&mut ctx, outer).is_err());
}

#[test]
fn validate_existing_rejects_writer_in_read_only_transaction() {
    let coordinator =
        coordinator_with(CoordinatorConfig::default().with_validate_existing_transaction(true));
    let mut ctx = coordinator.new_context();

    let outer = coordinator
        .begin(&mut ctx, &required().read_only())
        .unwrap();

    let err = coordinator.begin(&mut ctx, &required()).unwrap_err();
    assert!(err.is_illegal_state());
    assert!(err.to_string().contains("read-only"));

    let reader = coordinator
        .begin(&mut ctx, &required().read_only())
        .unwrap();
    coordinator.commit(&mut ctx, reader).unwrap();
    coordinator.commit(&mut ctx, outer).unwrap();
    assert!(ctx.is_idle());
}

#[test]
fn read_only_mismatch_allowed_by_default() {
    let coordinator = coordinator();
    let mut ctx = coordinator.new_context();

    let outer = coordinator
        .begin(&mut ctx, &required().read_only())
        .unwrap();
    let inner = coordinator.begin(&mut ctx, &required()).unwrap();
    assert!(inner.is_participating());

    coordinator.commit(&mut ctx, inner).unwrap();
    coordinator.commit(&mut ctx, outer).unwrap();
}

#[test]
fn rollback_on_commit_failure_rolls_back_physically() {
    let coordinator =
        coordinator_with(CoordinatorConfig::default().with_rollback_on_commit_failure(true));
    let mut ctx = coordinator.new_context();

    let tx = coordinator.begin(&mut ctx, &required()).unwrap();
    let token = token_of(&tx).unwrap();
    let transaction = tx.transaction().unwrap().clone();
    coordinator.resource().fail_next(ResourceOperation::Commit);

    let err = coordinator.commit(&mut ctx, tx).unwrap_err();
    assert_eq!(err.failed_operation(), Some(ResourceOperation::Commit));
    assert_eq!(transaction.status(), PhysicalStatus::RolledBack);
    assert_rolled_back(&coordinator, token);
}

#[test]
fn begin_default_uses_configured_propagation() {
    let coordinator = coordinator_with(
        CoordinatorConfig::default().with_default_propagation(Propagation::RequiresNew),
    );
    let mut ctx = coordinator.new_context();

    let outer = coordinator.begin_default(&mut ctx).unwrap();
    let inner = coordinator.begin_default(&mut ctx).unwrap();
    assert!(inner.is_new_transaction());
    assert_ne!(inner.id(), outer.id());

    coordinator.commit(&mut ctx, inner).unwrap();
    coordinator.commit(&mut ctx, outer).unwrap();
}

// ============================================================================
// txnest.toml
// ============================================================================

#[test]
fn open_writes_default_config() {
    let dir = TempDir::new().unwrap();

    let coordinator = txnest::open(RecordingResource::new(), dir.path()).unwrap();
    assert_eq!(coordinator.config(), &CoordinatorConfig::default());

    let written = std::fs::read_to_string(dir.path().join(txnest::CONFIG_FILE_NAME)).unwrap();
    assert_eq!(written, CoordinatorConfig::default_toml());
}

#[test]
fn open_reads_existing_config() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join(txnest::CONFIG_FILE_NAME),
        "default_propagation = \"requires_new\"\nfail_early_on_global_rollback_only = true\n",
    )
    .unwrap();

    let coordinator = txnest::open(RecordingResource::new(), dir.path()).unwrap();
    assert_eq!(coordinator.config().default_propagation, Propagation::RequiresNew);
    assert!(coordinator.config().fail_early_on_global_rollback_only);
    assert!(coordinator.config().global_rollback_on_participation_failure);
}

#[test]
fn open_creates_missing_directory() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("service").join("txn");

    txnest::open(RecordingResource::new(), &nested).unwrap();
    assert!(nested.join(txnest::CONFIG_FILE_NAME).exists());
}

#[test]
fn open_rejects_invalid_config() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join(txnest::CONFIG_FILE_NAME),
        "default_propagation = \"nested\"\n",
    )
    .unwrap();

    let result = txnest::open(RecordingResource::new(), dir.path());
    assert!(matches!(result, Err(txnest::ConfigError::Parse { .. })));
}
