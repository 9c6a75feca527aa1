//! Tests for IndexTable
//!
//! These tests verify:
//! - Sorted insertion and binary-search lookup
//! - Duplicate and missing ID errors
//! - Truncate-then-write persistence
//! - Rejection of corrupt index files

use std::fs;

use tandemdb::storage::{IndexEntry, IndexTable};
use tandemdb::TandemError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn index_with(pairs: &[(u32, u32)]) -> IndexTable {
    let mut index = IndexTable::new("certificate");
    for &(id, address) in pairs {
        index.add(id, address).unwrap();
    }
    index
}

fn ids(index: &IndexTable) -> Vec<u32> {
    index.entries().iter().map(|e| e.id).collect()
}

// =============================================================================
// In-Memory Tests
// =============================================================================

#[test]
fn test_entries_stay_sorted_by_id() {
    let index = index_with(&[(30, 0), (10, 55), (20, 110)]);

    assert_eq!(ids(&index), vec![10, 20, 30]);
    assert_eq!(index.address_of(10), Some(55));
    assert_eq!(index.address_of(30), Some(0));
    assert_eq!(index.address_of(99), None);
}

#[test]
fn test_duplicate_id_rejected() {
    let mut index = index_with(&[(1, 0)]);

    let err = index.add(1, 55).unwrap_err();
    assert!(matches!(err, TandemError::DuplicateId { id: 1, .. }));
    assert_eq!(index.len(), 1);
    assert_eq!(index.address_of(1), Some(0));
}

#[test]
fn test_remove_returns_address() {
    let mut index = index_with(&[(1, 0), (2, 55)]);

    assert_eq!(index.remove(1), Some(0));
    assert_eq!(index.remove(1), None);
    assert!(!index.exists(1));
    assert_eq!(index.len(), 1);
}

#[test]
fn test_update_address() {
    let mut index = index_with(&[(1, 110)]);

    index.update_address(1, 0).unwrap();
    assert_eq!(index.address_of(1), Some(0));

    let err = index.update_address(2, 0).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_last_by_address() {
    let index = index_with(&[(1, 108), (2, 216), (3, 0)]);

    assert_eq!(index.last_by_address(), Some(IndexEntry { id: 2, address: 216 }));
    assert!(IndexTable::new("course").last_by_address().is_none());
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_flush_and_load() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("certificates.ind");

    let index = index_with(&[(2, 55), (1, 0)]);
    index.flush(&path).unwrap();

    let raw = fs::read(&path).unwrap();
    assert_eq!(raw, vec![0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0, 55]);

    let loaded = IndexTable::load(&path, "certificate").unwrap();
    assert_eq!(loaded.entries(), index.entries());
}

#[test]
fn test_flush_truncates_stale_entries() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("certificates.ind");

    let mut index = index_with(&[(1, 0), (2, 55), (3, 110)]);
    index.flush(&path).unwrap();
    index.remove(2);
    index.remove(3);
    index.flush(&path).unwrap();

    assert_eq!(fs::metadata(&path).unwrap().len(), 8);
    let loaded = IndexTable::load(&path, "certificate").unwrap();
    assert_eq!(ids(&loaded), vec![1]);
}

#[test]
fn test_flush_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("courses.ind");

    let index = index_with(&[(5, 0), (6, 108)]);
    index.flush(&path).unwrap();
    let first = fs::read(&path).unwrap();
    index.flush(&path).unwrap();

    assert_eq!(fs::read(&path).unwrap(), first);
}

#[test]
fn test_load_missing_file_is_empty() {
    let temp = TempDir::new().unwrap();
    let index = IndexTable::load(&temp.path().join("nope.ind"), "course").unwrap();
    assert!(index.is_empty());
}

#[test]
fn test_load_rejects_partial_entry() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("courses.ind");
    fs::write(&path, [0u8; 12]).unwrap();

    let result = IndexTable::load(&path, "course");
    assert!(matches!(result, Err(TandemError::Malformed(_))));
}

#[test]
fn test_load_rejects_duplicate_ids() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("courses.ind");
    fs::write(&path, [0, 0, 0, 7, 0, 0, 0, 0, 0, 0, 0, 7, 0, 0, 0, 108]).unwrap();

    let result = IndexTable::load(&path, "course");
    assert!(matches!(result, Err(TandemError::Malformed(_))));
}
