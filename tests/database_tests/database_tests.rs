//! Tests for Database
//!
//! These tests verify:
//! - Course and certificate CRUD
//! - Chain maintenance on insert and delete
//! - Swap-with-last course delete and cascade
//! - Free-slot reuse and threshold compaction
//! - Projections, counts and scans
//! - Persistence across reopen and flush idempotence
//! - verify() on healthy and damaged stores

use std::fs;
use std::sync::Arc;
use std::thread;

use tandemdb::config::Config;
use tandemdb::model::Link;
use tandemdb::{CertificateUpdate, CourseUpdate, Database, TandemError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_db() -> (TempDir, Database) {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::open_path(temp_dir.path()).unwrap();
    (temp_dir, db)
}

/// Database that never compacts on its own
fn setup_temp_db_without_compaction() -> (TempDir, Database) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .compaction_threshold(1000)
        .build();
    let db = Database::open(config).unwrap();
    (temp_dir, db)
}

fn seed_course(db: &Database, id: u32) {
    db.insert_course(id, &format!("Course {}", id), "CS", "Smith")
        .unwrap();
}

fn chain_ids(db: &Database, course_id: u32) -> Vec<u32> {
    db.certificates_of(course_id)
        .unwrap()
        .iter()
        .map(|(_, c)| c.id)
        .collect()
}

fn assert_healthy(db: &Database) {
    let report = db.verify().unwrap();
    assert!(report.is_ok(), "verify problems: {:?}", report.problems);
}

// =============================================================================
// Open Tests
// =============================================================================

#[test]
fn test_open_creates_table_files() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("store");

    let _db = Database::open_path(&path).unwrap();

    for name in [
        "courses.fl",
        "courses.ind",
        "certificates.fl",
        "certificates.ind",
        "certificates.jk",
    ] {
        assert!(path.join(name).exists(), "{} missing", name);
    }
    assert!(!path.join("courses.jk").exists());
}

#[test]
fn test_open_rejects_invalid_config() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .compaction_threshold(0)
        .build();

    let result = Database::open(config);
    assert!(matches!(result, Err(TandemError::Config(_))));
}

#[test]
fn test_custom_table_names() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .master_name("m")
        .slave_name("s")
        .build();

    let db = Database::open(config).unwrap();
    seed_course(&db, 1);

    assert!(temp_dir.path().join("m.fl").exists());
    assert!(temp_dir.path().join("s.jk").exists());
}

// =============================================================================
// Course Tests
// =============================================================================

#[test]
fn test_insert_and_get_course() {
    let (_temp, db) = setup_temp_db();

    assert_eq!(db.insert_course(1, "Intro", "CS", "Smith").unwrap(), 0);
    assert_eq!(db.insert_course(2, "Algebra", "Math", "Jones").unwrap(), 108);

    let course = db.course(2).unwrap();
    assert_eq!(course.title, "Algebra");
    assert_eq!(course.first_certificate, Link::Nil);
    assert!(course.presence);
    assert_eq!(db.count_courses(), 2);
}

#[test]
fn test_duplicate_course_id_leaves_file_unchanged() {
    let (temp, db) = setup_temp_db();
    seed_course(&db, 1);

    let err = db.insert_course(1, "Other", "X", "Y").unwrap_err();

    assert!(matches!(err, TandemError::DuplicateId { id: 1, .. }));
    assert_eq!(fs::metadata(temp.path().join("courses.fl")).unwrap().len(), 108);
    assert_eq!(db.course(1).unwrap().title, "Course 1");
}

#[test]
fn test_missing_course_is_not_found() {
    let (_temp, db) = setup_temp_db();

    let err = db.course(42).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_update_course_keeps_offset() {
    let (_temp, db) = setup_temp_db();
    seed_course(&db, 1);
    seed_course(&db, 2);

    let update = CourseUpdate {
        title: Some("Renamed".to_string()),
        instructor: Some("Lee".to_string()),
        ..Default::default()
    };
    let updated = db.update_course(2, &update).unwrap();

    assert_eq!(updated.title, "Renamed");
    assert_eq!(updated.category, "CS");
    assert_eq!(db.course_offset(2), Some(108));
    assert_eq!(db.course(2).unwrap().instructor, "Lee");
}

#[test]
fn test_delete_last_course_truncates() {
    let (temp, db) = setup_temp_db();
    seed_course(&db, 1);
    seed_course(&db, 2);

    db.delete_course(2).unwrap();

    assert_eq!(fs::metadata(temp.path().join("courses.fl")).unwrap().len(), 108);
    assert_eq!(db.course_offset(1), Some(0));
    assert!(db.course(2).unwrap_err().is_not_found());
    assert_healthy(&db);
}

#[test]
fn test_delete_course_moves_last_into_hole() {
    let (temp, db) = setup_temp_db();
    seed_course(&db, 1);
    seed_course(&db, 2);
    seed_course(&db, 3);
    db.insert_certificate(30, 3, "Carol").unwrap();

    db.delete_course(1).unwrap();

    assert_eq!(db.count_courses(), 2);
    assert_eq!(db.course_offset(3), Some(0));
    assert_eq!(db.course_offset(2), Some(108));
    assert_eq!(fs::metadata(temp.path().join("courses.fl")).unwrap().len(), 216);

    // the moved course still owns its chain
    assert_eq!(chain_ids(&db, 3), vec![30]);
    assert_healthy(&db);
}

#[test]
fn test_delete_course_cascades_to_certificates() {
    let (_temp, db) = setup_temp_db_without_compaction();
    seed_course(&db, 1);
    seed_course(&db, 2);
    db.insert_certificate(10, 1, "Alice").unwrap();
    db.insert_certificate(20, 2, "Bob").unwrap();
    db.insert_certificate(11, 1, "Carol").unwrap();

    db.delete_course(1).unwrap();

    assert!(db.certificate(10).unwrap_err().is_not_found());
    assert!(db.certificate(11).unwrap_err().is_not_found());
    assert_eq!(db.count_certificates(None).unwrap(), 1);
    let mut free = db.free_slots();
    free.sort_unstable();
    assert_eq!(free, vec![0, 110]);
    assert_healthy(&db);
}

#[test]
fn test_cascade_delete_triggers_compaction() {
    let (temp, db) = setup_temp_db();
    seed_course(&db, 1);
    seed_course(&db, 2);
    db.insert_certificate(10, 1, "Alice").unwrap();
    db.insert_certificate(11, 1, "Bob").unwrap();
    db.insert_certificate(20, 2, "Carol").unwrap();

    db.delete_course(1).unwrap();

    assert!(db.free_slots().is_empty());
    assert_eq!(db.certificate_offset(20), Some(0));
    assert_eq!(db.course(2).unwrap().first_certificate, Link::At(0));
    assert_eq!(
        fs::metadata(temp.path().join("certificates.fl")).unwrap().len(),
        55
    );
    assert_healthy(&db);
}

#[test]
fn test_scan_courses_in_file_order() {
    let (_temp, db) = setup_temp_db();
    seed_course(&db, 5);
    seed_course(&db, 3);

    let mut seen = Vec::new();
    db.scan_courses(false, |at, c| seen.push((at, c.id))).unwrap();

    assert_eq!(seen, vec![(0, 5), (108, 3)]);
}

// =============================================================================
// Certificate Tests
// =============================================================================

#[test]
fn test_certificate_chain_pointers() {
    let (_temp, db) = setup_temp_db();
    seed_course(&db, 1);

    assert_eq!(db.insert_certificate(10, 1, "Alice").unwrap(), 0);
    assert_eq!(db.insert_certificate(11, 1, "Bob").unwrap(), 55);

    let course = db.course(1).unwrap();
    let first = db.certificate(10).unwrap();
    let second = db.certificate(11).unwrap();

    assert_eq!(course.first_certificate, Link::At(0));
    assert_eq!(first.previous, Link::Nil);
    assert_eq!(first.next, Link::At(55));
    assert_eq!(second.previous, Link::At(0));
    assert_eq!(second.next, Link::Nil);
    assert_healthy(&db);
}

#[test]
fn test_certificate_for_missing_course() {
    let (temp, db) = setup_temp_db();

    let err = db.insert_certificate(10, 99, "Alice").unwrap_err();

    assert!(matches!(err, TandemError::NotFound { id: 99, .. }));
    assert_eq!(
        fs::metadata(temp.path().join("certificates.fl")).unwrap().len(),
        0
    );
}

#[test]
fn test_duplicate_certificate_id() {
    let (_temp, db) = setup_temp_db();
    seed_course(&db, 1);
    db.insert_certificate(10, 1, "Alice").unwrap();

    let err = db.insert_certificate(10, 1, "Bob").unwrap_err();

    assert!(matches!(err, TandemError::DuplicateId { id: 10, .. }));
    assert_eq!(chain_ids(&db, 1), vec![10]);
}

#[test]
fn test_delete_head_certificate() {
    let (_temp, db) = setup_temp_db();
    seed_course(&db, 1);
    db.insert_certificate(10, 1, "Alice").unwrap();
    db.insert_certificate(11, 1, "Bob").unwrap();

    db.delete_certificate(10).unwrap();

    let course = db.course(1).unwrap();
    let remaining = db.certificate(11).unwrap();
    assert_eq!(course.first_certificate, Link::At(55));
    assert_eq!(remaining.previous, Link::Nil);
    assert_eq!(db.free_slots(), vec![0]);
    assert!(db.certificate(10).unwrap_err().is_not_found());
    assert_healthy(&db);
}

#[test]
fn test_free_slot_is_reused() {
    let (_temp, db) = setup_temp_db();
    seed_course(&db, 1);
    db.insert_certificate(10, 1, "Alice").unwrap();
    db.insert_certificate(11, 1, "Bob").unwrap();
    db.delete_certificate(10).unwrap();

    assert_eq!(db.insert_certificate(12, 1, "Carol").unwrap(), 0);

    assert!(db.free_slots().is_empty());
    assert_eq!(chain_ids(&db, 1), vec![11, 12]);
    assert_healthy(&db);
}

#[test]
fn test_threshold_compaction() {
    let (temp, db) = setup_temp_db();
    seed_course(&db, 1);
    for id in 10..14 {
        db.insert_certificate(id, 1, "holder").unwrap();
    }

    db.delete_certificate(10).unwrap();
    assert_eq!(db.free_slots().len(), 1);

    db.delete_certificate(11).unwrap();

    assert!(db.free_slots().is_empty());
    assert_eq!(
        fs::metadata(temp.path().join("certificates.fl")).unwrap().len(),
        2 * 55
    );
    assert_eq!(fs::metadata(temp.path().join("certificates.jk")).unwrap().len(), 0);
    assert_eq!(chain_ids(&db, 1), vec![12, 13]);
    assert_healthy(&db);
}

#[test]
fn test_manual_compaction() {
    let (_temp, db) = setup_temp_db_without_compaction();
    seed_course(&db, 1);
    for id in 10..16 {
        db.insert_certificate(id, 1, "holder").unwrap();
    }
    for id in [10, 12, 14] {
        db.delete_certificate(id).unwrap();
    }

    let stats = db.compact().unwrap();

    assert_eq!(stats.bytes_after, 3 * 55);
    assert_eq!(stats.reclaimed_slots, 3);
    assert_eq!(db.stats().unwrap().certificate_bytes, 3 * 55);
    assert_eq!(chain_ids(&db, 1), vec![11, 13, 15]);
    assert_healthy(&db);
}

#[test]
fn test_update_certificate_keeps_links() {
    let (_temp, db) = setup_temp_db();
    seed_course(&db, 1);
    db.insert_certificate(10, 1, "Alice").unwrap();
    db.insert_certificate(11, 1, "Bob").unwrap();

    let update = CertificateUpdate {
        issued_to: Some("Robert".to_string()),
    };
    db.update_certificate(11, &update).unwrap();

    let cert = db.certificate(11).unwrap();
    assert_eq!(cert.issued_to, "Robert");
    assert_eq!(cert.previous, Link::At(0));
    assert_eq!(db.certificate_offset(11), Some(55));
}

#[test]
fn test_count_certificates() {
    let (_temp, db) = setup_temp_db();
    seed_course(&db, 1);
    seed_course(&db, 2);
    db.insert_certificate(10, 1, "A").unwrap();
    db.insert_certificate(11, 1, "B").unwrap();
    db.insert_certificate(20, 2, "C").unwrap();

    assert_eq!(db.count_certificates(None).unwrap(), 3);
    assert_eq!(db.count_certificates(Some(1)).unwrap(), 2);
    assert_eq!(db.count_certificates(Some(2)).unwrap(), 1);
    assert!(db.count_certificates(Some(3)).unwrap_err().is_not_found());
}

#[test]
fn test_certificates_include_deleted() {
    let (_temp, db) = setup_temp_db_without_compaction();
    seed_course(&db, 1);
    db.insert_certificate(10, 1, "A").unwrap();
    db.insert_certificate(11, 1, "B").unwrap();
    db.delete_certificate(10).unwrap();

    assert_eq!(db.certificates(false).unwrap().len(), 1);

    let all = db.certificates(true).unwrap();
    assert_eq!(all.len(), 2);
    assert!(!all[0].presence);
    assert_eq!(all[0].issued_to, "");
}

// =============================================================================
// Projection Tests
// =============================================================================

#[test]
fn test_course_fields_projection() {
    let (_temp, db) = setup_temp_db();
    db.insert_course(1, "Intro", "CS", "Smith").unwrap();

    let projection = db.course_fields(1, &["title", "budget"]).unwrap();

    assert_eq!(projection.get("id"), Some("1"));
    assert_eq!(projection.get("title"), Some("Intro"));
    assert_eq!(projection.get("category"), None);
    assert_eq!(projection.unknown, vec!["budget".to_string()]);
}

#[test]
fn test_certificate_fields_links() {
    let (_temp, db) = setup_temp_db();
    seed_course(&db, 1);
    db.insert_certificate(10, 1, "Alice").unwrap();

    let projection = db.certificate_fields(10, &["previous", "next"]).unwrap();

    assert_eq!(projection.get("previous"), Some("-1"));
    assert_eq!(projection.get("next"), Some("-1"));
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_reopen_restores_everything() {
    let temp_dir = TempDir::new().unwrap();

    {
        let db = Database::open_path(temp_dir.path()).unwrap();
        seed_course(&db, 1);
        seed_course(&db, 2);
        db.insert_certificate(10, 1, "Alice").unwrap();
        db.insert_certificate(11, 1, "Bob").unwrap();
        db.insert_certificate(20, 2, "Carol").unwrap();
        db.delete_certificate(10).unwrap();
        db.close().unwrap();
    }

    let db = Database::open_path(temp_dir.path()).unwrap();
    assert_eq!(db.count_courses(), 2);
    assert_eq!(db.count_certificates(None).unwrap(), 2);
    assert_eq!(db.free_slots(), vec![0]);
    assert_eq!(chain_ids(&db, 1), vec![11]);
    assert_eq!(db.insert_certificate(12, 2, "Dan").unwrap(), 0);
    assert_eq!(chain_ids(&db, 2), vec![20, 12]);
    assert_healthy(&db);
}

#[test]
fn test_reopen_without_flush_on_write_needs_close() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .flush_on_write(false)
        .build();

    {
        let db = Database::open(config.clone()).unwrap();
        seed_course(&db, 1);
        db.close().unwrap();
    }

    let db = Database::open(config).unwrap();
    assert_eq!(db.course(1).unwrap().title, "Course 1");
}

#[test]
fn test_flush_is_idempotent() {
    let (temp, db) = setup_temp_db_without_compaction();
    seed_course(&db, 1);
    db.insert_certificate(10, 1, "A").unwrap();
    db.insert_certificate(11, 1, "B").unwrap();
    db.delete_certificate(10).unwrap();

    db.flush().unwrap();
    let snapshot: Vec<Vec<u8>> = ["courses.ind", "certificates.ind", "certificates.jk"]
        .iter()
        .map(|name| fs::read(temp.path().join(name)).unwrap())
        .collect();
    db.flush().unwrap();

    for (name, before) in ["courses.ind", "certificates.ind", "certificates.jk"]
        .iter()
        .zip(&snapshot)
    {
        assert_eq!(&fs::read(temp.path().join(name)).unwrap(), before, "{}", name);
    }
    assert_eq!(snapshot[1].len(), 8);
    assert_eq!(snapshot[2], vec![0, 0, 0, 0]);
}

// =============================================================================
// Verify Tests
// =============================================================================

#[test]
fn test_verify_empty_store() {
    let (_temp, db) = setup_temp_db();
    assert_healthy(&db);
}

#[test]
fn test_verify_detects_broken_chain() {
    let temp_dir = TempDir::new().unwrap();

    {
        let db = Database::open_path(temp_dir.path()).unwrap();
        seed_course(&db, 1);
        db.insert_certificate(10, 1, "Alice").unwrap();
        db.insert_certificate(11, 1, "Bob").unwrap();
        db.close().unwrap();
    }

    // Zero the previous link of the second certificate (bytes 39..47)
    let path = temp_dir.path().join("certificates.fl");
    let mut raw = fs::read(&path).unwrap();
    raw[55 + 39..55 + 47].copy_from_slice(&(-1i64).to_be_bytes());
    fs::write(&path, raw).unwrap();

    let db = Database::open_path(temp_dir.path()).unwrap();
    let report = db.verify().unwrap();
    assert!(!report.is_ok());
    assert!(report.problems.iter().any(|p| p.contains("certificate 11")));
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_inserts() {
    let (_temp, db) = setup_temp_db();
    seed_course(&db, 1);
    let db = Arc::new(db);

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let db = Arc::clone(&db);
            thread::spawn(move || {
                for i in 0..10 {
                    db.insert_certificate(t * 100 + i, 1, "holder").unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(db.count_certificates(Some(1)).unwrap(), 40);
    assert_healthy(&db);
}
