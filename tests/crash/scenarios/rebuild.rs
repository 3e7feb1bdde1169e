//! Rebuild crash scenarios
//!
//! - Crash before the temp archive is written → original untouched, no temp file
//! - Crash after the temp archive is written, before the rename → original
//!   untouched, temp file left behind and ignored
//! - Crash after the rename → new archive in place

use std::fs;

use arcdb::crash_point::points;
use arcdb::DbErrorCode;

use crate::crash::harness::{report_failure, run_with_crash_point, ChildOp};
use crate::crash::utils::{create_temp_data_dir, open_db, payload, seed_database, temp_files};

#[test]
fn test_compact_crash_before_replace_keeps_original() {
    let temp_dir = create_temp_data_dir();
    let path = seed_database(temp_dir.path());
    let before = fs::read(&path).unwrap();

    let result = run_with_crash_point(points::REBUILD_BEFORE_REPLACE, &path, ChildOp::Compact);
    if !result.hit(points::REBUILD_BEFORE_REPLACE) {
        report_failure(points::REBUILD_BEFORE_REPLACE, "compact", &result);
        panic!("child did not crash at {}", points::REBUILD_BEFORE_REPLACE);
    }

    assert_eq!(fs::read(&path).unwrap(), before, "original archive modified");
    assert_eq!(temp_files(temp_dir.path()).len(), 1);

    let mut db = open_db(&path);
    assert_eq!(db.entry_count().unwrap(), 3);
    assert_eq!(payload(&mut db, "alpha"), "alpha-v2");
    assert_eq!(payload(&mut db, "beta"), "beta-v1");

    // The leftover temp file does not get in the way of the next rebuild.
    assert_eq!(db.compact().unwrap(), 1);
    assert_eq!(payload(&mut db, "alpha"), "alpha-v2");
}

#[test]
fn test_delete_crash_before_replace_keeps_key() {
    let temp_dir = create_temp_data_dir();
    let path = seed_database(temp_dir.path());
    let before = fs::read(&path).unwrap();

    let op = ChildOp::Delete {
        key: "beta".into(),
    };
    let result = run_with_crash_point(points::REBUILD_BEFORE_REPLACE, &path, op);
    if !result.hit(points::REBUILD_BEFORE_REPLACE) {
        report_failure(points::REBUILD_BEFORE_REPLACE, "delete", &result);
        panic!("child did not crash at {}", points::REBUILD_BEFORE_REPLACE);
    }

    assert_eq!(fs::read(&path).unwrap(), before);
    let mut db = open_db(&path);
    assert_eq!(payload(&mut db, "beta"), "beta-v1");
    assert_eq!(db.list_records().unwrap(), vec!["alpha", "beta"]);
}

#[test]
fn test_rebuild_update_crash_before_replace_keeps_old_payload() {
    let temp_dir = create_temp_data_dir();
    let path = seed_database(temp_dir.path());

    let op = ChildOp::Update {
        key: "alpha".into(),
        payload: "alpha-v3".into(),
        rebuild: true,
    };
    let result = run_with_crash_point(points::REBUILD_BEFORE_REPLACE, &path, op);
    if !result.hit(points::REBUILD_BEFORE_REPLACE) {
        report_failure(points::REBUILD_BEFORE_REPLACE, "update --rebuild", &result);
        panic!("child did not crash at {}", points::REBUILD_BEFORE_REPLACE);
    }

    let mut db = open_db(&path);
    assert_eq!(payload(&mut db, "alpha"), "alpha-v2");
    assert_eq!(db.entry_count().unwrap(), 3);
}

#[test]
fn test_crash_before_stage_leaves_no_temp_file() {
    let temp_dir = create_temp_data_dir();
    let path = seed_database(temp_dir.path());
    let before = fs::read(&path).unwrap();

    let result = run_with_crash_point(points::REBUILD_BEFORE_STAGE, &path, ChildOp::Compact);
    if !result.hit(points::REBUILD_BEFORE_STAGE) {
        report_failure(points::REBUILD_BEFORE_STAGE, "compact", &result);
        panic!("child did not crash at {}", points::REBUILD_BEFORE_STAGE);
    }

    assert_eq!(fs::read(&path).unwrap(), before);
    assert!(temp_files(temp_dir.path()).is_empty());
}

#[test]
fn test_compact_crash_after_replace_is_complete() {
    let temp_dir = create_temp_data_dir();
    let path = seed_database(temp_dir.path());

    let result = run_with_crash_point(points::REBUILD_AFTER_REPLACE, &path, ChildOp::Compact);
    if !result.hit(points::REBUILD_AFTER_REPLACE) {
        report_failure(points::REBUILD_AFTER_REPLACE, "compact", &result);
        panic!("child did not crash at {}", points::REBUILD_AFTER_REPLACE);
    }

    assert!(temp_files(temp_dir.path()).is_empty());
    let mut db = open_db(&path);
    assert_eq!(db.entry_count().unwrap(), 2);
    assert_eq!(db.stats().unwrap().stale_entries, 0);
    assert_eq!(payload(&mut db, "alpha"), "alpha-v2");
}

#[test]
fn test_delete_crash_after_replace_is_complete() {
    let temp_dir = create_temp_data_dir();
    let path = seed_database(temp_dir.path());

    let op = ChildOp::Delete {
        key: "alpha".into(),
    };
    let result = run_with_crash_point(points::REBUILD_AFTER_REPLACE, &path, op);
    if !result.hit(points::REBUILD_AFTER_REPLACE) {
        report_failure(points::REBUILD_AFTER_REPLACE, "delete", &result);
        panic!("child did not crash at {}", points::REBUILD_AFTER_REPLACE);
    }

    let mut db = open_db(&path);
    assert_eq!(db.get("alpha").unwrap_err().code(), DbErrorCode::NotFound);
    assert_eq!(db.list_records().unwrap(), vec!["beta"]);
}
