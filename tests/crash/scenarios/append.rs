//! Append crash scenarios
//!
//! - Crash before the entry is written → archive byte-identical
//! - Crash after the entry is written and synced → entry visible

use std::fs;

use arcdb::crash_point::points;
use arcdb::DbErrorCode;

use crate::crash::harness::{report_failure, run_with_crash_point, ChildOp};
use crate::crash::utils::{create_temp_data_dir, open_db, payload, seed_database};

#[test]
fn test_insert_crash_before_write_leaves_archive_unchanged() {
    let temp_dir = create_temp_data_dir();
    let path = seed_database(temp_dir.path());
    let before = fs::read(&path).unwrap();

    let op = ChildOp::Insert {
        key: "gamma".into(),
        payload: "gamma-v1".into(),
    };
    let result = run_with_crash_point(points::APPEND_BEFORE_WRITE, &path, op);
    if !result.hit(points::APPEND_BEFORE_WRITE) {
        report_failure(points::APPEND_BEFORE_WRITE, "insert", &result);
        panic!("child did not crash at {}", points::APPEND_BEFORE_WRITE);
    }

    assert_eq!(fs::read(&path).unwrap(), before);
    let mut db = open_db(&path);
    assert_eq!(db.get("gamma").unwrap_err().code(), DbErrorCode::NotFound);
}

#[test]
fn test_insert_crash_after_write_is_durable() {
    let temp_dir = create_temp_data_dir();
    let path = seed_database(temp_dir.path());

    let op = ChildOp::Insert {
        key: "gamma".into(),
        payload: "gamma-v1".into(),
    };
    let result = run_with_crash_point(points::APPEND_AFTER_WRITE, &path, op);
    if !result.hit(points::APPEND_AFTER_WRITE) {
        report_failure(points::APPEND_AFTER_WRITE, "insert", &result);
        panic!("child did not crash at {}", points::APPEND_AFTER_WRITE);
    }

    let mut db = open_db(&path);
    assert_eq!(payload(&mut db, "gamma"), "gamma-v1");
    assert_eq!(db.list_records().unwrap(), vec!["alpha", "beta", "gamma"]);
}

#[test]
fn test_append_update_crash_before_write_keeps_previous_revision() {
    let temp_dir = create_temp_data_dir();
    let path = seed_database(temp_dir.path());

    let op = ChildOp::Update {
        key: "beta".into(),
        payload: "beta-v2".into(),
        rebuild: false,
    };
    let result = run_with_crash_point(points::APPEND_BEFORE_WRITE, &path, op);
    if !result.hit(points::APPEND_BEFORE_WRITE) {
        report_failure(points::APPEND_BEFORE_WRITE, "update", &result);
        panic!("child did not crash at {}", points::APPEND_BEFORE_WRITE);
    }

    let mut db = open_db(&path);
    assert_eq!(payload(&mut db, "beta"), "beta-v1");
}
