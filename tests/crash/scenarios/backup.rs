//! Backup crash scenarios
//!
//! - Crash before the copy is renamed into place → no backup at the target

use std::fs;

use arcdb::crash_point::points;

use crate::crash::harness::{report_failure, run_with_crash_point, ChildOp};
use crate::crash::utils::{create_temp_data_dir, open_db, payload, seed_database};

#[test]
fn test_backup_crash_before_persist_leaves_no_partial_target() {
    let temp_dir = create_temp_data_dir();
    let path = seed_database(temp_dir.path());
    let before = fs::read(&path).unwrap();
    let target = temp_dir.path().join("backup.tar");

    let op = ChildOp::Backup {
        target: target.to_string_lossy().into_owned(),
    };
    let result = run_with_crash_point(points::BACKUP_BEFORE_PERSIST, &path, op);
    if !result.hit(points::BACKUP_BEFORE_PERSIST) {
        report_failure(points::BACKUP_BEFORE_PERSIST, "backup", &result);
        panic!("child did not crash at {}", points::BACKUP_BEFORE_PERSIST);
    }

    assert!(!target.exists());
    assert_eq!(fs::read(&path).unwrap(), before);

    let mut db = open_db(&path);
    assert_eq!(payload(&mut db, "alpha"), "alpha-v2");
    db.backup(&target, false).unwrap();
    assert_eq!(fs::read(&target).unwrap(), before);
}
