//! Crash test harness for subprocess management
//!
//! The parent spawns the current test executable filtered down to
//! [`crash_child`], passing the operation through the environment. The child
//! performs it against the same archive and is expected to abort at the
//! crash point.

use std::env;
use std::path::Path;
use std::process::{Command, ExitStatus};

use arcdb::crash_point::CRASH_POINT_ENV;
use arcdb::{Database, DatabaseConfig, Metadata};

/// Fully qualified name of the child test
pub const CHILD_TEST: &str = "crash::harness::crash_child";

const CHILD_DB_ENV: &str = "ARCDB_CHILD_DB";
const CHILD_OP_ENV: &str = "ARCDB_CHILD_OP";

/// Exit code of a child that finished its operation without crashing
const EXIT_NO_CRASH: i32 = 3;

/// Exit code libtest uses when a test panics
const EXIT_TEST_FAILED: i32 = 101;

/// Operation the child performs
#[derive(Debug, Clone)]
pub enum ChildOp {
    Insert { key: String, payload: String },
    Update { key: String, payload: String, rebuild: bool },
    Delete { key: String },
    Compact,
    Backup { target: String },
}

impl ChildOp {
    fn encode(&self) -> String {
        match self {
            ChildOp::Insert { key, payload } => format!("insert:{}:{}", key, payload),
            ChildOp::Update {
                key,
                payload,
                rebuild,
            } => format!("update:{}:{}:{}", key, payload, rebuild),
            ChildOp::Delete { key } => format!("delete:{}", key),
            ChildOp::Compact => "compact".to_string(),
            ChildOp::Backup { target } => format!("backup:{}", target),
        }
    }

    fn decode(encoded: &str) -> Option<Self> {
        let (op, rest) = encoded.split_once(':').unwrap_or((encoded, ""));
        match op {
            "insert" => {
                let (key, payload) = rest.split_once(':')?;
                Some(ChildOp::Insert {
                    key: key.to_string(),
                    payload: payload.to_string(),
                })
            }
            "update" => {
                let mut parts = rest.splitn(3, ':');
                Some(ChildOp::Update {
                    key: parts.next()?.to_string(),
                    payload: parts.next()?.to_string(),
                    rebuild: parts.next()? == "true",
                })
            }
            "delete" => Some(ChildOp::Delete {
                key: rest.to_string(),
            }),
            "compact" => Some(ChildOp::Compact),
            "backup" => Some(ChildOp::Backup {
                target: rest.to_string(),
            }),
            _ => None,
        }
    }
}

/// Result of a crash test execution
#[derive(Debug)]
pub struct CrashTestResult {
    /// Whether the child died at a crash point
    pub crashed: bool,
    /// Exit status if available
    pub exit_status: Option<ExitStatus>,
    /// stdout output
    pub stdout: String,
    /// stderr output
    pub stderr: String,
}

impl CrashTestResult {
    /// Whether the child reported reaching `point`
    pub fn hit(&self, point: &str) -> bool {
        self.crashed
            && self
                .stderr
                .contains(&format!("[CRASH] Triggering crash at point: {}", point))
    }
}

/// Run `op` against `db_path` in a child process with `crash_point` armed
pub fn run_with_crash_point(crash_point: &str, db_path: &Path, op: ChildOp) -> CrashTestResult {
    let exe = match env::current_exe() {
        Ok(exe) => exe,
        Err(e) => return failed_to_spawn(e),
    };

    let output = Command::new(exe)
        .args([CHILD_TEST, "--exact", "--nocapture", "--test-threads=1"])
        .env(CRASH_POINT_ENV, crash_point)
        .env(CHILD_DB_ENV, db_path)
        .env(CHILD_OP_ENV, op.encode())
        .output();

    match output {
        Ok(output) => {
            let code = output.status.code();
            CrashTestResult {
                crashed: !output.status.success()
                    && code != Some(EXIT_NO_CRASH)
                    && code != Some(EXIT_TEST_FAILED),
                exit_status: Some(output.status),
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            }
        }
        Err(e) => failed_to_spawn(e),
    }
}

fn failed_to_spawn(e: std::io::Error) -> CrashTestResult {
    CrashTestResult {
        crashed: false,
        exit_status: None,
        stdout: String::new(),
        stderr: format!("Failed to execute: {}", e),
    }
}

/// Child side. A no-op unless spawned by [`run_with_crash_point`].
#[test]
fn crash_child() {
    let (Ok(db_path), Ok(encoded)) = (env::var(CHILD_DB_ENV), env::var(CHILD_OP_ENV)) else {
        return;
    };
    let op = ChildOp::decode(&encoded).expect("malformed child op");

    let config = DatabaseConfig::new("crash_db", db_path).with_auto_compact(false);
    let mut db = Database::new(config).unwrap();

    match op {
        ChildOp::Insert { key, payload } => {
            db.insert(&key, payload.as_bytes(), Metadata::new()).unwrap()
        }
        ChildOp::Update {
            key,
            payload,
            rebuild,
        } => db.update(&key, payload.as_bytes(), None, rebuild).unwrap(),
        ChildOp::Delete { key } => db.delete(&key).unwrap(),
        ChildOp::Compact => {
            db.compact().unwrap();
        }
        ChildOp::Backup { target } => {
            db.backup(&target, false).unwrap();
        }
    }

    std::process::exit(EXIT_NO_CRASH);
}

/// Report crash test failure
pub fn report_failure(crash_point: &str, operation: &str, result: &CrashTestResult) {
    eprintln!("=== CRASH TEST FAILURE ===");
    eprintln!("Crash point: {}", crash_point);
    eprintln!("Operation: {}", operation);
    eprintln!("Exit status: {:?}", result.exit_status);
    eprintln!("Child stdout:\n{}", result.stdout);
    eprintln!("Child stderr:\n{}", result.stderr);
    eprintln!("==========================");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_op_encoding() {
        let ops = [
            ChildOp::Insert {
                key: "k".into(),
                payload: "v".into(),
            },
            ChildOp::Update {
                key: "k".into(),
                payload: "v2".into(),
                rebuild: true,
            },
            ChildOp::Delete { key: "k".into() },
            ChildOp::Compact,
            ChildOp::Backup {
                target: "/tmp/b.tar".into(),
            },
        ];
        for op in ops {
            let decoded = ChildOp::decode(&op.encode()).unwrap();
            assert_eq!(decoded.encode(), op.encode());
        }
    }
}
