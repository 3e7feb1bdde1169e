//! Crash testing framework for arcdb
//!
//! Every scenario re-runs this test binary as a child process with
//! `ARCDB_CRASH_POINT` set, lets the child abort at that point, and then
//! checks what a fresh open of the archive sees.

pub mod harness;
pub mod scenarios;
pub mod utils;

pub use harness::*;
pub use utils::*;
