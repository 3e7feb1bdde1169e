//! Crash scenarios, one module per write path

pub mod append;
pub mod backup;
pub mod rebuild;
