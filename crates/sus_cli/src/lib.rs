//! sus CLI internals
//!
//! Config loading, scenario files, the headless runner and run reports,
//! shared by the `sus` binary and its tests.

pub mod config;
pub mod report;
pub mod runner;
pub mod scenario;
