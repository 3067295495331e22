// ABOUTME: Fan-out module - concurrent per-device operations with join-all
// ABOUTME: semantics and deterministic result aggregation.

mod batch;
mod executor;
mod report;

pub use batch::*;
pub use executor::*;
pub use report::*;

#[cfg(test)]
mod executor_test;
