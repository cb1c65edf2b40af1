//! reqfile benchmarking suite
//!
//! Benchmarks for manifest parsing, version handling and resolution.

pub mod common;

pub use common::*;
