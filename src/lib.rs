//! BINDER — multi-game trading card collection tracker.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod catalog;
pub mod config;
pub mod ingest;
pub mod ledger;
pub mod pricing;
pub mod server;
pub mod storage;
pub mod types;
