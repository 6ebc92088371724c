//! COINRANK: Top-20 crypto risk/return ranking and portfolio recommender
//!
//! Library crate exposing all modules for use by integration tests
//! and the two binaries (batch run and dashboard).

pub mod config;
pub mod types;
pub mod market;
pub mod analysis;
pub mod engine;
pub mod storage;
pub mod dashboard;
pub mod logging;
