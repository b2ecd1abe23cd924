//! OOM watcher service
//!
//! Environment configuration and the health/metrics HTTP API used by the
//! `oom-watcher` binary.

pub mod api;
pub mod config;
