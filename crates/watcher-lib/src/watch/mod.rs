//! The watch-detect-remediate control loop
//!
//! Each cycle lists the instances in the watched namespace, keeps those owned
//! by the target StatefulSets, checks them for OOM terminations and, on a
//! match, restarts every target. The loop then sleeps for the poll interval.
//! Cycles never overlap and no state is carried from one cycle to the next.

mod config;
mod r#loop;


pub use config::WatchConfig;
pub use r#loop::{CycleOutcome, WatchLoop};
