//! Failure detection over observed instances
//!
//! This module provides:
//! - Ownership filtering (instances owned by the target StatefulSets)
//! - Out-of-memory termination detection

mod oom_detector;
mod ownership;

pub use oom_detector::{FailureDetector, FailureMatch, FailureSignature};
pub use ownership::OwnershipFilter;
