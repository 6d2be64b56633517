//! Core copy engine module
//!
//! Drives a whole copy: walk, per-element details, duplicate handling
//! and the parallel copy phase.

mod copier;

pub use copier::*;
