//! Copy orchestration module
//!
//! Per-element copy details, destination paths, specification defaults
//! and the duplicate merge step.

mod detail;
mod duplicates;
mod path;
mod source;
mod spec;

#[cfg(test)]
pub(crate) mod testing;

pub use detail::*;
pub use duplicates::*;
pub use path::*;
pub use source::*;
pub use spec::*;
