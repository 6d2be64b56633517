//! File system operations module
//!
//! Provides the source tree walker and the raw buffered copy used by
//! unfiltered elements.

mod operations;
mod scanner;

pub use operations::*;
pub use scanner::*;
