//! Content filtering module
//!
//! Streaming text transforms applied to copied file content: user line
//! transforms, a closed set of parameterized filters, and template
//! expansion. All stages run lazily as the filtered stream is read.

mod chain;
mod charset;
mod stages;
mod template;

pub use chain::*;
pub use charset::*;
pub use stages::*;
pub use template::*;
