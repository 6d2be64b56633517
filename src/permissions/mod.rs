//! Unix permission model
//!
//! Provides the read/write/execute triplet, the user/group/other set with
//! numeric and symbolic encodings, and the platform chmod primitive.

mod chmod;
mod set;
mod value;

pub use chmod::*;
pub use set::*;
pub use value::*;
