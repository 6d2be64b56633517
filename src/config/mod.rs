//! Configuration module for copyspec
//!
//! Provides CLI arguments, the JSON specification file and the resolved
//! runtime settings.

mod settings;

pub use settings::*;
