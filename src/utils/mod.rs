//! Shared utilities: duration parsing for command-line options.

pub mod duration;

pub use duration::{parse_duration, parse_timeout};
