//! Command-line entry points.

pub mod about;
pub mod transcribe;
