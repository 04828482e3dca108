//!
//! Utility module for the wave portal.
//!
//! Re-exports display helpers and the tracing setup used throughout the codebase.
/// Formatting helpers for log and display output
pub mod format;
/// Tracing subscriber setup
pub mod logging;

pub use format::{format_wave_timestamp, short_address};
pub use logging::init_tracing;
