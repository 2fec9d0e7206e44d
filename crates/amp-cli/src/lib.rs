//! CLI library components for the Amplitude tools.

pub mod cli;
pub mod logging;
pub mod progress;
pub mod report;
