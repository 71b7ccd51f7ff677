//! Command implementations and console/JSON output

pub mod analyze;
pub mod report;
pub mod setup;
pub mod ui;
pub mod validate;
