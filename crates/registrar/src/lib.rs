//! Application review workflow for the student registration portal.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
