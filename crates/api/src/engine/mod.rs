//! Release engine services.
//!
//! Thin database-facing wrappers around the pure logic in `lms_core`: they
//! load the rows a decision needs, call into core, and persist results.

pub mod availability;
pub mod calendar;
pub mod drip;
