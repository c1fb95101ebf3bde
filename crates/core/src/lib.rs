//! Domain logic for the course content release service.
//!
//! This crate has no internal dependencies and no database access. Callers
//! load rows, hand plain values to the functions here, and persist the
//! results.

pub mod availability;
pub mod calendar;
pub mod error;
pub mod pagination;
pub mod progress;
pub mod release;
pub mod roles;
pub mod types;
