//! Request handlers.
//!
//! Handlers delegate to repositories in `lms_db` and the release engine,
//! and map errors via [`AppError`](crate::error::AppError).

pub mod admin;
pub mod availability;
pub mod course;
pub mod enrollment;
pub mod points;
pub mod quiz;
pub mod release_rule;
pub mod release_schedule;
