//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//! - A `Deserialize` update DTO (all `Option` fields) for patches

pub mod calendar;
pub mod course;
pub mod enrollment;
pub mod points;
pub mod quiz;
pub mod release;
pub mod user;
