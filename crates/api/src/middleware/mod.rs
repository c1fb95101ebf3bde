//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`]: the authenticated user from a JWT Bearer token.
//! - [`rbac::RequireAdmin`]: requires the `admin` role.
//! - [`rbac::RequireInstructor`]: requires `instructor` or `admin`.

pub mod auth;
pub mod rbac;
