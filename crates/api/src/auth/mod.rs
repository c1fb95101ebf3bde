//! Authentication primitives.
//!
//! - [`jwt`]: HS256 access-token generation and validation. Tokens are
//!   issued by an external identity service; this server only validates
//!   them. Generation exists for tooling and tests.

pub mod jwt;
