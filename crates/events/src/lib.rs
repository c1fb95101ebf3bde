//! Event bus for course content release notifications.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PlatformEvent`]: the domain event envelope.
//! - [`EventLogger`]: background subscriber that records every event in the
//!   service log.

pub mod bus;
pub mod logger;

pub use bus::{EventBus, PlatformEvent};
pub use logger::EventLogger;
