//! Shared tracing setup for the uptime workspace binaries.

mod subscriber;

pub use subscriber::{init, init_with_level};
