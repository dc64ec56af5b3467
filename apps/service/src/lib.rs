//! Uptime monitoring service: periodically probes user-registered HTTP/HTTPS
//! checks and texts the owner when a check goes up or down.

pub mod alerts;
pub mod cli;
pub mod config;
pub mod monitoring;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;
