/// Monitoring engine module - handles execution of monitoring checks
///
/// This module is responsible for:
/// - Validating stored check records
/// - Probing HTTP/HTTPS endpoints with a hard deadline
/// - Deciding the new up/down state and whether the owner must hear about it
/// - Scheduling a pass over every check on a fixed interval
pub mod checker;
pub mod evaluator;
pub mod executor;
pub mod scheduler;
pub mod types;
pub mod validation;

pub use checker::{Checker, HttpChecker, ProbeRequest};
pub use executor::ProbeExecutor;
pub use scheduler::{AlertDelivery, CheckReport, Cycle, MonitoringScheduler};
pub use types::{Check, CheckState, HttpMethod, Outcome, Protocol};
