use chrono::{DateTime, Utc};

use super::types::{Check, CheckState, Outcome};

/// What the evaluator decided for one probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// The check with `state` and `lastChecked` brought up to date, ready to persist
    pub updated: Check,
    /// Whether the owner should hear about this
    pub alert_warranted: bool,
}

/// State implied by an outcome: up only for a listed status code.
pub fn state_for(check: &Check, outcome: Outcome) -> CheckState {
    match outcome {
        Outcome::Status(code) if check.success_codes.contains(&code) => CheckState::Up,
        _ => CheckState::Down,
    }
}

/// Fold an outcome into a check.
///
/// A check that has never been probed has nothing to transition from, so it
/// never alerts whatever the outcome.
pub fn evaluate(check: &Check, outcome: Outcome, now: DateTime<Utc>) -> Evaluation {
    let state = state_for(check, outcome);
    let alert_warranted = check.has_been_checked() && check.state != state;

    let mut updated = check.clone();
    updated.state = state;
    updated.last_checked = Some(now);

    Evaluation { updated, alert_warranted }
}
