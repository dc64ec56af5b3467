//! Owner notifications for check state transitions.

mod twilio;

pub use twilio::TwilioNotifier;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, info};

use crate::monitoring::types::Check;

/// Longest message the gateway accepts
pub const MAX_MESSAGE_LEN: usize = 1600;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Given parameters were missing or invalid: {0}")]
    InvalidParameters(&'static str),

    #[error("Messaging gateway unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Messaging gateway answered with status code {0}")]
    UnexpectedStatus(u16),
}

/// Messaging gateway used to reach a check owner
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, contact: &str, message: &str) -> Result<(), NotifyError>;
}

/// Writes alerts to the log instead of delivering them.
///
/// Used when no gateway credentials are configured.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, contact: &str, message: &str) -> Result<(), NotifyError> {
        info!(%contact, "{message}");
        Ok(())
    }
}

/// One-line alert for a check that just changed state
pub fn alert_message(check: &Check) -> String {
    format!(
        "Alert: Your check for {} {} is currently {}",
        check.method.to_uppercase(),
        check.target(),
        check.state
    )
}

/// Hands state transitions to a [`Notifier`]
#[derive(Clone)]
pub struct AlertDispatcher {
    notifier: Arc<dyn Notifier>,
}

impl AlertDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// Send the alert for `check`, which must already hold its new state.
    ///
    /// Failures are logged and returned, never retried.
    pub async fn dispatch(&self, check: &Check) -> Result<(), NotifyError> {
        let message = alert_message(check);

        match self.notifier.send(&check.owner_contact, &message).await {
            Ok(()) => {
                info!(check_id = %check.id, state = %check.state, "User was alerted to a status change: {message}");
                Ok(())
            }
            Err(e) => {
                error!(check_id = %check.id, "Could not alert user to a status change: {e}");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::types::{CheckState, HttpMethod, Protocol};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Notifier for Recording {
        async fn send(&self, contact: &str, message: &str) -> Result<(), NotifyError> {
            self.sent.lock().unwrap().push((contact.to_string(), message.to_string()));
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl Notifier for Failing {
        async fn send(&self, _contact: &str, _message: &str) -> Result<(), NotifyError> {
            Err(NotifyError::UnexpectedStatus(500))
        }
    }

    fn check() -> Check {
        Check {
            id: "abcdefghij0123456789".to_string(),
            owner_contact: "123456789".to_string(),
            protocol: Protocol::Http,
            url: "example.com/ping".to_string(),
            method: HttpMethod::Post,
            success_codes: vec![200],
            timeout_seconds: 1,
            state: CheckState::Up,
            last_checked: None,
        }
    }

    #[test]
    fn test_message_format() {
        assert_eq!(
            alert_message(&check()),
            "Alert: Your check for POST http://example.com/ping is currently up"
        );
    }

    #[tokio::test]
    async fn test_dispatch_goes_to_owner() {
        let recording = Arc::new(Recording::default());
        AlertDispatcher::new(recording.clone()).dispatch(&check()).await.unwrap();

        let sent = recording.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "123456789");
        assert!(sent[0].1.ends_with("is currently up"));
    }

    #[tokio::test]
    async fn test_dispatch_failure_is_reported() {
        let result = AlertDispatcher::new(Arc::new(Failing)).dispatch(&check()).await;
        assert!(matches!(result, Err(NotifyError::UnexpectedStatus(500))));
    }
}
