use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::checker::{Checker, ProbeRequest};
use super::types::{Check, Outcome};

/// Single-assignment slot for a probe outcome.
///
/// The response, the transport error and the deadline all try to resolve the
/// same slot; only the first call wins and every later one is dropped.
pub struct OutcomeSlot {
    sender: Mutex<Option<oneshot::Sender<Outcome>>>,
}

impl OutcomeSlot {
    pub fn new() -> (Arc<Self>, oneshot::Receiver<Outcome>) {
        let (tx, rx) = oneshot::channel();
        (Arc::new(Self { sender: Mutex::new(Some(tx)) }), rx)
    }

    /// Returns `true` if this call produced the outcome.
    pub fn resolve(&self, outcome: Outcome) -> bool {
        let sender = match self.sender.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        match sender {
            Some(tx) => tx.send(outcome).is_ok(),
            None => {
                debug!(%outcome, "Outcome already sent, discarding");
                false
            }
        }
    }
}

/// Probe executor - runs exactly one request per check and settles on one outcome
pub struct ProbeExecutor {
    checker: Arc<dyn Checker>,
}

impl ProbeExecutor {
    pub fn new(checker: Arc<dyn Checker>) -> Self {
        Self { checker }
    }

    /// Probe `check` once. Never fails: errors are outcomes too.
    pub async fn execute(&self, check: &Check) -> Outcome {
        let request = match ProbeRequest::from_check(check) {
            Ok(request) => request,
            Err(e) => {
                warn!(check_id = %check.id, "Cannot build probe: {e}");
                return Outcome::TransportError;
            }
        };

        let (slot, outcome_rx) = OutcomeSlot::new();
        let deadline = request.timeout;

        let request_task = {
            let slot = slot.clone();
            let checker = self.checker.clone();
            let check_id = check.id.clone();
            tokio::spawn(async move {
                match checker.send(&request).await {
                    Ok(status) => slot.resolve(Outcome::Status(status)),
                    Err(e) => {
                        debug!(%check_id, "Probe failed: {e}");
                        slot.resolve(Outcome::TransportError)
                    }
                }
            })
        };

        let timeout_task = {
            let slot = slot.clone();
            tokio::spawn(async move {
                tokio::time::sleep(deadline).await;
                slot.resolve(Outcome::Timeout)
            })
        };

        // Both senders live inside the tasks; a closed channel means they died
        let outcome = outcome_rx.await.unwrap_or(Outcome::TransportError);

        request_task.abort();
        timeout_task.abort();

        outcome
    }
}
