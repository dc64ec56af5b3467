use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use super::evaluator::evaluate;
use super::executor::ProbeExecutor;
use super::types::{CheckState, Outcome};
use super::validation::{ValidationError, validate_check};
use crate::alerts::AlertDispatcher;
use crate::config::Workers;
use crate::store::{CHECKS, Store};

/// What happened to one check during a cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckReport {
    /// The record could not be read
    ReadFailed,
    /// The record is malformed and was not probed
    Rejected(ValidationError),
    /// The probe ran but the new state could not be saved, so nobody was alerted
    PersistFailed,
    /// The probe ran and the new state was saved
    Evaluated { outcome: Outcome, state: CheckState, alert: AlertDelivery },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertDelivery {
    NotWarranted,
    Sent,
    Failed,
}

/// Pipelines started by one cycle
pub struct Cycle {
    pub id: Uuid,
    /// Checks left alone because their previous pipeline is still running
    pub skipped: Vec<String>,
    pipelines: Vec<JoinHandle<CheckReport>>,
}

impl Cycle {
    fn empty(id: Uuid) -> Self {
        Self { id, skipped: Vec::new(), pipelines: Vec::new() }
    }

    /// Number of pipelines started
    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    /// Wait for every pipeline of this cycle to finish
    pub async fn wait(self) -> Vec<CheckReport> {
        join_all(self.pipelines)
            .await
            .into_iter()
            .filter_map(|joined| match joined {
                Ok(report) => Some(report),
                Err(e) => {
                    error!("Check pipeline task failed: {e}");
                    None
                }
            })
            .collect()
    }
}

/// Releases a check id from the in-flight set when its pipeline ends
struct InFlightGuard {
    in_flight: Arc<Mutex<HashSet<String>>>,
    check_id: String,
}

impl InFlightGuard {
    /// `None` if the check is already being processed
    fn claim(in_flight: &Arc<Mutex<HashSet<String>>>, check_id: &str) -> Option<Self> {
        let mut set = in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        set.insert(check_id.to_string()).then(|| Self {
            in_flight: in_flight.clone(),
            check_id: check_id.to_string(),
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut set = self.in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        set.remove(&self.check_id);
    }
}

/// Monitoring scheduler - gathers every stored check on a fixed interval and
/// runs validate, probe, evaluate, persist and alert for each of them
pub struct MonitoringScheduler {
    store: Arc<dyn Store>,
    executor: Arc<ProbeExecutor>,
    dispatcher: AlertDispatcher,
    permits: Arc<Semaphore>,
    in_flight: Arc<Mutex<HashSet<String>>>,
    interval: Duration,
}

impl MonitoringScheduler {
    /// Create a new monitoring scheduler
    pub fn new(
        store: Arc<dyn Store>,
        executor: Arc<ProbeExecutor>,
        dispatcher: AlertDispatcher,
        workers: &Workers,
    ) -> Self {
        Self {
            store,
            executor,
            dispatcher,
            permits: Arc::new(Semaphore::new(workers.max_concurrent_probes.max(1))),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            interval: workers.interval(),
        }
    }

    /// Run a cycle now and then once per interval, forever.
    ///
    /// Cycles never wait for the previous one's pipelines.
    pub async fn run(self: Arc<Self>) {
        let mut timer = interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_seconds = self.interval.as_secs(), "Starting check scheduler");

        loop {
            timer.tick().await;
            let cycle = self.gather_all_checks().await;
            debug!(cycle = %cycle.id, started = cycle.len(), "Cycle dispatched");
        }
    }

    /// List every stored check and start one pipeline per id.
    pub async fn gather_all_checks(self: &Arc<Self>) -> Cycle {
        let cycle_id = Uuid::new_v4();
        let span = info_span!("cycle", cycle = %cycle_id);
        let mut cycle = Cycle::empty(cycle_id);

        let ids = match self.store.list(CHECKS).instrument(span.clone()).await {
            Ok(ids) if !ids.is_empty() => ids,
            Ok(_) => {
                span.in_scope(|| info!("Could not find any checks to process"));
                return cycle;
            }
            Err(e) => {
                span.in_scope(|| error!("Could not list checks: {e}"));
                return cycle;
            }
        };

        for check_id in ids {
            let Some(guard) = InFlightGuard::claim(&self.in_flight, &check_id) else {
                span.in_scope(|| warn!(%check_id, "Previous probe still in flight, skipping"));
                cycle.skipped.push(check_id);
                continue;
            };

            let scheduler = self.clone();
            let pipeline = async move {
                let _guard = guard;
                scheduler.process_check(&check_id).await
            };
            cycle.pipelines.push(tokio::spawn(pipeline.instrument(span.clone())));
        }

        cycle
    }

    /// Take one check through the whole pipeline.
    ///
    /// Every failure is logged here and ends the pipeline early.
    pub async fn process_check(&self, check_id: &str) -> CheckReport {
        // The semaphore is never closed
        let _permit = self.permits.acquire().await.ok();

        let record = match self.store.read(CHECKS, check_id).await {
            Ok(record) => record,
            Err(e) => {
                error!(%check_id, "Error reading check data: {e}");
                return CheckReport::ReadFailed;
            }
        };

        let check = match validate_check(&record) {
            Ok(check) => check,
            Err(e) => {
                warn!(%check_id, "Skipping check: {e}");
                return CheckReport::Rejected(e);
            }
        };

        let outcome = self.executor.execute(&check).await;
        let evaluation = evaluate(&check, outcome, Utc::now());
        let updated = evaluation.updated;

        let saved = match serde_json::to_value(&updated) {
            Ok(value) => self.store.update(CHECKS, &updated.id, &value).await.map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        if let Err(e) = saved {
            error!(%check_id, %outcome, "Error saving updates to check: {e}");
            return CheckReport::PersistFailed;
        }

        debug!(%check_id, %outcome, state = %updated.state, "Check evaluated");

        let alert = if !evaluation.alert_warranted {
            debug!(%check_id, "Check outcome has not changed, no alert needed");
            AlertDelivery::NotWarranted
        } else if self.dispatcher.dispatch(&updated).await.is_ok() {
            AlertDelivery::Sent
        } else {
            AlertDelivery::Failed
        };

        CheckReport::Evaluated { outcome, state: updated.state, alert }
    }
}
