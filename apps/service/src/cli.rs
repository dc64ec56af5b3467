use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use futures::future::join_all;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::alerts::{AlertDispatcher, LogNotifier, Notifier, TwilioNotifier};
use crate::config::Config;
use crate::monitoring::types::CHECK_ID_LEN;
use crate::monitoring::validation::validate_check;
use crate::monitoring::{CheckReport, HttpChecker, MonitoringScheduler, ProbeExecutor};
use crate::store::{CHECKS, FileStore, Store, random_id};

#[derive(Debug, Parser)]
#[command(name = "uptime-service", version, about = "Probe HTTP/HTTPS checks and alert owners on state changes")]
pub struct Cli {
    /// Config file (defaults to $XDG_CONFIG_HOME/uptime-monitor/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// More log output, repeat for more
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the scheduler until interrupted (default)
    Run,
    /// Run a single cycle, wait for every check and exit
    Once,
    /// Print every stored check with its last known state
    List,
    /// Register a new check
    Add(AddCheck),
    /// Delete a check by id
    Remove { id: String },
}

#[derive(Debug, Args)]
pub struct AddCheck {
    /// Owner phone number, 9 digits without country prefix
    #[arg(long)]
    pub phone: String,
    #[arg(long, value_parser = ["http", "https"], default_value = "https")]
    pub protocol: String,
    /// Host, path and query, without scheme
    #[arg(long)]
    pub url: String,
    #[arg(long, value_parser = ["get", "post", "put", "delete"], default_value = "get")]
    pub method: String,
    #[arg(long = "success-code", default_values_t = [200u16])]
    pub success_codes: Vec<u16>,
    #[arg(long, default_value_t = 3)]
    pub timeout: u8,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = Config::from_config(self.config.as_ref()).context("Failed to load config")?;
        let store: Arc<dyn Store> = Arc::new(FileStore::new(&config.storage.data_dir));

        match self.command.unwrap_or(Command::Run) {
            Command::Run => {
                info!("\n{config}");
                let scheduler = build_scheduler(&config, store)?;
                tokio::select! {
                    () = scheduler.run() => {}
                    signal = tokio::signal::ctrl_c() => {
                        signal.context("Failed to listen for shutdown signal")?;
                        info!("Shutting down");
                    }
                }
            }
            Command::Once => {
                let scheduler = build_scheduler(&config, store)?;
                let reports = scheduler.gather_all_checks().await.wait().await;
                let failed = reports.iter().filter(|r| !matches!(r, CheckReport::Evaluated { .. })).count();
                info!(checked = reports.len(), failed, "Cycle finished");
            }
            Command::List => list_checks(store.as_ref()).await?,
            Command::Add(add) => add_check(store.as_ref(), add).await?,
            Command::Remove { id } => {
                store.delete(CHECKS, &id).await.with_context(|| format!("Failed to remove check {id}"))?;
                println!("Removed check {id}");
            }
        }

        Ok(())
    }
}

fn build_scheduler(config: &Config, store: Arc<dyn Store>) -> Result<Arc<MonitoringScheduler>> {
    let notifier: Arc<dyn Notifier> = if config.twilio.is_configured() {
        Arc::new(TwilioNotifier::new(config.twilio.clone())?)
    } else {
        warn!("Twilio credentials are not configured, alerts will only be logged");
        Arc::new(LogNotifier)
    };

    let executor = Arc::new(ProbeExecutor::new(Arc::new(HttpChecker::new()?)));

    Ok(Arc::new(MonitoringScheduler::new(
        store,
        executor,
        AlertDispatcher::new(notifier),
        &config.workers,
    )))
}

async fn list_checks(store: &dyn Store) -> Result<()> {
    let ids = store.list(CHECKS).await.context("Failed to list checks")?;
    let records = join_all(ids.iter().map(|id| store.read(CHECKS, id))).await;

    for (id, record) in ids.iter().zip(records) {
        match record.map_err(anyhow::Error::from).and_then(|r| Ok(validate_check(&r)?)) {
            Ok(check) => {
                let last = check
                    .last_checked
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "never".to_string());
                println!(
                    "{id}  {:<5} {:<6} {}  (last checked: {last})",
                    check.state,
                    check.method.to_uppercase(),
                    check.target()
                );
            }
            Err(e) => println!("{id}  invalid: {e}"),
        }
    }

    Ok(())
}

fn new_check_record(id: &str, add: &AddCheck) -> Value {
    json!({
        "id": id,
        "userPhone": add.phone,
        "protocol": add.protocol,
        "url": add.url,
        "method": add.method,
        "successCodes": add.success_codes,
        "timeoutSeconds": add.timeout,
    })
}

async fn add_check(store: &dyn Store, add: AddCheck) -> Result<()> {
    let id = random_id(CHECK_ID_LEN);
    let check = validate_check(&new_check_record(&id, &add))?;

    // Store the normalised form, not what was typed
    let record = serde_json::to_value(&check)?;

    store.create(CHECKS, &check.id, &record).await.context("Failed to save check")?;
    println!("Created check {id} for {}", check.target());
    Ok(())
}
