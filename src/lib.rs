//! Megaplan webhook service that exports product development tasks to an xlsx report.

use std::sync::Arc;

use anyhow::Context;
use log::info;
use megaplan_api::MegaplanClient;

pub mod aggregator;
pub mod error;
pub mod hierarchy;
pub mod jobs;
pub mod report;
pub mod server;
pub mod settings;
pub mod text;

#[cfg(test)]
mod test_support;

use jobs::{JobQueue, JobRegistry, ReportRunner};
use server::AppState;
use settings::Settings;

/// Reads settings, starts the worker pool and serves the webhook until Ctrl+C.
pub async fn run() -> anyhow::Result<()> {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();

    info!("Starting KUBIT report service");

    let settings = Settings::from_env().context("Invalid configuration")?;
    let client = MegaplanClient::new(settings.megaplan_config()).context("Failed to build Megaplan client")?;
    let runner = ReportRunner::new(client, settings.hierarchy_rules(), JobRegistry::default());
    let queue = JobQueue::start(Arc::new(runner), settings.workers, settings.queue_capacity);
    info!(
        "Started {} report workers (queue capacity {})",
        settings.workers, settings.queue_capacity
    );

    server::serve(Arc::new(AppState { queue }), settings.bind_addr).await
}
