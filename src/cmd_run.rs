//! `run` subcommand: host the scheduler until Ctrl-C.

use std::sync::Arc;

use tracing::{info, warn};

use cadence_config::{Config, ConfigValidator};
use cadence_scheduler::{Scheduler, StoreBackend, backend_from_config};

use crate::register::builtin_registry;

/// Run the scheduler in foreground.
pub(crate) async fn run_scheduler(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let validation = ConfigValidator::validate(&config)?;
    for warning in &validation.warnings {
        warn!("Config warning at {}: {}", warning.path, warning.message);
    }
    if !validation.is_valid() {
        for error in &validation.errors {
            tracing::error!("Config error at {}: {}", error.path, error.message);
        }
        return Err(format!(
            "Configuration has {} error(s)",
            validation.errors.len()
        )
        .into());
    }

    let registry = Arc::new(builtin_registry()?);
    let backend = backend_from_config(&config.store).await?;
    info!(
        "Using {:?} job store (durable: {})",
        config.store.backend,
        backend.is_durable()
    );

    let scheduler = Scheduler::builder(config.scheduler.clone(), registry)
        .backend(backend)
        .build()
        .await?;
    scheduler.seed_jobs(&config.jobs).await?;
    scheduler.start().await?;

    for job in scheduler.list_jobs_with_trigger_info().await {
        info!(
            "Job {}.{} next fires at {:?}",
            job.group, job.job_key, job.next_fire_time
        );
    }

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl-C, shutting down");

    scheduler.shutdown_with_config().await?;

    let metrics = scheduler.metrics();
    info!(
        "Scheduler stopped: fired={} succeeded={} failed={} misfired={} abandoned={}",
        metrics.fired, metrics.succeeded, metrics.failed, metrics.misfired, metrics.abandoned
    );
    Ok(())
}
