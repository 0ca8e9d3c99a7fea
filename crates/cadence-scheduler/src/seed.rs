//! Jobs declared in the `[[jobs]]` section of the configuration.

use std::time::Duration;

use cadence_config::JobSeedConfig;
use cadence_protocols::{DEFAULT_GROUP, JobKey, SchedulerError, SchedulerResult, TriggerKey};
use tracing::{debug, info};

use crate::control::{JobSpec, TriggerSpec, default_trigger_name, first_interval_fire};
use crate::scheduler::Scheduler;
use crate::trigger::ScheduleVariant;

impl Scheduler {
    /// Schedule configured jobs, skipping any that already exist.
    ///
    /// With a durable store the seeds are usually present from an earlier
    /// run; those keep their persisted trigger state. Returns the number of
    /// jobs created.
    pub async fn seed_jobs(&self, seeds: &[JobSeedConfig]) -> SchedulerResult<usize> {
        let mut created = 0;
        for seed in seeds {
            let (job, trigger) = self.seed_specs(seed)?;
            let key = job.key.clone();
            match self.schedule_job(job, trigger).await {
                Ok(_) => created += 1,
                Err(SchedulerError::Conflict(_)) => {
                    debug!("Seed job {} already exists, keeping stored state", key);
                }
                Err(e) => return Err(e),
            }
        }
        if created > 0 {
            info!("Seeded {} job(s) from configuration", created);
        }
        Ok(created)
    }

    fn seed_specs(&self, seed: &JobSeedConfig) -> SchedulerResult<(JobSpec, TriggerSpec)> {
        let group = seed.group.as_deref().unwrap_or(DEFAULT_GROUP);
        let mut job = JobSpec::new(JobKey::new(&seed.name, group), &seed.job_class);
        if let Some(description) = &seed.description {
            job = job.with_description(description);
        }
        let trigger_key = TriggerKey::new(default_trigger_name(&seed.name), group);

        let trigger = match (seed.interval_seconds, &seed.cron) {
            (Some(secs), None) => {
                let start_at = first_interval_fire(self.clock.now(), secs)?;
                TriggerSpec::new(
                    trigger_key,
                    ScheduleVariant::every(Duration::from_secs(secs.unsigned_abs())),
                )
                .starting_at(start_at)
            }
            (None, Some(expression)) => {
                TriggerSpec::new(trigger_key, ScheduleVariant::cron(expression))
            }
            _ => {
                return Err(SchedulerError::Validation(format!(
                    "Seed job {} needs either a positive interval_seconds or a cron expression",
                    seed.name
                )));
            }
        };
        Ok((job, trigger))
    }
}

#[cfg(test)]
#[path = "seed_tests.rs"]
mod tests;
