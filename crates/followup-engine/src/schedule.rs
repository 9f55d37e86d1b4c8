//! Scheduler loop for `followup serve`.
//! Sleeps until the next cron fire and runs whatever is due: the sequence
//! stepper on `sequence_cron`, full cycles for `cycle_owners` on `cycle_cron`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use followup_core::config::SchedulerConfig;
use followup_core::error::{FollowUpError, Result};
use followup_core::types::OwnerId;

use crate::cron::CronSchedule;
use crate::engine::Engine;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    AdvanceSequences,
    Cycle(Vec<OwnerId>),
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    jobs: Vec<(CronSchedule, Job)>,
}

impl Scheduler {
    pub fn from_config(config: &SchedulerConfig) -> Result<Self> {
        let mut jobs = vec![(
            CronSchedule::parse(&config.sequence_cron)?,
            Job::AdvanceSequences,
        )];
        if let Some(expr) = &config.cycle_cron {
            if config.cycle_owners.is_empty() {
                return Err(FollowUpError::Config(
                    "scheduler.cycle_cron is set but scheduler.cycle_owners is empty".into(),
                ));
            }
            jobs.push((CronSchedule::parse(expr)?, Job::Cycle(config.cycle_owners.clone())));
        }
        Ok(Self { jobs })
    }

    /// Earliest fire time after `after` and every job due at that time.
    pub fn next_due(&self, after: DateTime<Utc>) -> Option<(DateTime<Utc>, Vec<Job>)> {
        let times: Vec<(DateTime<Utc>, &Job)> = self
            .jobs
            .iter()
            .filter_map(|(cron, job)| cron.next_after(after).map(|t| (t, job)))
            .collect();
        let earliest = times.iter().map(|(t, _)| *t).min()?;
        let due = times
            .into_iter()
            .filter(|(t, _)| *t == earliest)
            .map(|(_, job)| job.clone())
            .collect();
        Some((earliest, due))
    }
}

/// Run forever. Job failures are logged; the loop keeps going.
pub async fn run_scheduler(engine: Arc<Engine>, scheduler: Scheduler) -> Result<()> {
    tracing::info!(
        "⏰ Scheduler started ({})",
        scheduler
            .jobs
            .iter()
            .map(|(cron, job)| format!("{job:?} @ '{}'", cron.expression()))
            .collect::<Vec<_>>()
            .join(", ")
    );

    loop {
        let Some((at, jobs)) = scheduler.next_due(Utc::now()) else {
            return Err(FollowUpError::Config("cron schedule never fires".into()));
        };
        let wait = (at - Utc::now()).to_std().unwrap_or_default();
        tracing::debug!("Next run at {at} ({}s)", wait.as_secs());
        tokio::time::sleep(wait).await;

        for job in jobs {
            run_job(&engine, &job).await;
        }
    }
}

async fn run_job(engine: &Engine, job: &Job) {
    match job {
        Job::AdvanceSequences => match engine.advance_sequences().await {
            Ok(report) => tracing::info!(
                "🔔 Sequence run: {} advanced of {} evaluated",
                report.advanced,
                report.evaluated
            ),
            Err(e) => tracing::error!("❌ Sequence run failed: {e}"),
        },
        Job::Cycle(owners) => {
            for owner in owners {
                match engine.run_cycle(*owner).await {
                    Ok(report) => tracing::info!(
                        "🔔 Cycle for owner {owner}: {} actions",
                        report.actions_performed_count
                    ),
                    Err(e) => tracing::error!("❌ Cycle for owner {owner} failed: {e}"),
                }
            }
        }
    }
}
