//! Sequence stepper: moves prospects through their outreach sequence.
//!
//! For each sequenced prospect the next step (`current + 1`) is looked up and
//! fired once its wait has elapsed. The step index moves only when that
//! step's dispatch succeeded. Writes for all prospects are committed together
//! at the end of the pass; if that batch is rejected, each prospect's writes
//! are committed on their own so one bad write set cannot drop the others.

use chrono::{DateTime, TimeDelta, Utc};
use followup_core::error::Result;
use followup_core::types::{
    ActivityRecord, ContextTag, OwnerId, Prospect, ProspectId, SequenceStep, StepAction,
};
use serde::Serialize;

use crate::engine::{Action, Engine};
use crate::recorder::failure_commit;

#[derive(Debug, Clone, Default, Serialize)]
pub struct SequenceReport {
    /// Prospects attached to a sequence.
    pub evaluated: usize,
    /// Steps whose wait had elapsed and were attempted.
    pub attempted: usize,
    /// Steps dispatched successfully; each advanced its prospect.
    pub advanced: usize,
    pub activity_records: Vec<ActivityRecord>,
}

/// Whether `step` may fire for `prospect` at `now`.
pub fn step_due(
    prospect: &Prospect,
    step: &SequenceStep,
    now: DateTime<Utc>,
    fire_uncontacted: bool,
) -> bool {
    match prospect.last_contacted_at {
        Some(at) => now >= at + TimeDelta::days(i64::from(step.wait_days)),
        None => fire_uncontacted || step.wait_days == 0,
    }
}

impl Engine {
    /// One pass over every sequenced prospect.
    pub async fn advance_sequences(&self) -> Result<SequenceReport> {
        let prospects = self.store.sequenced_prospects().await?;
        let now = Utc::now();
        let mut report = SequenceReport::default();
        let mut batch = Vec::new();
        let mut leased = Vec::new();

        for prospect in &prospects {
            let Some(sequence_id) = prospect.sequence_id else {
                continue;
            };
            report.evaluated += 1;

            let next = prospect.current_step_number + 1;
            let step = match self.store.sequence_step(sequence_id, next).await {
                Ok(Some(step)) => step,
                Ok(None) => {
                    tracing::debug!("Prospect {} has no step {next}, sequence finished", prospect.id);
                    continue;
                }
                Err(e) => {
                    tracing::error!("❌ Step lookup failed for prospect {}: {e}", prospect.id);
                    batch.push(failure_commit(prospect.owner_id, prospect.id, "sequence", &e));
                    continue;
                }
            };

            if !step_due(prospect, &step, now, self.options.fire_uncontacted) {
                continue;
            }

            let action = match &step.action {
                StepAction::Email => Action::Workflow(step.template.as_deref().map(ContextTag::from)),
                StepAction::WhatsApp => Action::Channel(
                    step.template
                        .as_deref()
                        .map(ContextTag::from)
                        .unwrap_or(ContextTag::Followup),
                ),
                StepAction::Other(kind) => {
                    tracing::warn!(
                        "⚠️ Step {} of sequence {sequence_id} has unsupported action '{kind}', skipping",
                        step.step_number
                    );
                    continue;
                }
            };

            if !self.acquire(prospect.id).await {
                tracing::debug!("Prospect {} leased elsewhere, skipping", prospect.id);
                continue;
            }
            leased.push(prospect.id);

            // The listing may predate another run's commit; decide on the current row.
            match self.store.prospect(prospect.owner_id, prospect.id).await {
                Ok(Some(current))
                    if current.sequence_id == prospect.sequence_id
                        && current.current_step_number == prospect.current_step_number
                        && step_due(&current, &step, now, self.options.fire_uncontacted) => {}
                Ok(_) => {
                    tracing::debug!(
                        "Prospect {} changed since listing, skipping step {}",
                        prospect.id,
                        step.step_number
                    );
                    continue;
                }
                Err(e) => {
                    tracing::error!("❌ Reload failed for prospect {}: {e}", prospect.id);
                    batch.push(failure_commit(prospect.owner_id, prospect.id, "sequence", &e));
                    continue;
                }
            }
            report.attempted += 1;

            match self.evaluate(prospect.owner_id, prospect.id, action).await {
                Ok(mut outcome) => {
                    if outcome.run.action_performed {
                        outcome.commit.update.step_number = Some(step.step_number);
                        report.advanced += 1;
                        tracing::info!(
                            "➡️ Prospect {} advanced to step {}",
                            prospect.id,
                            step.step_number
                        );
                    }
                    batch.push(outcome.commit);
                }
                Err(e) => {
                    tracing::error!("❌ Sequence step failed for prospect {}: {e}", prospect.id);
                    batch.push(failure_commit(prospect.owner_id, prospect.id, "sequence", &e));
                }
            }
        }

        match self.store.commit(&batch).await {
            Ok(()) => {
                report.activity_records = batch.into_iter().flat_map(|c| c.records).collect();
            }
            Err(e) => {
                tracing::error!("❌ Sequence batch commit failed, committing per prospect: {e}");
                for commit in batch {
                    let owner = owner_of(&prospects, commit.prospect_id);
                    let advancing = commit.update.step_number.is_some();
                    let (landed, records) = self.commit_isolated(owner, commit).await;
                    if advancing && !landed {
                        report.advanced -= 1;
                    }
                    report.activity_records.extend(records);
                }
            }
        }
        for id in leased {
            self.release(id).await;
        }

        tracing::info!(
            "📈 Sequences: {} evaluated, {} attempted, {} advanced",
            report.evaluated,
            report.attempted,
            report.advanced
        );
        Ok(report)
    }
}

fn owner_of(prospects: &[Prospect], id: ProspectId) -> OwnerId {
    prospects
        .iter()
        .find(|p| p.id == id)
        .map(|p| p.owner_id)
        .unwrap_or_default()
}
