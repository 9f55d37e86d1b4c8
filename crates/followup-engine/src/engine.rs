//! The orchestration engine: cycle runner, single-prospect runs and channel
//! actions.
//!
//! Every prospect is processed inside its own failure boundary. Its writes are
//! gathered by an [`ActivityRecorder`] and committed as one unit; if anything
//! fails they are dropped and an error record is committed in their place.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use followup_core::FollowUpConfig;
use followup_core::error::{FollowUpError, Result};
use followup_core::traits::{MessageComposer, ProspectStore, Transport};
use followup_core::types::{
    ActivityRecord, ContextTag, LeadStatus, Modality, OutboundMessage, OwnerId, Prospect,
    ProspectCommit, ProspectId,
};
use serde::Serialize;

use crate::classifier::ClassifierThresholds;
use crate::dispatch::DispatchRouter;
use crate::recorder::{ActivityRecorder, failure_commit};
use crate::workflow::{Workflow, WorkflowState};

/// Tunables the engine needs from configuration.
#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    pub thresholds: ClassifierThresholds,
    /// 0 disables leasing.
    pub lease_secs: u64,
    pub fire_uncontacted: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::from(&FollowUpConfig::default())
    }
}

impl From<&FollowUpConfig> for EngineOptions {
    fn from(config: &FollowUpConfig) -> Self {
        Self {
            thresholds: ClassifierThresholds::from(&config.classifier),
            lease_secs: config.scheduler.lease_secs,
            fire_uncontacted: config.sequence.fire_uncontacted,
        }
    }
}

/// Outcome of one prospect's processing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProspectRun {
    pub prospect_id: ProspectId,
    pub status: LeadStatus,
    pub action: String,
    pub action_performed: bool,
    /// Another run holds the prospect's lease.
    pub skipped: bool,
}

impl ProspectRun {
    fn skipped(prospect_id: ProspectId) -> Self {
        Self {
            prospect_id,
            skipped: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleReport {
    pub processed_count: usize,
    pub actions_performed_count: usize,
    pub activity_records: Vec<ActivityRecord>,
}

/// What to do with a loaded prospect.
#[derive(Debug, Clone)]
pub(crate) enum Action {
    /// Classified workflow, or forced composition under a tag.
    Workflow(Option<ContextTag>),
    /// Chat message to the prospect's phone.
    Channel(ContextTag),
}

/// A processed prospect whose writes are not yet committed.
pub(crate) struct Outcome {
    pub run: ProspectRun,
    pub commit: ProspectCommit,
    /// Transport error for channel actions, surfaced after committing.
    pub failure: Option<FollowUpError>,
}

pub struct Engine {
    pub(crate) store: Arc<dyn ProspectStore>,
    composer: Arc<dyn MessageComposer>,
    router: DispatchRouter,
    pub(crate) options: EngineOptions,
    holder: String,
}

impl Engine {
    pub fn new(
        store: Arc<dyn ProspectStore>,
        composer: Arc<dyn MessageComposer>,
        transports: Vec<Arc<dyn Transport>>,
        options: EngineOptions,
    ) -> Self {
        Self {
            store,
            composer,
            router: DispatchRouter::new(transports),
            options,
            holder: format!("{}-{}", std::process::id(), uuid::Uuid::new_v4()),
        }
    }

    /// Process every prospect an owner has. Individual failures are recorded
    /// and never abort the cycle.
    pub async fn run_cycle(&self, owner: OwnerId) -> Result<CycleReport> {
        let prospects = self.store.prospects_for_owner(owner).await?;
        tracing::info!("🔄 Cycle started for owner {owner}: {} prospects", prospects.len());

        let mut report = CycleReport::default();
        for prospect in &prospects {
            report.processed_count += 1;

            if !self.acquire(prospect.id).await {
                tracing::debug!("Prospect {} leased elsewhere, skipping", prospect.id);
                continue;
            }

            let commit = match self.evaluate(owner, prospect.id, Action::Workflow(None)).await {
                Ok(outcome) => {
                    if outcome.run.action_performed {
                        report.actions_performed_count += 1;
                    }
                    outcome.commit
                }
                Err(e) => {
                    tracing::error!("❌ Prospect {} failed: {e}", prospect.id);
                    failure_commit(owner, prospect.id, "processing", &e)
                }
            };
            let (_, records) = self.commit_isolated(owner, commit).await;
            report.activity_records.extend(records);

            self.release(prospect.id).await;
        }

        tracing::info!(
            "✅ Cycle done for owner {owner}: {} processed, {} actions",
            report.processed_count,
            report.actions_performed_count
        );
        Ok(report)
    }

    /// Run the workflow for one prospect. With `forced_context`, classification
    /// is skipped and the message is composed under that tag.
    pub async fn run_for_prospect(
        &self,
        owner: OwnerId,
        prospect_id: ProspectId,
        forced_context: Option<ContextTag>,
    ) -> Result<ProspectRun> {
        self.run_committed(owner, prospect_id, Action::Workflow(forced_context))
            .await
    }

    /// Send a chat message composed under `template`. A transport failure is
    /// recorded and then returned as an error.
    pub async fn run_channel_action(
        &self,
        owner: OwnerId,
        prospect_id: ProspectId,
        template: &str,
    ) -> Result<ProspectRun> {
        self.run_committed(owner, prospect_id, Action::Channel(ContextTag::from(template)))
            .await
    }

    async fn run_committed(
        &self,
        owner: OwnerId,
        prospect_id: ProspectId,
        action: Action,
    ) -> Result<ProspectRun> {
        if !self.acquire(prospect_id).await {
            tracing::info!("⏭️ Prospect {prospect_id} is leased by another run");
            return Ok(ProspectRun::skipped(prospect_id));
        }

        let result = match self.evaluate(owner, prospect_id, action).await {
            Ok(outcome) => match self.store.commit(&[outcome.commit]).await {
                Ok(()) => match outcome.failure {
                    Some(e) => Err(e),
                    None => Ok(outcome.run),
                },
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };

        self.release(prospect_id).await;
        result
    }

    /// Load, decide, dispatch. Nothing is persisted here.
    pub(crate) async fn evaluate(
        &self,
        owner: OwnerId,
        prospect_id: ProspectId,
        action: Action,
    ) -> Result<Outcome> {
        let prospect = self
            .store
            .prospect(owner, prospect_id)
            .await?
            .ok_or_else(|| FollowUpError::NotFound(format!("prospect {prospect_id}")))?;
        let now = Utc::now();
        let workflow = Workflow::new(self.composer.as_ref(), self.options.thresholds);
        let mut recorder = ActivityRecorder::new(owner, prospect_id);

        match action {
            Action::Workflow(None) => {
                let state = workflow.run(&prospect, now).await;
                if state.status != prospect.status {
                    recorder.status_changed(prospect.status, state.status, state.days_since_contact);
                }
                let performed = if state.has_message() {
                    self.deliver(&mut recorder, &prospect, Modality::DirectMessage, &state, now)
                        .await
                        .is_ok()
                } else {
                    false
                };
                Ok(self.outcome(recorder, &state, performed, None))
            }
            Action::Workflow(Some(tag)) => {
                let state = workflow.run_forced(&prospect, tag, now).await;
                let performed = self
                    .deliver(&mut recorder, &prospect, Modality::DirectMessage, &state, now)
                    .await
                    .is_ok();
                Ok(self.outcome(recorder, &state, performed, None))
            }
            Action::Channel(tag) => {
                if prospect.phone.as_deref().is_none_or(|p| p.trim().is_empty()) {
                    return Err(FollowUpError::NotFound(format!(
                        "contact info missing: no phone for prospect {prospect_id}"
                    )));
                }
                let state = workflow.run_forced(&prospect, tag, now).await;
                let result = self
                    .deliver(&mut recorder, &prospect, Modality::ChatMessage, &state, now)
                    .await;
                let performed = result.is_ok();
                Ok(self.outcome(recorder, &state, performed, result.err()))
            }
        }
    }

    async fn deliver(
        &self,
        recorder: &mut ActivityRecorder,
        prospect: &Prospect,
        modality: Modality,
        state: &WorkflowState,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let destination = match modality {
            Modality::DirectMessage => prospect.email.clone(),
            Modality::ChatMessage => prospect.phone.clone().unwrap_or_default(),
        };
        let message = OutboundMessage {
            destination,
            subject: match modality {
                Modality::DirectMessage => state.subject.clone(),
                Modality::ChatMessage => None,
            },
            body: state.body.clone(),
        };

        match self.router.dispatch(modality, &message).await {
            Ok(delivery) => {
                tracing::info!(
                    "✉️ {} → prospect {} via {} ({})",
                    state.action,
                    prospect.id,
                    delivery.provider,
                    modality.channel_name()
                );
                recorder.dispatched(now, modality, &delivery, state);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("⚠️ Dispatch failed for prospect {}: {e}", prospect.id);
                recorder.dispatch_failed(modality, &state.action, &e);
                Err(e)
            }
        }
    }

    fn outcome(
        &self,
        recorder: ActivityRecorder,
        state: &WorkflowState,
        performed: bool,
        failure: Option<FollowUpError>,
    ) -> Outcome {
        Outcome {
            run: ProspectRun {
                prospect_id: state.prospect_id,
                status: state.status,
                action: state.action.clone(),
                action_performed: performed,
                skipped: false,
            },
            commit: recorder.finish(),
            failure,
        }
    }

    /// Commit one prospect's writes; on failure, fall back to an error record.
    /// Returns whether the writes landed, and the records that were persisted.
    pub(crate) async fn commit_isolated(
        &self,
        owner: OwnerId,
        commit: ProspectCommit,
    ) -> (bool, Vec<ActivityRecord>) {
        let prospect_id = commit.prospect_id;
        match self.store.commit(std::slice::from_ref(&commit)).await {
            Ok(()) => (true, commit.records),
            Err(e) => {
                tracing::error!("❌ Commit failed for prospect {prospect_id}: {e}");
                let fallback = failure_commit(owner, prospect_id, "commit", &e);
                match self.store.commit(std::slice::from_ref(&fallback)).await {
                    Ok(()) => (false, fallback.records),
                    Err(e) => {
                        tracing::error!("❌ Could not record failure for prospect {prospect_id}: {e}");
                        (false, Vec::new())
                    }
                }
            }
        }
    }

    /// Take the prospect's lease. Store errors count as "not acquired".
    pub(crate) async fn acquire(&self, prospect_id: ProspectId) -> bool {
        if self.options.lease_secs == 0 {
            return true;
        }
        match self
            .store
            .try_lease(prospect_id, &self.holder, self.options.lease_secs)
            .await
        {
            Ok(acquired) => acquired,
            Err(e) => {
                tracing::warn!("⚠️ Lease for prospect {prospect_id} failed: {e}");
                false
            }
        }
    }

    pub(crate) async fn release(&self, prospect_id: ProspectId) {
        if self.options.lease_secs == 0 {
            return;
        }
        if let Err(e) = self.store.release_lease(prospect_id, &self.holder).await {
            tracing::warn!("⚠️ Releasing lease for prospect {prospect_id} failed: {e}");
        }
    }
}
