//! Activity recorder: collects one prospect's pending writes.
//!
//! Nothing here touches the store. The engine commits [`ActivityRecorder::finish`]
//! as a unit, or drops it and commits [`failure_commit`] instead.

use chrono::{DateTime, Utc};
use followup_core::error::FollowUpError;
use followup_core::types::{
    ActivityKind, ActivityRecord, Delivery, LeadStatus, Modality, OwnerId, ProspectCommit,
    ProspectId,
};
use serde_json::json;

use crate::workflow::WorkflowState;

pub struct ActivityRecorder {
    owner: OwnerId,
    commit: ProspectCommit,
}

impl ActivityRecorder {
    pub fn new(owner: OwnerId, prospect: ProspectId) -> Self {
        Self {
            owner,
            commit: ProspectCommit::new(prospect),
        }
    }

    fn push(&mut self, kind: ActivityKind, details: serde_json::Value) {
        self.commit.records.push(ActivityRecord::new(
            self.owner,
            Some(self.commit.prospect_id),
            kind,
            details,
        ));
    }

    pub fn status_changed(&mut self, from: LeadStatus, to: LeadStatus, days_since_contact: i64) {
        self.commit.update.status = Some(to);
        self.push(
            ActivityKind::Classified,
            json!({
                "from": from.as_str(),
                "to": to.as_str(),
                "days_since_contact": days_since_contact,
            }),
        );
    }

    pub fn dispatched(
        &mut self,
        at: DateTime<Utc>,
        modality: Modality,
        delivery: &Delivery,
        state: &WorkflowState,
    ) {
        self.commit.update.last_contacted_at = Some(at);
        self.push(
            ActivityKind::Dispatched,
            json!({
                "channel": modality.channel_name(),
                "provider": delivery.provider,
                "provider_id": delivery.provider_id,
                "action": state.action,
                "subject": state.subject,
                "fallback": state.fallback_used,
            }),
        );
    }

    pub fn dispatch_failed(&mut self, modality: Modality, action: &str, error: &FollowUpError) {
        self.push(
            ActivityKind::Error,
            json!({
                "stage": "dispatch",
                "channel": modality.channel_name(),
                "action": action,
                "error": error.to_string(),
            }),
        );
    }

    pub fn finish(self) -> ProspectCommit {
        self.commit
    }
}

/// Error-only write set replacing a discarded one.
pub fn failure_commit(
    owner: OwnerId,
    prospect: ProspectId,
    stage: &str,
    error: &FollowUpError,
) -> ProspectCommit {
    let mut commit = ProspectCommit::new(prospect);
    commit.records.push(ActivityRecord::new(
        owner,
        Some(prospect),
        ActivityKind::Error,
        json!({ "stage": stage, "error": error.to_string() }),
    ));
    commit
}
