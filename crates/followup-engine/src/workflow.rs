//! Per-prospect workflow state machine.
//!
//! ```text
//! Classify ─┬─ Active ───┐
//!           ├─ Followup ─┼─→ Format ─→ Done
//!           └─ Breakup ──┘
//! Forced(tag) ───────────────────────→ Done
//! ```
//!
//! Classification routes by status. The follow-up and breakup branches ask
//! the composer for a body; if it fails or returns nothing, the deterministic
//! fallback template is used instead. `Forced` skips classification and
//! routing entirely and composes under the caller's tag.

use chrono::{DateTime, Utc};
use followup_core::traits::MessageComposer;
use followup_core::types::{ContextTag, LeadStatus, Prospect, ProspectId};
use followup_providers::templates::fallback_message;

use crate::classifier::{ClassifierThresholds, classify, days_since_contact};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Classify,
    Active,
    Followup,
    Breakup,
    Forced(ContextTag),
    Format,
    Done,
}

impl Stage {
    fn route(status: LeadStatus) -> Self {
        match status {
            LeadStatus::Active => Self::Active,
            LeadStatus::NeedsFollowup => Self::Followup,
            LeadStatus::Stalled => Self::Breakup,
        }
    }
}

/// The stage that follows `stage`, given the classified status.
pub fn transition(stage: &Stage, status: LeadStatus) -> Stage {
    match stage {
        Stage::Classify => Stage::route(status),
        Stage::Active | Stage::Followup | Stage::Breakup => Stage::Format,
        Stage::Forced(_) | Stage::Format | Stage::Done => Stage::Done,
    }
}

/// Transient per-run record; dropped once the run is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowState {
    pub prospect_id: ProspectId,
    pub days_since_contact: i64,
    pub status: LeadStatus,
    pub subject: Option<String>,
    /// Empty when no message should go out.
    pub body: String,
    pub action: String,
    pub fallback_used: bool,
    pub stage: Stage,
}

impl WorkflowState {
    fn new(prospect: &Prospect, stage: Stage) -> Self {
        Self {
            prospect_id: prospect.id,
            days_since_contact: 0,
            status: prospect.status,
            subject: None,
            body: String::new(),
            action: String::new(),
            fallback_used: false,
            stage,
        }
    }

    pub fn has_message(&self) -> bool {
        !self.body.trim().is_empty()
    }
}

/// Trim the body and stamp the action. Applying it twice leaves the body
/// unchanged.
pub fn finalize(state: &mut WorkflowState) {
    state.body = state.body.trim().to_string();
    state.action = format!("finalized_{}", state.action);
}

pub fn forced_subject(prospect: &Prospect, tag: &ContextTag) -> String {
    match (tag, prospect.company.as_deref().filter(|c| !c.is_empty())) {
        (ContextTag::ColdMail, _) => format!("Connecting - {}", prospect.name),
        (_, Some(company)) => format!("Re: {company} - {}", prospect.name),
        (_, None) => format!("Re: {}", prospect.name),
    }
}

pub struct Workflow<'a> {
    composer: &'a dyn MessageComposer,
    thresholds: ClassifierThresholds,
}

impl<'a> Workflow<'a> {
    pub fn new(composer: &'a dyn MessageComposer, thresholds: ClassifierThresholds) -> Self {
        Self {
            composer,
            thresholds,
        }
    }

    /// Classify, route, compose and format.
    pub async fn run(&self, prospect: &Prospect, now: DateTime<Utc>) -> WorkflowState {
        self.drive(WorkflowState::new(prospect, Stage::Classify), prospect, now)
            .await
    }

    /// Compose directly under `tag`. The stored status is kept.
    pub async fn run_forced(
        &self,
        prospect: &Prospect,
        tag: ContextTag,
        now: DateTime<Utc>,
    ) -> WorkflowState {
        self.drive(WorkflowState::new(prospect, Stage::Forced(tag)), prospect, now)
            .await
    }

    async fn drive(
        &self,
        mut state: WorkflowState,
        prospect: &Prospect,
        now: DateTime<Utc>,
    ) -> WorkflowState {
        state.days_since_contact = days_since_contact(prospect.last_contacted_at, now);
        while state.stage != Stage::Done {
            self.step(&mut state, prospect, now).await;
        }
        state
    }

    async fn step(&self, state: &mut WorkflowState, prospect: &Prospect, now: DateTime<Utc>) {
        let stage = state.stage.clone();
        match &stage {
            Stage::Classify => {
                state.status = classify(prospect.last_contacted_at, now, &self.thresholds);
            }
            Stage::Active => {
                state.action = "skipped_active".into();
            }
            Stage::Followup => {
                self.compose_into(state, prospect, &ContextTag::Followup).await;
                state.subject = Some(format!("Following up - {}", prospect.name));
                state.action = "generated_followup".into();
            }
            Stage::Breakup => {
                self.compose_into(state, prospect, &ContextTag::Breakup).await;
                state.subject = Some(format!("Checking in - {}", prospect.name));
                state.action = "generated_breakup".into();
            }
            Stage::Forced(tag) => {
                self.compose_into(state, prospect, tag).await;
                state.body = state.body.trim().to_string();
                state.subject = Some(forced_subject(prospect, tag));
                state.action = tag.to_string();
            }
            Stage::Format => finalize(state),
            Stage::Done => {}
        }
        state.stage = transition(&stage, state.status);
    }

    async fn compose_into(&self, state: &mut WorkflowState, prospect: &Prospect, tag: &ContextTag) {
        match self.composer.compose(prospect, tag).await {
            Ok(text) if !text.trim().is_empty() => {
                state.body = text;
                state.fallback_used = false;
            }
            Ok(_) => {
                tracing::warn!(
                    "⚠️ {} returned an empty {} message for prospect {}, using template",
                    self.composer.name(),
                    tag,
                    prospect.id
                );
                state.body = fallback_message(prospect);
                state.fallback_used = true;
            }
            Err(e) => {
                tracing::warn!(
                    "⚠️ Composer failed for prospect {} ({}): {}, using template",
                    prospect.id,
                    tag,
                    e
                );
                state.body = fallback_message(prospect);
                state.fallback_used = true;
            }
        }
    }
}
