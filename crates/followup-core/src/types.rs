//! Domain data model: prospects, sequences, activity records and the
//! write sets the engine hands back to the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::FollowUpError;

pub type OwnerId = i64;
pub type ProspectId = i64;
pub type SequenceId = i64;

// ─── Prospect ─────────────────────────────────────────────

/// Lifecycle status derived from contact recency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    #[default]
    Active,
    NeedsFollowup,
    Stalled,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::NeedsFollowup => "needs_followup",
            Self::Stalled => "stalled",
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = FollowUpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "needs_followup" => Ok(Self::NeedsFollowup),
            "stalled" => Ok(Self::Stalled),
            other => Err(FollowUpError::Invalid(format!("unknown status '{other}'"))),
        }
    }
}

/// Who the prospect is to the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactCategory {
    #[default]
    Client,
    Recruiter,
    Hr,
}

impl ContactCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Recruiter => "recruiter",
            Self::Hr => "hr",
        }
    }

    /// Recruiters and HR get career-facing copy instead of sales copy.
    pub fn is_hiring_side(&self) -> bool {
        matches!(self, Self::Recruiter | Self::Hr)
    }
}

impl fmt::Display for ContactCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContactCategory {
    type Err = FollowUpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Self::Client),
            "recruiter" => Ok(Self::Recruiter),
            "hr" => Ok(Self::Hr),
            other => Err(FollowUpError::Invalid(format!("unknown contact category '{other}'"))),
        }
    }
}

/// A contact being pursued through outreach.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prospect {
    pub id: ProspectId,
    pub owner_id: OwnerId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub last_contacted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: LeadStatus,
    #[serde(default)]
    pub category: ContactCategory,
    #[serde(default)]
    pub tech_stack: Option<String>,
    #[serde(default)]
    pub resume_link: Option<String>,
    #[serde(default)]
    pub sequence_id: Option<SequenceId>,
    /// 0 = sequence not started.
    #[serde(default)]
    pub current_step_number: u32,
}

impl Prospect {
    /// Minimal prospect with every optional field empty.
    pub fn new(id: ProspectId, owner_id: OwnerId, name: &str, email: &str) -> Self {
        Self {
            id,
            owner_id,
            name: name.to_string(),
            email: email.to_string(),
            company: None,
            phone: None,
            last_contacted_at: None,
            status: LeadStatus::default(),
            category: ContactCategory::default(),
            tech_stack: None,
            resume_link: None,
            sequence_id: None,
            current_step_number: 0,
        }
    }

    pub fn company_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.company.as_deref().filter(|c| !c.is_empty()).unwrap_or(fallback)
    }
}

/// Prospect fields accepted on import, before the store assigns an id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProspect {
    pub owner_id: OwnerId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub last_contacted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub category: ContactCategory,
    #[serde(default)]
    pub tech_stack: Option<String>,
    #[serde(default)]
    pub resume_link: Option<String>,
    /// Sequence to enroll in, by name.
    #[serde(default)]
    pub sequence: Option<String>,
}

// ─── Sequences ────────────────────────────────────────────

/// What a sequence step does when it fires.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StepAction {
    Email,
    WhatsApp,
    /// Recorded but not dispatchable (e.g. "linkedin").
    Other(String),
}

impl StepAction {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Email => "email",
            Self::WhatsApp => "whatsapp",
            Self::Other(kind) => kind,
        }
    }
}

impl From<String> for StepAction {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "email" => Self::Email,
            "whatsapp" => Self::WhatsApp,
            _ => Self::Other(s),
        }
    }
}

impl From<StepAction> for String {
    fn from(a: StepAction) -> Self {
        a.as_str().to_string()
    }
}

impl fmt::Display for StepAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One timed stage of a sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceStep {
    pub step_number: u32,
    /// Days after the last contact before this step becomes eligible.
    #[serde(default)]
    pub wait_days: u32,
    #[serde(rename = "action_type")]
    pub action: StepAction,
    /// Context tag handed to the composer.
    #[serde(default, rename = "template_name")]
    pub template: Option<String>,
}

/// A named ordered outreach protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    pub id: SequenceId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub steps: Vec<SequenceStep>,
}

impl Sequence {
    pub fn step(&self, number: u32) -> Option<&SequenceStep> {
        self.steps.iter().find(|s| s.step_number == number)
    }
}

/// Sequence definition accepted on import/create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSequence {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub steps: Vec<SequenceStep>,
}

impl NewSequence {
    /// Step numbers must be positive and unique; gaps are allowed.
    pub fn validate(&self) -> crate::Result<()> {
        if self.name.trim().is_empty() {
            return Err(FollowUpError::Invalid("sequence name is empty".into()));
        }
        let mut seen = std::collections::HashSet::new();
        for step in &self.steps {
            if step.step_number == 0 {
                return Err(FollowUpError::Invalid(format!(
                    "sequence '{}': step numbers start at 1",
                    self.name
                )));
            }
            if !seen.insert(step.step_number) {
                return Err(FollowUpError::Invalid(format!(
                    "sequence '{}': duplicate step number {}",
                    self.name, step.step_number
                )));
            }
        }
        Ok(())
    }
}

// ─── Composition ──────────────────────────────────────────

/// Label selecting the tone/intent of composed content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ContextTag {
    Followup,
    Breakup,
    ColdMail,
    Custom(String),
}

impl ContextTag {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Followup => "followup",
            Self::Breakup => "breakup",
            Self::ColdMail => "cold_mail",
            Self::Custom(tag) => tag,
        }
    }
}

impl From<&str> for ContextTag {
    fn from(s: &str) -> Self {
        match s {
            "followup" => Self::Followup,
            "breakup" => Self::Breakup,
            "cold_mail" => Self::ColdMail,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl From<String> for ContextTag {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<ContextTag> for String {
    fn from(t: ContextTag) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for ContextTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Dispatch ─────────────────────────────────────────────

/// Delivery modality; each has its own ordered provider list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    /// Email.
    DirectMessage,
    /// WhatsApp.
    ChatMessage,
}

impl Modality {
    pub fn channel_name(&self) -> &'static str {
        match self {
            Self::DirectMessage => "email",
            Self::ChatMessage => "whatsapp",
        }
    }
}

/// A message ready for a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    /// Email address or phone number.
    pub destination: String,
    pub subject: Option<String>,
    pub body: String,
}

/// Successful send as reported by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub provider: String,
    pub provider_id: Option<String>,
}

// ─── Activity ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Classified,
    Dispatched,
    Error,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classified => "classified",
            Self::Dispatched => "dispatched",
            Self::Error => "error",
        }
    }
}

impl FromStr for ActivityKind {
    type Err = FollowUpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "classified" => Ok(Self::Classified),
            "dispatched" => Ok(Self::Dispatched),
            "error" => Ok(Self::Error),
            other => Err(FollowUpError::Invalid(format!("unknown activity kind '{other}'"))),
        }
    }
}

/// Append-only audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// Assigned by the store on insert.
    #[serde(default)]
    pub id: Option<i64>,
    pub owner_id: OwnerId,
    pub prospect_id: Option<ProspectId>,
    pub kind: ActivityKind,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl ActivityRecord {
    pub fn new(
        owner_id: OwnerId,
        prospect_id: Option<ProspectId>,
        kind: ActivityKind,
        details: serde_json::Value,
    ) -> Self {
        Self {
            id: None,
            owner_id,
            prospect_id,
            kind,
            details,
            created_at: Utc::now(),
        }
    }
}

// ─── Write sets ───────────────────────────────────────────

/// Field changes for one prospect. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProspectUpdate {
    pub status: Option<LeadStatus>,
    pub last_contacted_at: Option<DateTime<Utc>>,
    /// Applied only if greater than the stored step.
    pub step_number: Option<u32>,
}

impl ProspectUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.last_contacted_at.is_none() && self.step_number.is_none()
    }
}

/// Everything one prospect's processing wants persisted. Committed as a unit
/// or discarded as a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct ProspectCommit {
    pub prospect_id: ProspectId,
    pub update: ProspectUpdate,
    pub records: Vec<ActivityRecord>,
}

impl ProspectCommit {
    pub fn new(prospect_id: ProspectId) -> Self {
        Self {
            prospect_id,
            update: ProspectUpdate::default(),
            records: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.update.is_empty() && self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [LeadStatus::Active, LeadStatus::NeedsFollowup, LeadStatus::Stalled] {
            assert_eq!(status.as_str().parse::<LeadStatus>().unwrap(), status);
        }
        assert!("dormant".parse::<LeadStatus>().is_err());
    }

    #[test]
    fn test_step_action_parsing() {
        assert_eq!(StepAction::from("EMAIL".to_string()), StepAction::Email);
        assert_eq!(StepAction::from("whatsapp".to_string()), StepAction::WhatsApp);
        assert_eq!(
            StepAction::from("linkedin".to_string()),
            StepAction::Other("linkedin".into())
        );
    }

    #[test]
    fn test_sequence_step_json_field_names() {
        let step: SequenceStep = serde_json::from_value(serde_json::json!({
            "step_number": 2,
            "wait_days": 3,
            "action_type": "whatsapp",
            "template_name": "cold_mail"
        }))
        .unwrap();
        assert_eq!(step.action, StepAction::WhatsApp);
        assert_eq!(step.template.as_deref(), Some("cold_mail"));
    }

    #[test]
    fn test_new_sequence_rejects_duplicate_steps() {
        let step = |n| SequenceStep {
            step_number: n,
            wait_days: 0,
            action: StepAction::Email,
            template: None,
        };
        let ok = NewSequence {
            name: "gap".into(),
            description: None,
            steps: vec![step(1), step(3)],
        };
        assert!(ok.validate().is_ok());

        let dup = NewSequence {
            name: "dup".into(),
            description: None,
            steps: vec![step(1), step(1)],
        };
        assert!(dup.validate().is_err());

        let zero = NewSequence {
            name: "zero".into(),
            description: None,
            steps: vec![step(0)],
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_context_tag_from_str() {
        assert_eq!(ContextTag::from("cold_mail"), ContextTag::ColdMail);
        assert_eq!(ContextTag::from("saas_offer"), ContextTag::Custom("saas_offer".into()));
        assert_eq!(ContextTag::Breakup.to_string(), "breakup");
    }
}
