//! Test doubles for the engine's collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use followup_core::error::{FollowUpError, Result};
use followup_core::traits::{MessageComposer, ProspectStore, Transport};
use followup_core::types::{
    ActivityRecord, ContextTag, Delivery, Modality, OutboundMessage, OwnerId, Prospect,
    ProspectCommit, ProspectId, SequenceId, SequenceStep,
};
use followup_store::MemoryStore;

/// Always returns the same text.
pub struct StaticComposer {
    text: String,
    calls: AtomicUsize,
    last_tag: Mutex<Option<ContextTag>>,
}

impl StaticComposer {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.into(),
            calls: AtomicUsize::new(0),
            last_tag: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_tag(&self) -> Option<ContextTag> {
        self.last_tag.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageComposer for StaticComposer {
    fn name(&self) -> &str {
        "static"
    }

    async fn compose(&self, _prospect: &Prospect, tag: &ContextTag) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_tag.lock().unwrap() = Some(tag.clone());
        Ok(self.text.clone())
    }
}

pub struct FailingComposer;

#[async_trait]
impl MessageComposer for FailingComposer {
    fn name(&self) -> &str {
        "failing"
    }

    async fn compose(&self, _prospect: &Prospect, _tag: &ContextTag) -> Result<String> {
        Err(FollowUpError::Composer("upstream 503".into()))
    }
}

/// Records every send; can be made unconfigured or failing.
pub struct MockTransport {
    name: String,
    modality: Modality,
    configured: bool,
    fail: bool,
    attempts: AtomicUsize,
    sent: Mutex<Vec<OutboundMessage>>,
}

impl MockTransport {
    fn new(name: &str, modality: Modality) -> Self {
        Self {
            name: name.into(),
            modality,
            configured: true,
            fail: false,
            attempts: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn email(name: &str) -> Self {
        Self::new(name, Modality::DirectMessage)
    }

    pub fn chat(name: &str) -> Self {
        Self::new(name, Modality::ChatMessage)
    }

    pub fn unconfigured(mut self) -> Self {
        self.configured = false;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn modality(&self) -> Modality {
        self.modality
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn send(&self, message: &OutboundMessage) -> Result<Delivery> {
        let n = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail {
            return Err(FollowUpError::Transport(format!("{} unavailable", self.name)));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(Delivery {
            provider: self.name.clone(),
            provider_id: Some(format!("{}-{n}", self.name)),
        })
    }
}

pub fn transports(list: &[&Arc<MockTransport>]) -> Vec<Arc<dyn Transport>> {
    list.iter()
        .map(|t| Arc::clone(t) as Arc<dyn Transport>)
        .collect()
}

/// Memory store with injectable faults: unreadable prospects, rejected
/// commits, and a frozen `sequenced_prospects` listing.
pub struct FlakyStore {
    pub inner: Arc<MemoryStore>,
    pub broken: Vec<ProspectId>,
    /// Any batch touching one of these prospects is rejected whole.
    pub rejected: Vec<ProspectId>,
    pub listed: Option<Vec<Prospect>>,
}

impl FlakyStore {
    pub fn wrapping(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            broken: Vec::new(),
            rejected: Vec::new(),
            listed: None,
        }
    }
}

#[async_trait]
impl ProspectStore for FlakyStore {
    async fn prospects_for_owner(&self, owner: OwnerId) -> Result<Vec<Prospect>> {
        self.inner.prospects_for_owner(owner).await
    }

    async fn prospect(&self, owner: OwnerId, id: ProspectId) -> Result<Option<Prospect>> {
        if self.broken.contains(&id) {
            return Err(FollowUpError::Store(format!("row {id} unreadable")));
        }
        self.inner.prospect(owner, id).await
    }

    async fn sequenced_prospects(&self) -> Result<Vec<Prospect>> {
        match &self.listed {
            Some(listed) => Ok(listed.clone()),
            None => self.inner.sequenced_prospects().await,
        }
    }

    async fn sequence_step(
        &self,
        sequence: SequenceId,
        step_number: u32,
    ) -> Result<Option<SequenceStep>> {
        self.inner.sequence_step(sequence, step_number).await
    }

    async fn commit(&self, batch: &[ProspectCommit]) -> Result<()> {
        if let Some(c) = batch.iter().find(|c| self.rejected.contains(&c.prospect_id)) {
            return Err(FollowUpError::Store(format!(
                "constraint failed for prospect {}",
                c.prospect_id
            )));
        }
        self.inner.commit(batch).await
    }

    async fn try_lease(&self, prospect: ProspectId, holder: &str, ttl_secs: u64) -> Result<bool> {
        self.inner.try_lease(prospect, holder, ttl_secs).await
    }

    async fn release_lease(&self, prospect: ProspectId, holder: &str) -> Result<()> {
        self.inner.release_lease(prospect, holder).await
    }

    async fn recent_activity(&self, owner: OwnerId, limit: usize) -> Result<Vec<ActivityRecord>> {
        self.inner.recent_activity(owner, limit).await
    }
}
