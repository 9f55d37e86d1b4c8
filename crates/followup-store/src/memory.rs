//! In-memory prospect store. Same semantics as the SQLite store without a
//! file; used for dry runs and engine tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use followup_core::error::{FollowUpError, Result};
use followup_core::traits::ProspectStore;
use followup_core::types::{
    ActivityRecord, OwnerId, Prospect, ProspectCommit, ProspectId, Sequence, SequenceId,
    SequenceStep,
};

#[derive(Default)]
struct State {
    prospects: BTreeMap<ProspectId, Prospect>,
    sequences: BTreeMap<SequenceId, Sequence>,
    activity: Vec<ActivityRecord>,
    leases: HashMap<ProspectId, (String, DateTime<Utc>)>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|e| FollowUpError::Store(format!("Lock: {e}")))
    }

    pub fn insert_prospect(&self, prospect: Prospect) -> Result<()> {
        self.lock()?.prospects.insert(prospect.id, prospect);
        Ok(())
    }

    pub fn insert_sequence(&self, sequence: Sequence) -> Result<()> {
        self.lock()?.sequences.insert(sequence.id, sequence);
        Ok(())
    }

    /// Current stored copy, regardless of owner.
    pub fn snapshot(&self, id: ProspectId) -> Result<Option<Prospect>> {
        Ok(self.lock()?.prospects.get(&id).cloned())
    }

    /// Every record in insertion order.
    pub fn activity(&self) -> Result<Vec<ActivityRecord>> {
        Ok(self.lock()?.activity.clone())
    }
}

#[async_trait]
impl ProspectStore for MemoryStore {
    async fn prospects_for_owner(&self, owner: OwnerId) -> Result<Vec<Prospect>> {
        Ok(self
            .lock()?
            .prospects
            .values()
            .filter(|p| p.owner_id == owner)
            .cloned()
            .collect())
    }

    async fn prospect(&self, owner: OwnerId, id: ProspectId) -> Result<Option<Prospect>> {
        Ok(self
            .lock()?
            .prospects
            .get(&id)
            .filter(|p| p.owner_id == owner)
            .cloned())
    }

    async fn sequenced_prospects(&self) -> Result<Vec<Prospect>> {
        Ok(self
            .lock()?
            .prospects
            .values()
            .filter(|p| p.sequence_id.is_some())
            .cloned()
            .collect())
    }

    async fn sequence_step(
        &self,
        sequence: SequenceId,
        step_number: u32,
    ) -> Result<Option<SequenceStep>> {
        Ok(self
            .lock()?
            .sequences
            .get(&sequence)
            .and_then(|s| s.step(step_number))
            .cloned())
    }

    async fn commit(&self, batch: &[ProspectCommit]) -> Result<()> {
        let mut state = self.lock()?;
        let mut next_id = state.activity.len() as i64 + 1;
        for item in batch {
            if let Some(p) = state.prospects.get_mut(&item.prospect_id) {
                if let Some(status) = item.update.status {
                    p.status = status;
                }
                if let Some(at) = item.update.last_contacted_at {
                    p.last_contacted_at = Some(at);
                }
                if let Some(step) = item.update.step_number {
                    p.current_step_number = p.current_step_number.max(step);
                }
            }
            for record in &item.records {
                let mut record = record.clone();
                record.id = Some(next_id);
                next_id += 1;
                state.activity.push(record);
            }
        }
        Ok(())
    }

    async fn try_lease(&self, prospect: ProspectId, holder: &str, ttl_secs: u64) -> Result<bool> {
        let now = Utc::now();
        let mut state = self.lock()?;
        if let Some((current, expires)) = state.leases.get(&prospect) {
            if current != holder && *expires > now {
                return Ok(false);
            }
        }
        let expires = now + TimeDelta::seconds(ttl_secs.min(u32::MAX as u64) as i64);
        state.leases.insert(prospect, (holder.to_string(), expires));
        Ok(true)
    }

    async fn release_lease(&self, prospect: ProspectId, holder: &str) -> Result<()> {
        let mut state = self.lock()?;
        if state.leases.get(&prospect).is_some_and(|(h, _)| h == holder) {
            state.leases.remove(&prospect);
        }
        Ok(())
    }

    async fn recent_activity(&self, owner: OwnerId, limit: usize) -> Result<Vec<ActivityRecord>> {
        Ok(self
            .lock()?
            .activity
            .iter()
            .rev()
            .filter(|r| r.owner_id == owner)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use followup_core::types::{ActivityKind, StepAction};

    #[tokio::test]
    async fn test_sequence_step_lookup() {
        let store = MemoryStore::new();
        store
            .insert_sequence(Sequence {
                id: 1,
                name: "s".into(),
                description: None,
                created_at: Utc::now(),
                steps: vec![SequenceStep {
                    step_number: 2,
                    wait_days: 1,
                    action: StepAction::Email,
                    template: None,
                }],
            })
            .unwrap();
        assert!(store.sequence_step(1, 1).await.unwrap().is_none());
        assert!(store.sequence_step(1, 2).await.unwrap().is_some());
        assert!(store.sequence_step(9, 2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_recent_activity_newest_first() {
        let store = MemoryStore::new();
        store.insert_prospect(Prospect::new(1, 1, "Ada", "ada@x.io")).unwrap();
        let mut item = ProspectCommit::new(1);
        for n in 0..3 {
            item.records.push(ActivityRecord::new(
                1,
                Some(1),
                ActivityKind::Classified,
                serde_json::json!({ "n": n }),
            ));
        }
        store.commit(&[item]).await.unwrap();

        let recent = store.recent_activity(1, 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].details["n"], 2);
        assert!(store.recent_activity(2, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lease_blocks_other_holder() {
        let store = MemoryStore::new();
        assert!(store.try_lease(1, "a", 60).await.unwrap());
        assert!(!store.try_lease(1, "b", 60).await.unwrap());
        store.release_lease(1, "b").await.unwrap();
        assert!(!store.try_lease(1, "b", 60).await.unwrap());
        store.release_lease(1, "a").await.unwrap();
        assert!(store.try_lease(1, "b", 60).await.unwrap());
    }
}
