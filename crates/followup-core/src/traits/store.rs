//! Persistence trait consumed by the engine.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    ActivityRecord, OwnerId, Prospect, ProspectCommit, ProspectId, SequenceId, SequenceStep,
};

#[async_trait]
pub trait ProspectStore: Send + Sync {
    /// All prospects owned by `owner`, ordered by id.
    async fn prospects_for_owner(&self, owner: OwnerId) -> Result<Vec<Prospect>>;

    /// A single prospect, only if owned by `owner`.
    async fn prospect(&self, owner: OwnerId, id: ProspectId) -> Result<Option<Prospect>>;

    /// Every prospect attached to a sequence, across owners.
    async fn sequenced_prospects(&self) -> Result<Vec<Prospect>>;

    async fn sequence_step(
        &self,
        sequence: SequenceId,
        step_number: u32,
    ) -> Result<Option<SequenceStep>>;

    /// Apply every write set in one transaction: all or nothing.
    /// Step numbers only ever move forward.
    async fn commit(&self, batch: &[ProspectCommit]) -> Result<()>;

    /// Take a short-lived exclusive marker on a prospect. Returns `false`
    /// when another holder has an unexpired lease.
    async fn try_lease(&self, prospect: ProspectId, holder: &str, ttl_secs: u64) -> Result<bool>;

    async fn release_lease(&self, prospect: ProspectId, holder: &str) -> Result<()>;

    /// Newest first.
    async fn recent_activity(&self, owner: OwnerId, limit: usize) -> Result<Vec<ActivityRecord>>;
}
