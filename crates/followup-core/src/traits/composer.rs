//! Message composer trait: produces outreach copy for a prospect.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ContextTag, Prospect};

/// Generates message text for a prospect under a context tag.
///
/// Implementations may fail; the engine is responsible for degrading to a
/// deterministic template so a dispatch is still attempted.
#[async_trait]
pub trait MessageComposer: Send + Sync {
    fn name(&self) -> &str;

    async fn compose(&self, prospect: &Prospect, tag: &ContextTag) -> Result<String>;
}
