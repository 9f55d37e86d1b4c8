//! # FollowUp Store
//!
//! [`SqliteStore`] is the production store; [`MemoryStore`] keeps the same
//! semantics in process. Both implement
//! [`ProspectStore`](followup_core::traits::ProspectStore).

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use followup_core::types::{NewProspect, NewSequence};
use serde::{Deserialize, Serialize};

/// JSON import file: sequences are created before prospects so prospects
/// can reference them by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportBundle {
    #[serde(default)]
    pub sequences: Vec<NewSequence>,
    #[serde(default)]
    pub prospects: Vec<NewProspect>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub sequences_created: usize,
    pub sequences_skipped: usize,
    pub prospects_created: usize,
}
