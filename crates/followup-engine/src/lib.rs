//! # FollowUp Engine
//!
//! Lead lifecycle orchestration.
//!
//! ## Architecture
//! ```text
//! Cycle Runner / Sequence Stepper
//!   → load prospect (ProspectStore)
//!   → Workflow: Classify → Active | Followup | Breakup → Format → Done
//!       └── MessageComposer (falls back to a template on failure)
//!   → DispatchRouter: first configured transport for the modality, one send
//!   → ActivityRecorder: status, last contact, step, activity records
//!   → ProspectStore::commit (one unit per prospect, one batch per stepper pass)
//! ```

pub mod classifier;
pub mod cron;
pub mod dispatch;
pub mod engine;
pub mod recorder;
pub mod schedule;
pub mod sequence;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

pub use classifier::{ClassifierThresholds, classify, days_since_contact};
pub use dispatch::DispatchRouter;
pub use engine::{CycleReport, Engine, EngineOptions, ProspectRun};
pub use schedule::{Scheduler, run_scheduler};
pub use sequence::SequenceReport;
pub use workflow::{Stage, Workflow, WorkflowState};
