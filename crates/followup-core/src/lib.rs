//! # FollowUp Core
//!
//! Shared vocabulary for every FollowUp crate: the prospect/sequence data
//! model, the collaborator traits the engine is wired through (store,
//! composer, transports), configuration and the error type.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::FollowUpConfig;
pub use error::{FollowUpError, Result};
