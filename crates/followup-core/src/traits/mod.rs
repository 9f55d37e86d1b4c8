//! Collaborator traits: the seams the engine is wired through.

pub mod composer;
pub mod store;
pub mod transport;

pub use composer::MessageComposer;
pub use store::ProspectStore;
pub use transport::Transport;
