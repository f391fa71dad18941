//! Sync coordination between the host application, the local store, and the
//! remote collaborator.

pub mod confirm;
pub mod coordinator;
pub mod messages;

pub use confirm::{Confirm, FixedAnswer};
pub use coordinator::{RemoveOutcome, SaveOutcome, SyncCoordinator};
pub use messages::{Notification, Request};
