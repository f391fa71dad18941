//! User confirmation before destructive operations.

use async_trait::async_trait;

/// A blocking yes/no prompt shown to the user.
///
/// Only the calling task waits on the answer.
#[async_trait]
pub trait Confirm: Send + Sync {
    /// Ask `message`; `true` means the user agreed.
    async fn confirm(&self, message: &str) -> bool;
}

/// Answers every prompt the same way. Used for headless hosts and tests.
pub struct FixedAnswer(pub bool);

#[async_trait]
impl Confirm for FixedAnswer {
    async fn confirm(&self, message: &str) -> bool {
        tracing::debug!(message, answer = self.0, "Auto-answered confirmation");
        self.0
    }
}
