//! Per-request context carried through every cloud operation

use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Request context: correlation id, cancellation and an optional deadline
///
/// Cloning a `Kit` shares the same cancellation token, so cancelling any clone
/// cancels them all. Use [`Kit::child`] for a context that can be cancelled
/// on its own without affecting the parent.
#[derive(Debug, Clone)]
pub struct Kit {
    rid: String,
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Default for Kit {
    fn default() -> Self {
        Self::new()
    }
}

impl Kit {
    pub fn new() -> Self {
        Self {
            rid: uuid::Uuid::new_v4().simple().to_string(),
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    pub fn with_rid(mut self, rid: impl Into<String>) -> Self {
        self.rid = rid.into();
        self
    }

    /// Set the deadline relative to now
    ///
    /// A timeout too large to represent as an instant leaves the context
    /// without a deadline of its own.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    /// Set an absolute deadline; an earlier existing deadline wins
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) if current < deadline => current,
            _ => deadline,
        });
        self
    }

    /// Context sharing rid and deadline whose cancellation does not propagate upward
    pub fn child(&self) -> Self {
        Self {
            rid: self.rid.clone(),
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn rid(&self) -> &str {
        &self.rid
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Time left before the deadline; `None` when no deadline is set
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        matches!(self.remaining(), Some(d) if d.is_zero())
    }

    /// Resolves once the context is cancelled
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}
