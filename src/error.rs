use thiserror::Error;

/// Failure of a single completion request. Only the rate-limit class is
/// eligible for retry; everything else propagates immediately.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("completion failed: {0}")]
    Failed(String),
}

impl CompletionError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }
}
