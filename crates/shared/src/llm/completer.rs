use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::models::ChatMessage;

pub type CompleterFuture<'a> =
    Pin<Box<dyn Future<Output = Result<String, CompleterError>> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum CompleterError {
    /// Provider returned 429. Retry/backoff is owned by the caller, never
    /// performed inside the gateway.
    #[error("assistant provider rate limited the request")]
    RateLimited,
    /// Provider returned 402.
    #[error("assistant provider quota is exhausted")]
    QuotaExceeded,
    #[error("assistant provider request timed out")]
    Timeout,
    #[error("assistant provider request failed: {0}")]
    ProviderFailure(String),
    #[error("assistant provider returned an invalid payload: {0}")]
    InvalidProviderPayload(String),
}

/// Text-completion capability: an ordered list of role-tagged messages in,
/// one assistant message out.
pub trait Completer: Send + Sync {
    fn complete<'a>(&'a self, messages: &'a [ChatMessage]) -> CompleterFuture<'a>;
}
