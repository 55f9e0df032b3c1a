use repolens_budget::BudgetError;
use repolens_remote::RemoteError;
use std::sync::Arc;

/// Errors emitted by the resolver and its providers.
///
/// The enum is `Clone` (remote causes sit behind an `Arc`) because the
/// single-flight coalescer hands one outcome to every waiting caller.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ResolveError {
    /// A required argument was missing or invalid.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// No provider is registered for the requested key.
    #[error("unsupported dependency key `{0}`")]
    UnsupportedKey(String),
    /// The request's fingerprint already appears in the fetch chain.
    #[error("dependency cycle detected: {}", .0.join(" -> "))]
    CycleDetected(Vec<String>),
    /// An org-scoped provider needs the scanned-repos set, which was never
    /// injected.
    #[error("scanned repository set has not been injected")]
    ScannedReposUnavailable,
    /// Repository metadata did not yield a default branch.
    #[error("could not resolve a default branch for `{0}`")]
    DefaultBranchUnresolved(String),
    /// The caller was cancelled while waiting for budget tokens.
    #[error("budget acquisition cancelled")]
    BudgetCancelled,
    /// A remote call failed; its rate-limit headers were still observed.
    #[error(transparent)]
    Remote(#[from] Arc<RemoteError>),
    /// A payload did not have the expected shape.
    #[error("malformed payload: {0}")]
    Decode(String),
}

impl From<RemoteError> for ResolveError {
    fn from(err: RemoteError) -> Self {
        Self::Remote(Arc::new(err))
    }
}

impl From<BudgetError> for ResolveError {
    fn from(err: BudgetError) -> Self {
        match err {
            BudgetError::Cancelled => Self::BudgetCancelled,
            BudgetError::InvalidTokenCount => {
                Self::BadRequest("token count must be greater than zero".to_owned())
            }
        }
    }
}
