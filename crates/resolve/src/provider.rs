use crate::{context::ResolveCtx, error::ResolveError, resolver::Resolver};
use async_trait::async_trait;
use repolens_primitives::{DependencyValue, FetchScope, Params, RepoIdentity};

/// One dependency key's fetch implementation.
///
/// Providers must be idempotent and deterministic for identical inputs; any
/// internal iteration order is fixed by explicit sorting. A provider may
/// re-enter the resolver for its own prerequisites; the resolver's fetch
/// chain turns accidental recursion into a [`ResolveError::CycleDetected`].
#[async_trait]
pub trait DependencyProvider: Send + Sync {
    /// The dependency key this provider serves.
    fn key(&self) -> &'static str;

    /// Whether the value varies per repository or per organization.
    fn scope(&self) -> FetchScope;

    /// Fetches the value.
    ///
    /// Implementations acquire budget tokens before each outbound call and
    /// observe every response on the budget before branching on the error.
    async fn fetch(
        &self,
        ctx: &ResolveCtx,
        repo: &RepoIdentity,
        params: &Params,
        resolver: &Resolver,
    ) -> Result<DependencyValue, ResolveError>;
}
