use crate::observe;
use async_trait::async_trait;
use repolens_primitives::{keys, DependencyValue, FetchScope, Params, RepoIdentity};
use repolens_remote::RemoteClient;
use repolens_resolve::{DependencyProvider, ResolveCtx, ResolveError, Resolver};

/// Serves `repo.metadata`: one repository fetch.
#[derive(Clone, Copy, Debug, Default)]
pub struct MetadataProvider;

#[async_trait]
impl DependencyProvider for MetadataProvider {
    fn key(&self) -> &'static str {
        keys::REPO_METADATA
    }

    fn scope(&self) -> FetchScope {
        FetchScope::Repo
    }

    async fn fetch(
        &self,
        ctx: &ResolveCtx,
        repo: &RepoIdentity,
        _params: &Params,
        resolver: &Resolver,
    ) -> Result<DependencyValue, ResolveError> {
        resolver.budget().acquire(ctx.cancellation(), 1).await?;
        let outcome = resolver.remote().repo(&repo.owner, &repo.name).await;
        observe(resolver.budget(), &outcome);
        Ok(DependencyValue::Metadata(outcome?.into_value()))
    }
}
