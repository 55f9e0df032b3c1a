use async_trait::async_trait;
use repolens_primitives::{keys, DependencyValue, FetchScope, Params, RepoIdentity};
use repolens_resolve::{DependencyProvider, ResolveCtx, ResolveError, Resolver};

/// Serves `repos.scanned`: the discovery result injected by the driver via
/// [`Resolver::set_scanned_repos`] before rule evaluation.
///
/// An explicitly empty injection is a valid observation; only a missing one
/// is an error.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScannedReposProvider;

#[async_trait]
impl DependencyProvider for ScannedReposProvider {
    fn key(&self) -> &'static str {
        keys::REPOS_SCANNED
    }

    fn scope(&self) -> FetchScope {
        FetchScope::Org
    }

    async fn fetch(
        &self,
        _ctx: &ResolveCtx,
        _repo: &RepoIdentity,
        _params: &Params,
        resolver: &Resolver,
    ) -> Result<DependencyValue, ResolveError> {
        match resolver.scanned_repos() {
            Some(repos) => Ok(DependencyValue::ScannedRepos(repos)),
            None => Err(ResolveError::ScannedReposUnavailable),
        }
    }
}
