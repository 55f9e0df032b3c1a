use crate::{default_branch, observe};
use async_trait::async_trait;
use repolens_primitives::{
    keys, DependencyValue, FetchScope, FilePresence, Params, RepoIdentity,
};
use repolens_remote::RemoteClient;
use repolens_resolve::{DependencyProvider, ResolveCtx, ResolveError, Resolver};

/// The paths probed for a CODEOWNERS file, in order.
const CODEOWNERS_PATHS: [&str; 2] = ["CODEOWNERS", ".github/CODEOWNERS"];

/// Serves `repo.default_branch.codeowners`: probes the well-known CODEOWNERS
/// locations on the default branch. Absence is a finding, not an error.
#[derive(Clone, Copy, Debug, Default)]
pub struct CodeownersProvider;

#[async_trait]
impl DependencyProvider for CodeownersProvider {
    fn key(&self) -> &'static str {
        keys::REPO_DEFAULT_BRANCH_CODEOWNERS
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
        let branch = default_branch(ctx, repo, resolver).await?;
        for path in CODEOWNERS_PATHS {
            resolver.budget().acquire(ctx.cancellation(), 1).await?;
            let outcome =
                resolver.remote().contents(&repo.owner, &repo.name, path, &branch).await;
            observe(resolver.budget(), &outcome);
            if let Some(content) = outcome?.into_value() {
                return Ok(DependencyValue::Codeowners(FilePresence::found(content.path)));
            }
        }
        Ok(DependencyValue::Codeowners(FilePresence::missing()))
    }
}

/// Serves `repo.default_branch.readme` via the readme endpoint.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReadmeProvider;

#[async_trait]
impl DependencyProvider for ReadmeProvider {
    fn key(&self) -> &'static str {
        keys::REPO_DEFAULT_BRANCH_README
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
        let branch = default_branch(ctx, repo, resolver).await?;
        resolver.budget().acquire(ctx.cancellation(), 1).await?;
        let outcome = resolver.remote().readme(&repo.owner, &repo.name, &branch).await;
        observe(resolver.budget(), &outcome);
        let presence = match outcome?.into_value() {
            Some(content) => FilePresence::found(content.path),
            None => FilePresence::missing(),
        };
        Ok(DependencyValue::Readme(presence))
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{repo, resolver};
    use repolens_primitives::{keys, Params};
    use repolens_remote::test_utils::MockRemoteClient;
    use repolens_resolve::ResolveCtx;
    use std::sync::Arc;

    #[tokio::test]
    async fn codeowners_probes_both_locations() {
        let mock =
            Arc::new(MockRemoteClient::new().with_content("octo/widgets", ".github/CODEOWNERS"));
        let resolver = resolver(Arc::clone(&mock));
        let ctx = ResolveCtx::new();
        let repo = repo().with_default_branch("main");

        let value = resolver
            .resolve(&ctx, &repo, keys::REPO_DEFAULT_BRANCH_CODEOWNERS, &Params::new())
            .await
            .unwrap();
        let presence = value.as_file_presence().unwrap();
        assert!(presence.present);
        assert_eq!(presence.path.as_deref(), Some(".github/CODEOWNERS"));
        // Root miss plus .github hit.
        assert_eq!(mock.calls().contents, 2);
    }

    #[tokio::test]
    async fn codeowners_at_the_root_stops_the_probe() {
        let mock = Arc::new(MockRemoteClient::new().with_content("octo/widgets", "CODEOWNERS"));
        let resolver = resolver(Arc::clone(&mock));
        let ctx = ResolveCtx::new();
        let repo = repo().with_default_branch("main");

        let value = resolver
            .resolve(&ctx, &repo, keys::REPO_DEFAULT_BRANCH_CODEOWNERS, &Params::new())
            .await
            .unwrap();
        assert_eq!(value.as_file_presence().unwrap().path.as_deref(), Some("CODEOWNERS"));
        assert_eq!(mock.calls().contents, 1);
    }

    #[tokio::test]
    async fn missing_codeowners_is_not_an_error() {
        let mock = Arc::new(MockRemoteClient::new());
        let resolver = resolver(Arc::clone(&mock));
        let ctx = ResolveCtx::new();
        let repo = repo().with_default_branch("main");

        let value = resolver
            .resolve(&ctx, &repo, keys::REPO_DEFAULT_BRANCH_CODEOWNERS, &Params::new())
            .await
            .unwrap();
        assert!(!value.as_file_presence().unwrap().present);
        assert_eq!(mock.calls().contents, 2);
    }

    #[tokio::test]
    async fn readme_presence_records_the_path() {
        let mock = Arc::new(MockRemoteClient::new().with_readme("octo/widgets", "README.md"));
        let resolver = resolver(Arc::clone(&mock));
        let ctx = ResolveCtx::new();
        let repo = repo().with_default_branch("main");

        let value = resolver
            .resolve(&ctx, &repo, keys::REPO_DEFAULT_BRANCH_README, &Params::new())
            .await
            .unwrap();
        assert_eq!(value.as_file_presence().unwrap().path.as_deref(), Some("README.md"));

        let missing = resolver
            .resolve(
                &ctx,
                &repo.clone().with_default_branch("dev"),
                keys::REPO_DEFAULT_BRANCH_README,
                &Params::new(),
            )
            .await;
        // Same repo fingerprint: params and identity match, so this is the
        // cached value, not a second probe.
        assert!(missing.is_ok());
        assert_eq!(mock.calls().readme, 1);
    }
}
