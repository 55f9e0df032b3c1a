use crate::{default_branch, observe};
use async_trait::async_trait;
use repolens_primitives::{keys, DependencyValue, FetchScope, Params, RepoIdentity};
use repolens_remote::RemoteClient;
use repolens_resolve::{DependencyProvider, ResolveCtx, ResolveError, Resolver};

/// Serves `repo.default_branch.protection.classic`.
///
/// Resolves the default branch first (through `repo.metadata` when the
/// identity does not carry one), then fetches the classic protection; an
/// unprotected branch (404) materializes as `None`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultBranchProtectionProvider;

#[async_trait]
impl DependencyProvider for DefaultBranchProtectionProvider {
    fn key(&self) -> &'static str {
        keys::REPO_DEFAULT_BRANCH_PROTECTION_CLASSIC
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
        let outcome = resolver.remote().branch_protection(&repo.owner, &repo.name, &branch).await;
        observe(resolver.budget(), &outcome);
        Ok(DependencyValue::ClassicProtection(outcome?.into_value()))
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{repo, resolver};
    use repolens_primitives::{keys, BranchProtection, EnabledFlag, Params, RepoMetadata};
    use repolens_remote::test_utils::MockRemoteClient;
    use repolens_resolve::ResolveCtx;
    use std::sync::Arc;

    fn metadata() -> RepoMetadata {
        RepoMetadata {
            full_name: "octo/widgets".to_owned(),
            default_branch: "main".to_owned(),
            ..RepoMetadata::default()
        }
    }

    #[tokio::test]
    async fn falls_back_to_metadata_for_the_default_branch() {
        let mock = Arc::new(
            MockRemoteClient::new().with_repo(metadata()).with_branch_protection(
                "octo/widgets",
                "main",
                BranchProtection {
                    allow_deletions: Some(EnabledFlag { enabled: false }),
                    ..BranchProtection::default()
                },
            ),
        );
        let resolver = resolver(Arc::clone(&mock));
        let ctx = ResolveCtx::new();

        // The identity lacks a default branch: metadata (1 call) then
        // protection (1 call).
        let value = resolver
            .resolve(&ctx, &repo(), keys::REPO_DEFAULT_BRANCH_PROTECTION_CLASSIC, &Params::new())
            .await
            .unwrap();
        let protection = value.as_classic_protection().unwrap().unwrap();
        assert_eq!(protection.allow_deletions, Some(EnabledFlag { enabled: false }));
        assert_eq!(mock.calls().total(), 2);

        // An explicit metadata resolution afterwards is a cache hit.
        resolver.resolve(&ctx, &repo(), keys::REPO_METADATA, &Params::new()).await.unwrap();
        assert_eq!(mock.calls().total(), 2);
    }

    #[tokio::test]
    async fn inline_default_branch_skips_metadata() {
        let mock = Arc::new(MockRemoteClient::new());
        let resolver = resolver(Arc::clone(&mock));
        let ctx = ResolveCtx::new();
        let repo = repo().with_default_branch("trunk");

        // No protection registered: 404 materializes as `None`.
        let value = resolver
            .resolve(&ctx, &repo, keys::REPO_DEFAULT_BRANCH_PROTECTION_CLASSIC, &Params::new())
            .await
            .unwrap();
        assert_eq!(value.as_classic_protection().unwrap(), None);
        assert_eq!(mock.calls().repo, 0);
        assert_eq!(mock.calls().branch_protection, 1);
    }
}
