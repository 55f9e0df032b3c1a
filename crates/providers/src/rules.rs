use crate::{default_branch, observe};
use async_trait::async_trait;
use repolens_primitives::{keys, DependencyValue, FetchScope, Params, RepoIdentity};
use repolens_remote::RemoteClient;
use repolens_resolve::{DependencyProvider, ResolveCtx, ResolveError, Resolver};

/// Serves `repo.default_branch.effective_rules`: the rules the service
/// reports as effective on the default branch. 404 materializes as an empty
/// list.
#[derive(Clone, Copy, Debug, Default)]
pub struct EffectiveRulesProvider;

#[async_trait]
impl DependencyProvider for EffectiveRulesProvider {
    fn key(&self) -> &'static str {
        keys::REPO_DEFAULT_BRANCH_EFFECTIVE_RULES
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
        let outcome = resolver.remote().branch_rules(&repo.owner, &repo.name, &branch).await;
        observe(resolver.budget(), &outcome);
        Ok(DependencyValue::EffectiveRules(outcome?.into_value()))
    }
}

/// Serves `repo.all_rulesets`: every ruleset applying to the repository,
/// parents included.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllRulesetsProvider;

#[async_trait]
impl DependencyProvider for AllRulesetsProvider {
    fn key(&self) -> &'static str {
        keys::REPO_ALL_RULESETS
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
        let outcome = resolver.remote().repo_rulesets(&repo.owner, &repo.name, true).await;
        observe(resolver.budget(), &outcome);
        Ok(DependencyValue::Rulesets(outcome?.into_value()))
    }
}
