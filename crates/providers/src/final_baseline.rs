use crate::unexpected_value;
use async_trait::async_trait;
use repolens_primitives::{
    keys, BaselineSource, DependencyValue, FetchScope, MergeBaseline, Params, RepoIdentity,
};
use repolens_resolve::{DependencyProvider, ResolveCtx, ResolveError, Resolver};

/// Serves `merge.baseline`: the organization-ruleset baseline when it is
/// decided (`set` or `conflict`), the convention baseline otherwise. A
/// missing or malformed convention degrades to `none` with source
/// `convention` instead of failing the resolution.
#[derive(Clone, Copy, Debug, Default)]
pub struct FinalMergeBaselineProvider;

#[async_trait]
impl DependencyProvider for FinalMergeBaselineProvider {
    fn key(&self) -> &'static str {
        keys::MERGE_BASELINE
    }

    fn scope(&self) -> FetchScope {
        FetchScope::Org
    }

    async fn fetch(
        &self,
        ctx: &ResolveCtx,
        repo: &RepoIdentity,
        _params: &Params,
        resolver: &Resolver,
    ) -> Result<DependencyValue, ResolveError> {
        let org_value =
            resolver.resolve(ctx, repo, keys::ORG_MERGE_BASELINE, &Params::new()).await?;
        let org = org_value
            .as_baseline()
            .ok_or_else(|| unexpected_value(keys::ORG_MERGE_BASELINE, &org_value))?;
        if org.is_decided() {
            return Ok(DependencyValue::Baseline(org.clone()));
        }

        match resolver.resolve(ctx, repo, keys::REPOS_MERGE_CONVENTION, &Params::new()).await {
            Ok(value) => match value.as_baseline() {
                Some(convention) => Ok(DependencyValue::Baseline(convention.clone())),
                None => Ok(DependencyValue::Baseline(MergeBaseline::none(
                    BaselineSource::Convention,
                ))),
            },
            Err(err) => {
                tracing::debug!(
                    target: "providers",
                    owner = %repo.owner,
                    error = %err,
                    "convention baseline unavailable, degrading to none"
                );
                Ok(DependencyValue::Baseline(MergeBaseline::none(BaselineSource::Convention)))
            }
        }
    }
}
