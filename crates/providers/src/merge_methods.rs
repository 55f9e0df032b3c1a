use crate::{default_branch, unexpected_value};
use async_trait::async_trait;
use repolens_primitives::{
    apply_rule_constraints, keys, DependencyValue, FetchScope, MergeSettings, Params, RepoIdentity,
};
use repolens_resolve::{DependencyProvider, ResolveCtx, ResolveError, Resolver};

/// Serves `repo.effective_merge_methods`: the repository's merge toggles
/// narrowed by every active branch ruleset that admits the default branch.
///
/// The ruleset listing is best-effort: when it cannot be resolved, the
/// pre-ruleset mask stands.
#[derive(Clone, Copy, Debug, Default)]
pub struct EffectiveMergeMethodsProvider;

#[async_trait]
impl DependencyProvider for EffectiveMergeMethodsProvider {
    fn key(&self) -> &'static str {
        keys::REPO_EFFECTIVE_MERGE_METHODS
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
        let settings = match repo.merge_settings {
            Some(settings) => settings,
            None => metadata_settings(ctx, repo, resolver).await?,
        };
        let base = settings.mask();
        if base.is_empty() {
            return Ok(DependencyValue::MergeMethods(base));
        }

        let branch = default_branch(ctx, repo, resolver).await?;
        let rulesets_value =
            match resolver.resolve(ctx, repo, keys::REPO_ALL_RULESETS, &Params::new()).await {
                Ok(value) => value,
                Err(err) => {
                    tracing::debug!(
                        target: "providers",
                        repo = %repo.full_name,
                        error = %err,
                        "ruleset listing unavailable, keeping pre-ruleset merge mask"
                    );
                    return Ok(DependencyValue::MergeMethods(base));
                }
            };
        let rulesets = rulesets_value
            .as_rulesets()
            .ok_or_else(|| unexpected_value(keys::REPO_ALL_RULESETS, &rulesets_value))?;

        let target_ref = format!("refs/heads/{branch}");
        let mut mask = base;
        for ruleset in rulesets.iter().filter(|rs| rs.applies_to_ref(&target_ref)) {
            mask = apply_rule_constraints(mask, &ruleset.rules).mask;
        }
        Ok(DependencyValue::MergeMethods(mask))
    }
}

async fn metadata_settings(
    ctx: &ResolveCtx,
    repo: &RepoIdentity,
    resolver: &Resolver,
) -> Result<MergeSettings, ResolveError> {
    let value = resolver.resolve(ctx, repo, keys::REPO_METADATA, &Params::new()).await?;
    let meta = value.as_metadata().ok_or_else(|| unexpected_value(keys::REPO_METADATA, &value))?;
    Ok(meta.merge_settings)
}
