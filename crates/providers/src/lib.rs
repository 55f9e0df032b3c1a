//! Built-in dependency-key providers for the repolens resolver.
//!
//! Each provider implements one key from the catalog in
//! [`repolens_primitives::keys`]. They all follow the same discipline:
//! resolve prerequisites re-entrantly through the resolver, acquire one
//! budget token per outbound call, observe every response on the budget
//! before looking at the error, and map 404/403 to domain-meaningful empty
//! values where the facade documents it.
//!
//! Wiring happens explicitly: [`build_registry`] composes a fresh registry
//! with every built-in provider, and [`default_registry`] shares one such
//! registry process-wide.

mod contents;
mod convention;
mod deletion;
mod final_baseline;
mod merge_methods;
mod metadata;
mod org_baseline;
mod protection;
mod rules;
mod scanned;

pub use contents::{CodeownersProvider, ReadmeProvider};
pub use convention::MergeConventionProvider;
pub use deletion::{ClassicProtectionsProvider, DeletionStatusProvider};
pub use final_baseline::FinalMergeBaselineProvider;
pub use merge_methods::EffectiveMergeMethodsProvider;
pub use metadata::MetadataProvider;
pub use org_baseline::OrgMergeBaselineProvider;
pub use protection::DefaultBranchProtectionProvider;
pub use rules::{AllRulesetsProvider, EffectiveRulesProvider};
pub use scanned::ScannedReposProvider;

use once_cell::sync::Lazy;
use repolens_budget::RequestBudget;
use repolens_primitives::{keys, DependencyValue, Params, RepoIdentity};
use repolens_resolve::{ProviderRegistry, ResolveCtx, ResolveError, Resolver};
use repolens_remote::RemoteResult;
use std::sync::Arc;

static DEFAULT_REGISTRY: Lazy<Arc<ProviderRegistry>> = Lazy::new(|| Arc::new(build_registry()));

/// The process-wide registry holding every built-in provider.
pub fn default_registry() -> Arc<ProviderRegistry> {
    Arc::clone(&DEFAULT_REGISTRY)
}

/// Composes a fresh registry with every built-in provider.
///
/// Tests that need bespoke provider sets build their own
/// [`ProviderRegistry`] instead.
pub fn build_registry() -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    registry.register(Arc::new(MetadataProvider));
    registry.register(Arc::new(DefaultBranchProtectionProvider));
    registry.register(Arc::new(CodeownersProvider));
    registry.register(Arc::new(ReadmeProvider));
    registry.register(Arc::new(EffectiveRulesProvider));
    registry.register(Arc::new(ClassicProtectionsProvider));
    registry.register(Arc::new(DeletionStatusProvider));
    registry.register(Arc::new(AllRulesetsProvider));
    registry.register(Arc::new(EffectiveMergeMethodsProvider));
    registry.register(Arc::new(OrgMergeBaselineProvider));
    registry.register(Arc::new(MergeConventionProvider));
    registry.register(Arc::new(FinalMergeBaselineProvider));
    registry.register(Arc::new(ScannedReposProvider));
    registry
}

/// Feeds a remote outcome's rate-limit headers to the budget.
///
/// Must run before the error is inspected: 4xx/5xx responses carry
/// rate-limit headers too.
pub(crate) fn observe<T>(budget: &RequestBudget, outcome: &RemoteResult<T>) {
    match outcome {
        Ok(fetched) => budget.observe(fetched.response.headers()),
        Err(err) => {
            if let Some(response) = err.response() {
                budget.observe(response.headers());
            }
        }
    }
}

/// The default branch of `repo`, resolving `repo.metadata` when the identity
/// does not carry one.
pub(crate) async fn default_branch(
    ctx: &ResolveCtx,
    repo: &RepoIdentity,
    resolver: &Resolver,
) -> Result<String, ResolveError> {
    if let Some(branch) = repo.default_branch.as_deref().filter(|b| !b.is_empty()) {
        return Ok(branch.to_owned());
    }
    let value = resolver.resolve(ctx, repo, keys::REPO_METADATA, &Params::new()).await?;
    let meta =
        value.as_metadata().ok_or_else(|| unexpected_value(keys::REPO_METADATA, &value))?;
    if meta.default_branch.is_empty() {
        return Err(ResolveError::DefaultBranchUnresolved(repo.full_name.clone()));
    }
    Ok(meta.default_branch.clone())
}

/// Error for a dependency that materialized with an unexpected variant.
pub(crate) fn unexpected_value(key: &str, value: &DependencyValue) -> ResolveError {
    ResolveError::Decode(format!(
        "dependency `{key}` produced an unexpected `{}` value",
        value.kind()
    ))
}
