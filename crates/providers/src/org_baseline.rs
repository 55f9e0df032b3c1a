use crate::{observe, unexpected_value};
use async_trait::async_trait;
use repolens_primitives::{
    apply_rule_constraints, keys, BaselineSource, BaselineState, DependencyValue, FetchScope,
    MergeBaseline, MergeMethodMask, Params, RepoIdentity,
};
use repolens_remote::RemoteClient;
use repolens_resolve::{DependencyProvider, ResolveCtx, ResolveError, Resolver};
use std::collections::BTreeMap;

/// At most this many organization rulesets are considered, in input order.
const ORG_RULESET_CAP: usize = 100;

/// Serves `org.merge_baseline`: what the organization's active rulesets say
/// about allowed merge methods on the conventional default branch.
#[derive(Clone, Copy, Debug, Default)]
pub struct OrgMergeBaselineProvider;

#[async_trait]
impl DependencyProvider for OrgMergeBaselineProvider {
    fn key(&self) -> &'static str {
        keys::ORG_MERGE_BASELINE
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
        let scanned_value =
            resolver.resolve(ctx, repo, keys::REPOS_SCANNED, &Params::new()).await?;
        let scanned = scanned_value
            .as_scanned_repos()
            .ok_or_else(|| unexpected_value(keys::REPOS_SCANNED, &scanned_value))?;
        let target_ref = elect_target_ref(scanned);

        resolver.budget().acquire(ctx.cancellation(), 1).await?;
        let outcome = resolver.remote().org_rulesets(&repo.owner).await;
        observe(resolver.budget(), &outcome);
        let mut rulesets = outcome?.into_value();

        let mut evidence = vec![format!(
            "target ref `{target_ref}` elected from {} scanned repositories",
            scanned.len()
        )];
        if rulesets.len() > ORG_RULESET_CAP {
            rulesets.truncate(ORG_RULESET_CAP);
            evidence
                .push(format!("organization ruleset list truncated to {ORG_RULESET_CAP} entries"));
        }

        let applicable: Vec<_> =
            rulesets.iter().filter(|rs| rs.applies_to_ref(&target_ref)).collect();
        if applicable.is_empty() {
            evidence.push("no active organization ruleset targets the elected ref".to_owned());
            return Ok(DependencyValue::Baseline(MergeBaseline {
                state: BaselineState::None,
                source: BaselineSource::OrganizationRuleset,
                allowed: MergeMethodMask::empty(),
                evidence,
            }));
        }

        let mut mask = MergeMethodMask::all();
        let mut constrained = false;
        for ruleset in &applicable {
            let out = apply_rule_constraints(mask, &ruleset.rules);
            if out.constrained {
                constrained = true;
                evidence.push(format!(
                    "ruleset `{}` narrows allowed methods to `{}`",
                    ruleset.name, out.mask
                ));
            }
            mask = out.mask;
        }

        let baseline = if !constrained {
            evidence.push("matching rulesets carry no merge-method constraints".to_owned());
            MergeBaseline {
                state: BaselineState::None,
                source: BaselineSource::OrganizationRuleset,
                allowed: MergeMethodMask::empty(),
                evidence,
            }
        } else if mask.is_empty() {
            evidence.push("organization rulesets leave no merge method allowed".to_owned());
            MergeBaseline {
                state: BaselineState::Conflict,
                source: BaselineSource::OrganizationRuleset,
                allowed: mask,
                evidence,
            }
        } else {
            MergeBaseline {
                state: BaselineState::Set,
                source: BaselineSource::OrganizationRuleset,
                allowed: mask,
                evidence,
            }
        };
        Ok(DependencyValue::Baseline(baseline))
    }
}

/// The ref organization rulesets are matched against: the most common
/// default branch among the scanned repositories, ties broken by
/// lexicographic order, `refs/heads/main` when nothing contributes.
fn elect_target_ref(scanned: &[RepoIdentity]) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for repo in scanned {
        if let Some(branch) = repo.default_branch.as_deref().filter(|b| !b.is_empty()) {
            *counts.entry(branch).or_default() += 1;
        }
    }
    let winner = counts
        .into_iter()
        .max_by(|(name_a, count_a), (name_b, count_b)| {
            // Higher count wins; on ties the lexicographically smaller name.
            count_a.cmp(count_b).then_with(|| name_b.cmp(name_a))
        })
        .map(|(name, _)| name)
        .unwrap_or("main");
    format!("refs/heads/{winner}")
}
