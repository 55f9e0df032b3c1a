use crate::unexpected_value;
use async_trait::async_trait;
use itertools::Itertools;
use repolens_primitives::{
    keys, BaselineSource, BaselineState, DependencyValue, FetchScope, MergeBaseline,
    MergeMethodMask, Params, RepoIdentity,
};
use repolens_resolve::{DependencyProvider, ResolveCtx, ResolveError, Resolver};
use std::collections::BTreeMap;

/// How many scanned repositories are sampled for the convention.
const SAMPLE_SIZE: usize = 10;

/// Serves `repos.merge_convention`: the dominant merge-method configuration
/// among a fixed sample of scanned repositories.
///
/// The sample is the top [`SAMPLE_SIZE`] repositories ordered by lowercased
/// `owner/name` descending, so the selection is stable across runs
/// regardless of discovery order.
#[derive(Clone, Copy, Debug, Default)]
pub struct MergeConventionProvider;

#[async_trait]
impl DependencyProvider for MergeConventionProvider {
    fn key(&self) -> &'static str {
        keys::REPOS_MERGE_CONVENTION
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

        let sample: Vec<RepoIdentity> = scanned
            .iter()
            .cloned()
            .sorted_by(|a, b| b.full_name.to_lowercase().cmp(&a.full_name.to_lowercase()))
            .take(SAMPLE_SIZE)
            .collect();

        let mut evidence = Vec::new();
        // Tally keyed by raw mask bits; BTreeMap keeps iteration stable.
        let mut tally: BTreeMap<u8, usize> = BTreeMap::new();
        for sampled in &sample {
            let mask = match sampled.merge_settings {
                Some(settings) => settings.mask(),
                None => {
                    let value = resolver
                        .resolve(ctx, sampled, keys::REPO_METADATA, &Params::new())
                        .await?;
                    value
                        .as_metadata()
                        .ok_or_else(|| unexpected_value(keys::REPO_METADATA, &value))?
                        .merge_settings
                        .mask()
                }
            };
            if mask.is_empty() {
                evidence.push(format!("{}: no merge methods enabled, skipped", sampled.full_name));
                continue;
            }
            evidence.push(format!("{}: {mask}", sampled.full_name));
            *tally.entry(mask.bits()).or_default() += 1;
        }

        if tally.is_empty() {
            evidence.push("no sampled repository contributed merge settings".to_owned());
            return Ok(DependencyValue::Baseline(MergeBaseline {
                state: BaselineState::None,
                source: BaselineSource::Convention,
                allowed: MergeMethodMask::empty(),
                evidence,
            }));
        }

        let baseline = match elect_winner(&tally) {
            Some((winner, count)) => {
                evidence.push(format!(
                    "convention `{winner}` holds for {count} of {} sampled repositories",
                    sample.len()
                ));
                MergeBaseline {
                    state: BaselineState::Set,
                    source: BaselineSource::Convention,
                    allowed: winner,
                    evidence,
                }
            }
            None => {
                evidence.push("tied merge configurations are incomparable".to_owned());
                MergeBaseline {
                    state: BaselineState::Conflict,
                    source: BaselineSource::Convention,
                    allowed: MergeMethodMask::empty(),
                    evidence,
                }
            }
        };
        Ok(DependencyValue::Baseline(baseline))
    }
}

/// Winner selection: highest count, then smallest population, then the mask
/// that is a subset of every other tied mask; `None` means conflict.
fn elect_winner(tally: &BTreeMap<u8, usize>) -> Option<(MergeMethodMask, usize)> {
    let top_count = *tally.values().max().expect("tally is non-empty");
    let tied: Vec<MergeMethodMask> = tally
        .iter()
        .filter(|(_, count)| **count == top_count)
        .map(|(bits, _)| MergeMethodMask::from_bits_truncate(*bits))
        .collect();
    if let [winner] = tied[..] {
        return Some((winner, top_count));
    }

    let smallest = tied.iter().map(|mask| mask.population()).min().expect("tied is non-empty");
    let narrowest: Vec<MergeMethodMask> =
        tied.iter().copied().filter(|mask| mask.population() == smallest).collect();
    if let [winner] = narrowest[..] {
        return Some((winner, top_count));
    }

    tied.iter()
        .copied()
        .find(|candidate| {
            tied.iter().all(|other| other == candidate || candidate.is_subset_of(*other))
        })
        .map(|winner| (winner, top_count))
}
