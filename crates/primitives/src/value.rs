use crate::{
    deletion::DeletionStatus,
    merge::{MergeBaseline, MergeMethodMask},
    protection::{BranchProtection, BranchRule, ClassicProtectionRule, FilePresence},
    repo::{RepoIdentity, RepoMetadata},
    ruleset::Ruleset,
};
use std::sync::Arc;

/// Materialized payload produced by a provider, one variant per logical
/// dependency value.
///
/// The resolver hands values out as `Arc<DependencyValue>`, so a cached value
/// resolved twice is pointer-equal across callers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DependencyValue {
    /// Repository metadata.
    Metadata(RepoMetadata),
    /// Classic protection of the default branch; `None` when unprotected.
    ClassicProtection(Option<BranchProtection>),
    /// CODEOWNERS presence on the default branch.
    Codeowners(FilePresence),
    /// README presence on the default branch.
    Readme(FilePresence),
    /// Rules effective on the default branch.
    EffectiveRules(Vec<BranchRule>),
    /// Classic protection rules of the whole repository.
    ClassicProtections(Vec<ClassicProtectionRule>),
    /// Aggregated deletion protections.
    DeletionStatus(DeletionStatus),
    /// Every ruleset applying to the repository.
    Rulesets(Vec<Ruleset>),
    /// Merge methods effective once rulesets are applied.
    MergeMethods(MergeMethodMask),
    /// A derived merge baseline.
    Baseline(MergeBaseline),
    /// The injected discovery result.
    ScannedRepos(Arc<[RepoIdentity]>),
}

impl DependencyValue {
    /// Short label of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Metadata(_) => "metadata",
            Self::ClassicProtection(_) => "classic_protection",
            Self::Codeowners(_) => "codeowners",
            Self::Readme(_) => "readme",
            Self::EffectiveRules(_) => "effective_rules",
            Self::ClassicProtections(_) => "classic_protections",
            Self::DeletionStatus(_) => "deletion_status",
            Self::Rulesets(_) => "rulesets",
            Self::MergeMethods(_) => "merge_methods",
            Self::Baseline(_) => "baseline",
            Self::ScannedRepos(_) => "scanned_repos",
        }
    }

    /// Repository metadata, if that is what this value holds.
    pub fn as_metadata(&self) -> Option<&RepoMetadata> {
        match self {
            Self::Metadata(meta) => Some(meta),
            _ => None,
        }
    }

    /// Classic default-branch protection, if that is what this value holds.
    pub fn as_classic_protection(&self) -> Option<Option<&BranchProtection>> {
        match self {
            Self::ClassicProtection(protection) => Some(protection.as_ref()),
            _ => None,
        }
    }

    /// File presence, for the codeowners and readme variants.
    pub fn as_file_presence(&self) -> Option<&FilePresence> {
        match self {
            Self::Codeowners(presence) | Self::Readme(presence) => Some(presence),
            _ => None,
        }
    }

    /// Effective branch rules, if that is what this value holds.
    pub fn as_branch_rules(&self) -> Option<&[BranchRule]> {
        match self {
            Self::EffectiveRules(rules) => Some(rules),
            _ => None,
        }
    }

    /// Classic protection rules, if that is what this value holds.
    pub fn as_classic_protection_rules(&self) -> Option<&[ClassicProtectionRule]> {
        match self {
            Self::ClassicProtections(rules) => Some(rules),
            _ => None,
        }
    }

    /// Deletion status, if that is what this value holds.
    pub fn as_deletion_status(&self) -> Option<&DeletionStatus> {
        match self {
            Self::DeletionStatus(status) => Some(status),
            _ => None,
        }
    }

    /// Ruleset list, if that is what this value holds.
    pub fn as_rulesets(&self) -> Option<&[Ruleset]> {
        match self {
            Self::Rulesets(rulesets) => Some(rulesets),
            _ => None,
        }
    }

    /// Merge-method mask, if that is what this value holds.
    pub fn as_merge_methods(&self) -> Option<MergeMethodMask> {
        match self {
            Self::MergeMethods(mask) => Some(*mask),
            _ => None,
        }
    }

    /// Merge baseline, if that is what this value holds.
    pub fn as_baseline(&self) -> Option<&MergeBaseline> {
        match self {
            Self::Baseline(baseline) => Some(baseline),
            _ => None,
        }
    }

    /// Scanned repository set, if that is what this value holds.
    pub fn as_scanned_repos(&self) -> Option<&Arc<[RepoIdentity]>> {
        match self {
            Self::ScannedRepos(repos) => Some(repos),
            _ => None,
        }
    }
}
