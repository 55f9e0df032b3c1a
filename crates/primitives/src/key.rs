use std::collections::BTreeMap;

/// Whether a dependency key varies per repository or per organization.
///
/// The scope decides which identity components are folded into the request
/// fingerprint: org-scoped keys use only the owner, repo-scoped keys use
/// `owner/name`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum FetchScope {
    /// The value is specific to a single repository.
    Repo,
    /// The value is shared by every repository of an organization.
    Org,
}

/// Free-form provider parameters.
///
/// Keys and values are opaque to the resolver; the ordered map makes the
/// fingerprint independent of insertion order.
pub type Params = BTreeMap<String, String>;

/// Catalog of the dependency keys served by the built-in providers.
pub mod keys {
    /// Repository metadata (default branch, merge toggles).
    pub const REPO_METADATA: &str = "repo.metadata";
    /// Classic branch protection of the default branch.
    pub const REPO_DEFAULT_BRANCH_PROTECTION_CLASSIC: &str =
        "repo.default_branch.protection.classic";
    /// CODEOWNERS presence on the default branch.
    pub const REPO_DEFAULT_BRANCH_CODEOWNERS: &str = "repo.default_branch.codeowners";
    /// README presence on the default branch.
    pub const REPO_DEFAULT_BRANCH_README: &str = "repo.default_branch.readme";
    /// Rules effective on the default branch.
    pub const REPO_DEFAULT_BRANCH_EFFECTIVE_RULES: &str = "repo.default_branch.effective_rules";
    /// All classic branch-protection rules of the repository.
    pub const REPO_CLASSIC_BRANCH_PROTECTIONS: &str = "repo.classic_branch_protections";
    /// Deletion protections aggregated across classic rules and rulesets.
    pub const REPO_PROTECTED_BRANCHES_DELETION_STATUS: &str =
        "repo.protected_branches.deletion_status";
    /// Every ruleset that applies to the repository, parents included.
    pub const REPO_ALL_RULESETS: &str = "repo.all_rulesets";
    /// Merge methods still allowed once rulesets are applied.
    pub const REPO_EFFECTIVE_MERGE_METHODS: &str = "repo.effective_merge_methods";
    /// Merge baseline derived from organization rulesets.
    pub const ORG_MERGE_BASELINE: &str = "org.merge_baseline";
    /// Merge baseline derived from the convention among scanned repos.
    pub const REPOS_MERGE_CONVENTION: &str = "repos.merge_convention";
    /// The injected discovery result.
    pub const REPOS_SCANNED: &str = "repos.scanned";
    /// Final merge baseline (organization ruleset first, convention second).
    pub const MERGE_BASELINE: &str = "merge.baseline";
}
