//! Commonly used types for the repolens audit core.
//!
//! This crate holds the data model shared by the resolver, the budget, the
//! remote-client facade and the providers: repository identities, dependency
//! keys and scopes, the merge-method mask and derived baselines, deletion
//! scopes, and the serde models of the hosting service's ruleset and
//! protection payloads.

mod deletion;
mod key;
mod merge;
mod protection;
mod repo;
mod ruleset;
mod value;

pub use deletion::{dedupe_scopes, DeletionScope, DeletionStatus, ALL_REFS_SCOPE};
pub use key::{keys, FetchScope, Params};
pub use merge::{BaselineSource, BaselineState, MergeBaseline, MergeMethodMask};
pub use protection::{
    BranchProtection, BranchRule, ClassicProtectionRule, EnabledFlag, FileContent, FilePresence,
    RequiredPullRequestReviews, RequiredStatusChecks,
};
pub use repo::{MergeSettings, RepoIdentity, RepoMetadata};
pub use ruleset::{
    apply_rule_constraints, ref_condition_admits, ref_pattern_matches, ConstraintOutcome,
    MergeQueueParameters, PullRequestParameters, RefNameCondition, Ruleset, RulesetConditions,
    RulesetEnforcement, RulesetRule, RulesetTarget,
};
pub use value::DependencyValue;
