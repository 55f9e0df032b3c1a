use crate::merge::MergeMethodMask;
use serde::{Deserialize, Serialize};

/// Enforcement state of a ruleset.
///
/// Unknown states decode as [`RulesetEnforcement::Disabled`], which keeps
/// future server values from being treated as enforced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum RulesetEnforcement {
    /// The ruleset is enforced.
    Active,
    /// The ruleset runs in evaluate-only mode.
    Evaluate,
    /// The ruleset is disabled.
    #[default]
    Disabled,
}

impl From<String> for RulesetEnforcement {
    fn from(value: String) -> Self {
        if value.eq_ignore_ascii_case("active") {
            Self::Active
        } else if value.eq_ignore_ascii_case("evaluate") {
            Self::Evaluate
        } else {
            Self::Disabled
        }
    }
}

/// What kind of ref a ruleset targets. Unknown targets decode as
/// [`RulesetTarget::Other`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum RulesetTarget {
    /// Branch refs.
    Branch,
    /// Tag refs.
    Tag,
    /// Pushes regardless of ref.
    Push,
    /// A target this audit does not inspect.
    Other,
}

impl From<String> for RulesetTarget {
    fn from(value: String) -> Self {
        if value.eq_ignore_ascii_case("branch") {
            Self::Branch
        } else if value.eq_ignore_ascii_case("tag") {
            Self::Tag
        } else if value.eq_ignore_ascii_case("push") {
            Self::Push
        } else {
            Self::Other
        }
    }
}

/// Ref-name condition of a ruleset: include/exclude pattern lists.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefNameCondition {
    /// Patterns the ruleset applies to.
    #[serde(default)]
    pub include: Vec<String>,
    /// Patterns carved out of the include set.
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Conditions attached to a ruleset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesetConditions {
    /// Ref-name condition, when present.
    #[serde(default)]
    pub ref_name: Option<RefNameCondition>,
}

/// Parameters of a merge-queue rule.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeQueueParameters {
    /// Method the queue merges with, e.g. `SQUASH`.
    #[serde(default)]
    pub merge_method: Option<String>,
}

/// Parameters of a pull-request rule.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestParameters {
    /// Methods pull requests may merge with.
    #[serde(default)]
    pub allowed_merge_methods: Option<Vec<String>>,
}

/// A rule carried by a ruleset.
///
/// Only the kinds the audit inspects are typed; everything else decodes to
/// [`RulesetRule::Other`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RulesetRule {
    /// Deletion of matching refs is restricted.
    Deletion,
    /// A linear history is required, which rules out merge commits.
    RequiredLinearHistory,
    /// Merges go through a merge queue.
    MergeQueue {
        /// Queue parameters.
        #[serde(default)]
        parameters: Option<MergeQueueParameters>,
    },
    /// Pull requests are required.
    PullRequest {
        /// Pull-request parameters.
        #[serde(default)]
        parameters: Option<PullRequestParameters>,
    },
    /// A rule kind this audit does not inspect.
    #[serde(other)]
    Other,
}

/// Server-side policy object combining conditions (which refs) and rules
/// (which constraints).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ruleset {
    /// Ruleset id.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Enforcement state.
    #[serde(default)]
    pub enforcement: RulesetEnforcement,
    /// Targeted ref kind; absent means branch-like applicability.
    #[serde(default)]
    pub target: Option<RulesetTarget>,
    /// Attached conditions.
    #[serde(default)]
    pub conditions: Option<RulesetConditions>,
    /// Rules carried by the ruleset. Detail endpoints populate this; list
    /// endpoints may leave it empty.
    #[serde(default)]
    pub rules: Vec<RulesetRule>,
}

impl Ruleset {
    /// Whether this ruleset is live for branch refs and admits `target_ref`.
    pub fn applies_to_ref(&self, target_ref: &str) -> bool {
        self.enforcement == RulesetEnforcement::Active
            && matches!(self.target, None | Some(RulesetTarget::Branch))
            && ref_condition_admits(
                self.conditions.as_ref().and_then(|c| c.ref_name.as_ref()),
                target_ref,
            )
    }
}

/// Whether a single ruleset ref pattern matches `target_ref`.
///
/// `~ALL` matches everything; `~DEFAULT_BRANCH` matches any branch ref;
/// patterns ending in `/*` or `/**` match by prefix; anything else matches
/// exactly.
pub fn ref_pattern_matches(pattern: &str, target_ref: &str) -> bool {
    match pattern {
        "~ALL" => true,
        "~DEFAULT_BRANCH" => target_ref.starts_with("refs/heads/"),
        _ => {
            if let Some(prefix) = pattern.strip_suffix("**") {
                target_ref.starts_with(prefix)
            } else if let Some(prefix) = pattern.strip_suffix('*') {
                target_ref.starts_with(prefix)
            } else {
                pattern == target_ref
            }
        }
    }
}

/// Whether a ref-name condition admits `target_ref`.
///
/// A missing condition or an empty include list admits every ref; a matching
/// exclude pattern rejects regardless of includes.
pub fn ref_condition_admits(condition: Option<&RefNameCondition>, target_ref: &str) -> bool {
    let Some(condition) = condition else {
        return true;
    };
    if condition
        .exclude
        .iter()
        .any(|pattern| ref_pattern_matches(pattern, target_ref))
    {
        return false;
    }
    condition.include.is_empty()
        || condition
            .include
            .iter()
            .any(|pattern| ref_pattern_matches(pattern, target_ref))
}

/// Outcome of folding a ruleset's constraints into a mask.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConstraintOutcome {
    /// The mask after all constraints were applied.
    pub mask: MergeMethodMask,
    /// Whether any recognized constraint applied.
    pub constrained: bool,
}

/// Applies the merge-method constraints carried by `rules` to `mask`.
///
/// Every operation is an intersection or a bit clear, so application order
/// does not matter and re-application is a fixed point.
pub fn apply_rule_constraints(mask: MergeMethodMask, rules: &[RulesetRule]) -> ConstraintOutcome {
    let mut out = mask;
    let mut constrained = false;
    for rule in rules {
        match rule {
            RulesetRule::RequiredLinearHistory => {
                out.remove(MergeMethodMask::MERGE);
                constrained = true;
            }
            RulesetRule::MergeQueue { parameters } => {
                if let Some(method) = parameters
                    .as_ref()
                    .and_then(|p| p.merge_method.as_deref())
                    .and_then(MergeMethodMask::parse_method)
                {
                    out &= method;
                    constrained = true;
                }
            }
            RulesetRule::PullRequest { parameters } => {
                if let Some(allowed) = parameters
                    .as_ref()
                    .and_then(|p| p.allowed_merge_methods.as_ref())
                {
                    let union = allowed
                        .iter()
                        .filter_map(|name| MergeMethodMask::parse_method(name))
                        .fold(MergeMethodMask::empty(), |acc, m| acc | m);
                    out &= union;
                    constrained = true;
                }
            }
            RulesetRule::Deletion | RulesetRule::Other => {}
        }
    }
    ConstraintOutcome { mask: out, constrained }
}
