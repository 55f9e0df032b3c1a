use serde::{Deserialize, Serialize};

/// `{ "enabled": bool }` wrapper used throughout protection payloads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnabledFlag {
    /// Whether the toggle is on.
    #[serde(default)]
    pub enabled: bool,
}

/// Required-review settings of a classic branch protection.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredPullRequestReviews {
    /// Number of approving reviews required.
    #[serde(default)]
    pub required_approving_review_count: u32,
    /// Whether code-owner review is required.
    #[serde(default)]
    pub require_code_owner_reviews: bool,
    /// Whether stale reviews are dismissed on push.
    #[serde(default)]
    pub dismiss_stale_reviews: bool,
}

/// Required status-check settings of a classic branch protection.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredStatusChecks {
    /// Whether branches must be up to date before merging.
    #[serde(default)]
    pub strict: bool,
    /// Required check contexts.
    #[serde(default)]
    pub contexts: Vec<String>,
}

/// Classic branch-protection payload for a single branch.
///
/// Only the fields the audit rules inspect are modeled; unknown fields are
/// ignored on decode.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchProtection {
    /// Whether administrators are subject to the protection.
    #[serde(default)]
    pub enforce_admins: Option<EnabledFlag>,
    /// Whether the branch may be deleted.
    #[serde(default)]
    pub allow_deletions: Option<EnabledFlag>,
    /// Whether force pushes are allowed.
    #[serde(default)]
    pub allow_force_pushes: Option<EnabledFlag>,
    /// Whether a linear history is required.
    #[serde(default)]
    pub required_linear_history: Option<EnabledFlag>,
    /// Review requirements, when configured.
    #[serde(default)]
    pub required_pull_request_reviews: Option<RequiredPullRequestReviews>,
    /// Status-check requirements, when configured.
    #[serde(default)]
    pub required_status_checks: Option<RequiredStatusChecks>,
}

/// One classic protection rule as listed over GraphQL: the branch pattern
/// plus its deletion toggle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassicProtectionRule {
    /// Branch name pattern the rule applies to.
    pub pattern: String,
    /// Whether matching branches may be deleted.
    #[serde(rename = "allowsDeletions")]
    pub allows_deletions: bool,
}

/// One entry of the per-branch rules listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchRule {
    /// Rule type label as reported by the service.
    #[serde(rename = "type")]
    pub kind: String,
    /// Ruleset the rule originates from, when reported.
    #[serde(default)]
    pub ruleset_id: Option<u64>,
}

/// Presence probe outcome for a well-known file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilePresence {
    /// Whether the file exists on the probed ref.
    pub present: bool,
    /// Path the file was found at, when present.
    pub path: Option<String>,
}

impl FilePresence {
    /// A probe that found the file at `path`.
    pub fn found(path: impl Into<String>) -> Self {
        Self { present: true, path: Some(path.into()) }
    }

    /// A probe that found nothing.
    pub fn missing() -> Self {
        Self { present: false, path: None }
    }
}

/// Content listing entry returned by the contents and readme endpoints.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContent {
    /// File name.
    #[serde(default)]
    pub name: String,
    /// Path relative to the repository root.
    pub path: String,
    /// Blob SHA, when reported.
    #[serde(default)]
    pub sha: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protection_decodes_partial_payload() {
        let protection: BranchProtection = serde_json::from_str(
            r#"{
                "allow_deletions": { "enabled": false },
                "required_pull_request_reviews": { "required_approving_review_count": 2 },
                "restrictions": null
            }"#,
        )
        .unwrap();
        assert_eq!(protection.allow_deletions, Some(EnabledFlag { enabled: false }));
        assert_eq!(
            protection
                .required_pull_request_reviews
                .unwrap()
                .required_approving_review_count,
            2
        );
        assert_eq!(protection.enforce_admins, None);
    }

    #[test]
    fn branch_rule_decodes_type_field() {
        let rule: BranchRule =
            serde_json::from_str(r#"{ "type": "deletion", "ruleset_id": 42 }"#).unwrap();
        assert_eq!(rule.kind, "deletion");
        assert_eq!(rule.ruleset_id, Some(42));
    }
}
