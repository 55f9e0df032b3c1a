use crate::merge::MergeMethodMask;
use serde::{Deserialize, Serialize};

/// Merge-method toggles as advertised on the repository object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeSettings {
    /// Merge commits are enabled.
    #[serde(default)]
    pub allow_merge_commit: bool,
    /// Squash merges are enabled.
    #[serde(default)]
    pub allow_squash_merge: bool,
    /// Rebase merges are enabled.
    #[serde(default)]
    pub allow_rebase_merge: bool,
}

impl MergeSettings {
    /// The toggles folded into a mask.
    pub fn mask(&self) -> MergeMethodMask {
        let mut mask = MergeMethodMask::empty();
        if self.allow_merge_commit {
            mask |= MergeMethodMask::MERGE;
        }
        if self.allow_squash_merge {
            mask |= MergeMethodMask::SQUASH;
        }
        if self.allow_rebase_merge {
            mask |= MergeMethodMask::REBASE;
        }
        mask
    }
}

/// Identity of a repository in scope for an audit run.
///
/// Fingerprints use only `owner` (and `name` for repo-scoped keys); the
/// optional fields are carried so providers can skip a metadata round trip
/// when discovery already produced them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoIdentity {
    /// Account or organization that owns the repository.
    pub owner: String,
    /// Repository name.
    pub name: String,
    /// `owner/name` as reported by the service.
    pub full_name: String,
    /// Default branch, when discovery captured it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,
    /// Merge toggles, when discovery captured them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_settings: Option<MergeSettings>,
}

impl RepoIdentity {
    /// Builds an identity from its owner and name.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        let owner = owner.into();
        let name = name.into();
        let full_name = format!("{owner}/{name}");
        Self { owner, name, full_name, default_branch: None, merge_settings: None }
    }

    /// Sets the known default branch.
    pub fn with_default_branch(mut self, branch: impl Into<String>) -> Self {
        self.default_branch = Some(branch.into());
        self
    }

    /// Sets the known merge toggles.
    pub fn with_merge_settings(mut self, settings: MergeSettings) -> Self {
        self.merge_settings = Some(settings);
        self
    }
}

/// Repository metadata as returned by the metadata endpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoMetadata {
    /// `owner/name` as reported by the service.
    pub full_name: String,
    /// Default branch name.
    pub default_branch: String,
    /// Merge toggles.
    #[serde(flatten)]
    pub merge_settings: MergeSettings,
    /// Whether the repository is archived.
    #[serde(default)]
    pub archived: bool,
    /// Whether the repository is private.
    #[serde(default)]
    pub private: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_fold_into_mask() {
        let settings = MergeSettings {
            allow_merge_commit: true,
            allow_squash_merge: false,
            allow_rebase_merge: true,
        };
        assert_eq!(
            settings.mask(),
            MergeMethodMask::MERGE | MergeMethodMask::REBASE
        );
        assert_eq!(MergeSettings::default().mask(), MergeMethodMask::empty());
    }

    #[test]
    fn identity_full_name() {
        let repo = RepoIdentity::new("Octo", "Widgets");
        assert_eq!(repo.full_name, "Octo/Widgets");
        assert_eq!(repo.default_branch, None);
    }

    #[test]
    fn metadata_decodes_flattened_toggles() {
        let meta: RepoMetadata = serde_json::from_str(
            r#"{
                "full_name": "octo/widgets",
                "default_branch": "main",
                "allow_merge_commit": true,
                "allow_squash_merge": true,
                "archived": false
            }"#,
        )
        .unwrap();
        assert_eq!(meta.default_branch, "main");
        assert_eq!(
            meta.merge_settings.mask(),
            MergeMethodMask::MERGE | MergeMethodMask::SQUASH
        );
        assert!(!meta.private);
    }
}
