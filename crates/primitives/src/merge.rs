use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Set of merge strategies a repository accepts for pull requests.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct MergeMethodMask: u8 {
        /// Merge commits are allowed.
        const MERGE = 0b001;
        /// Squash merges are allowed.
        const SQUASH = 0b010;
        /// Rebase merges are allowed.
        const REBASE = 0b100;
    }
}

impl MergeMethodMask {
    /// Number of methods present in the mask.
    pub fn population(&self) -> u32 {
        self.bits().count_ones()
    }

    /// Whether every method in `self` is also in `other`.
    pub fn is_subset_of(&self, other: Self) -> bool {
        other.contains(*self)
    }

    /// Parses a single method name, case-insensitively.
    ///
    /// The service spells methods lowercase in ruleset pull-request
    /// parameters and uppercase in merge-queue parameters.
    pub fn parse_method(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "merge" => Some(Self::MERGE),
            "squash" => Some(Self::SQUASH),
            "rebase" => Some(Self::REBASE),
            _ => None,
        }
    }
}

impl fmt::Display for MergeMethodMask {
    /// Canonical form: the present methods in the fixed order
    /// `merge,squash,rebase`. The empty mask renders as the empty string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (flag, label) in [
            (Self::MERGE, "merge"),
            (Self::SQUASH, "squash"),
            (Self::REBASE, "rebase"),
        ] {
            if self.contains(flag) {
                if !first {
                    f.write_str(",")?;
                }
                f.write_str(label)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Outcome label of a derived merge baseline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum BaselineState {
    /// A concrete non-empty expectation was derived.
    Set,
    /// Nothing constrains merge methods at this level.
    None,
    /// Constraints exist but contradict each other.
    Conflict,
}

/// Where a merge baseline was derived from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum BaselineSource {
    /// Derived from active organization rulesets.
    OrganizationRuleset,
    /// Derived from the dominant configuration among scanned repositories.
    Convention,
    /// Derived from an explicitly required configuration.
    RequiredConfiguration,
}

/// A derived statement about which merge methods an organization or
/// convention expects, with supporting evidence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeBaseline {
    /// Outcome label.
    pub state: BaselineState,
    /// Derivation source.
    pub source: BaselineSource,
    /// Allowed methods when `state` is [`BaselineState::Set`].
    pub allowed: MergeMethodMask,
    /// Human-readable notes explaining the derivation.
    pub evidence: Vec<String>,
}

impl MergeBaseline {
    /// A baseline stating that nothing constrains merge methods.
    pub fn none(source: BaselineSource) -> Self {
        Self {
            state: BaselineState::None,
            source,
            allowed: MergeMethodMask::empty(),
            evidence: Vec::new(),
        }
    }

    /// Whether this baseline settles the question (`set` or `conflict`).
    pub fn is_decided(&self) -> bool {
        matches!(self.state, BaselineState::Set | BaselineState::Conflict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_enumerates_fixed_order() {
        assert_eq!(MergeMethodMask::empty().to_string(), "");
        assert_eq!(MergeMethodMask::MERGE.to_string(), "merge");
        assert_eq!(
            (MergeMethodMask::REBASE | MergeMethodMask::MERGE).to_string(),
            "merge,rebase"
        );
        assert_eq!(MergeMethodMask::all().to_string(), "merge,squash,rebase");
    }

    #[test]
    fn parse_method_is_case_insensitive() {
        assert_eq!(
            MergeMethodMask::parse_method("SQUASH"),
            Some(MergeMethodMask::SQUASH)
        );
        assert_eq!(
            MergeMethodMask::parse_method("merge"),
            Some(MergeMethodMask::MERGE)
        );
        assert_eq!(MergeMethodMask::parse_method("fast-forward"), None);
    }

    #[test]
    fn population_and_subset() {
        let ms = MergeMethodMask::MERGE | MergeMethodMask::SQUASH;
        assert_eq!(ms.population(), 2);
        assert!(MergeMethodMask::MERGE.is_subset_of(ms));
        assert!(!ms.is_subset_of(MergeMethodMask::MERGE));
        assert!(MergeMethodMask::empty().is_subset_of(MergeMethodMask::empty()));
    }

    #[test]
    fn baseline_labels() {
        assert_eq!(BaselineState::Set.to_string(), "set");
        assert_eq!(BaselineState::Conflict.to_string(), "conflict");
        assert_eq!(
            BaselineSource::OrganizationRuleset.to_string(),
            "organization_ruleset"
        );
        assert_eq!(
            BaselineSource::RequiredConfiguration.to_string(),
            "required_configuration"
        );
        assert!(!MergeBaseline::none(BaselineSource::Convention).is_decided());
    }
}
