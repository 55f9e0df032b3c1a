use std::collections::{hash_map::Entry, HashMap};

/// Broad scope recorded when a protection source has no include patterns.
pub const ALL_REFS_SCOPE: &str = "<all-refs>";

/// Deletion-protection verdict for one branch scope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeletionScope {
    /// Branch pattern or [`ALL_REFS_SCOPE`].
    pub display_name: String,
    /// Whether deletion is blocked for the scope.
    pub blocked: bool,
    /// Protection source label, e.g. `classic-branch-protection` or
    /// `ruleset:<name>`.
    pub source: String,
    /// Human-readable detail backing the verdict.
    pub detail: String,
}

impl DeletionScope {
    /// Builds a scope record.
    pub fn new(
        display_name: impl Into<String>,
        blocked: bool,
        source: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            blocked,
            source: source.into(),
            detail: detail.into(),
        }
    }
}

/// Aggregated deletion protections of a repository.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeletionStatus {
    /// Deduplicated scopes in first-insertion order.
    pub scopes: Vec<DeletionScope>,
    /// Whether collection stopped at the scope cap.
    pub truncated: bool,
}

fn normalize_pattern(pattern: &str) -> &str {
    pattern.strip_prefix("refs/heads/").unwrap_or(pattern)
}

/// Merges raw scopes by normalized pattern.
///
/// `refs/heads/main` and `main` are the same scope. Merged records OR the
/// `blocked` flags, join sources with `", "` and details with `"; "`, and
/// keep first-insertion order.
pub fn dedupe_scopes(scopes: Vec<DeletionScope>) -> Vec<DeletionScope> {
    let mut order: Vec<String> = Vec::new();
    let mut merged: HashMap<String, DeletionScope> = HashMap::new();
    for scope in scopes {
        let key = normalize_pattern(&scope.display_name).to_owned();
        match merged.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                let existing = entry.get_mut();
                existing.blocked |= scope.blocked;
                existing.source.push_str(", ");
                existing.source.push_str(&scope.source);
                existing.detail.push_str("; ");
                existing.detail.push_str(&scope.detail);
            }
            Entry::Vacant(entry) => {
                entry.insert(DeletionScope { display_name: key.clone(), ..scope });
                order.push(key);
            }
        }
    }
    order
        .into_iter()
        .map(|key| merged.remove(&key).expect("every ordered key was inserted"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    #[test]
    fn merges_prefixed_and_bare_patterns() {
        let scopes = vec![
            DeletionScope::new("main", true, "classic-branch-protection", "allowsDeletions=false"),
            DeletionScope::new("refs/heads/main", true, "ruleset:X", "id=1"),
        ];
        let merged = dedupe_scopes(scopes);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].display_name, "main");
        assert!(merged[0].blocked);
        assert_eq!(merged[0].source, "classic-branch-protection, ruleset:X");
        assert_eq!(merged[0].detail, "allowsDeletions=false; id=1");
    }

    #[test]
    fn blocked_is_or_of_inputs() {
        let merged = dedupe_scopes(vec![
            DeletionScope::new("release/*", false, "ruleset:A", "no deletion rule"),
            DeletionScope::new("refs/heads/release/*", true, "ruleset:B", "deletion rule"),
        ]);
        assert_eq!(merged.len(), 1);
        assert!(merged[0].blocked);
    }

    #[test]
    fn preserves_first_insertion_order() {
        let merged = dedupe_scopes(vec![
            DeletionScope::new("zeta", true, "s1", "d1"),
            DeletionScope::new("alpha", false, "s2", "d2"),
            DeletionScope::new("refs/heads/zeta", false, "s3", "d3"),
        ]);
        let names: Vec<_> = merged.iter().map(|s| s.display_name.as_str()).collect();
        assert_eq!(names, ["zeta", "alpha"]);
    }

    #[test]
    fn distinct_patterns_stay_distinct() {
        let merged = dedupe_scopes(vec![
            DeletionScope::new("main", true, "s", "d"),
            DeletionScope::new("dev", false, "s", "d"),
        ]);
        assert_eq!(merged.len(), 2);
    }
}
