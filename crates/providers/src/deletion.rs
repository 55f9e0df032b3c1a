use crate::{observe, unexpected_value};
use async_trait::async_trait;
use repolens_primitives::{
    dedupe_scopes, keys, ClassicProtectionRule, DeletionScope, DeletionStatus, DependencyValue,
    FetchScope, Params, RepoIdentity, RulesetEnforcement, RulesetRule, RulesetTarget,
    ALL_REFS_SCOPE,
};
use repolens_remote::RemoteClient;
use repolens_resolve::{DependencyProvider, ResolveCtx, ResolveError, Resolver};
use serde::Deserialize;

/// Paginated query for the classic protection rules of a repository.
const CLASSIC_RULES_QUERY: &str = "\
query($owner: String!, $name: String!, $cursor: String) {
  repository(owner: $owner, name: $name) {
    branchProtectionRules(first: 100, after: $cursor) {
      nodes { pattern allowsDeletions }
      pageInfo { hasNextPage endCursor }
    }
  }
}";

/// At most this many deletion scopes are collected across both sources.
const DELETION_SCOPE_CAP: usize = 50;

#[derive(Debug, Deserialize)]
struct ClassicRulesData {
    repository: Option<RepositoryNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryNode {
    branch_protection_rules: RuleConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RuleConnection {
    #[serde(default)]
    nodes: Vec<ClassicProtectionRule>,
    page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    #[serde(default)]
    has_next_page: bool,
    #[serde(default)]
    end_cursor: Option<String>,
}

/// Serves `repo.classic_branch_protections`: every classic protection rule
/// of the repository, collected over the paginated GraphQL listing.
#[derive(Clone, Copy, Debug, Default)]
pub struct ClassicProtectionsProvider;

#[async_trait]
impl DependencyProvider for ClassicProtectionsProvider {
    fn key(&self) -> &'static str {
        keys::REPO_CLASSIC_BRANCH_PROTECTIONS
    }

    fn scope(&self) -> FetchScope {
        FetchScope::Repo
    }

    async fn fetch(
        &self,
        ctx: &ResolveCtx,
        repo: &RepoIdentity,
        _params: &Params,
        resolver: &Resolver,
    ) -> Result<DependencyValue, ResolveError> {
        let mut rules = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            resolver.budget().acquire(ctx.cancellation(), 1).await?;
            let variables = serde_json::json!({
                "owner": repo.owner,
                "name": repo.name,
                "cursor": cursor,
            });
            let outcome = resolver.remote().graphql(CLASSIC_RULES_QUERY, variables).await;
            observe(resolver.budget(), &outcome);
            let page: ClassicRulesData = serde_json::from_value(outcome?.into_value())
                .map_err(|err| {
                    ResolveError::Decode(format!("classic protection rules payload: {err}"))
                })?;
            let connection = page
                .repository
                .ok_or_else(|| {
                    ResolveError::Decode(
                        "classic protection rules payload carries no repository".to_owned(),
                    )
                })?
                .branch_protection_rules;
            rules.extend(connection.nodes);
            if !connection.page_info.has_next_page {
                break;
            }
            cursor = connection.page_info.end_cursor;
            if cursor.is_none() {
                break;
            }
        }
        Ok(DependencyValue::ClassicProtections(rules))
    }
}

/// Serves `repo.protected_branches.deletion_status`.
///
/// Scopes come from two sources: classic protection rules (deletion is
/// blocked when `allowsDeletions` is false) and active branch-targeting
/// rulesets whose detail carries a `deletion` rule. Records are merged by
/// normalized pattern; collection stops at [`DELETION_SCOPE_CAP`] scopes.
#[derive(Clone, Copy, Debug, Default)]
pub struct DeletionStatusProvider;

#[async_trait]
impl DependencyProvider for DeletionStatusProvider {
    fn key(&self) -> &'static str {
        keys::REPO_PROTECTED_BRANCHES_DELETION_STATUS
    }

    fn scope(&self) -> FetchScope {
        FetchScope::Repo
    }

    async fn fetch(
        &self,
        ctx: &ResolveCtx,
        repo: &RepoIdentity,
        _params: &Params,
        resolver: &Resolver,
    ) -> Result<DependencyValue, ResolveError> {
        let mut raw: Vec<DeletionScope> = Vec::new();
        let mut truncated = false;

        let classic_value = resolver
            .resolve(ctx, repo, keys::REPO_CLASSIC_BRANCH_PROTECTIONS, &Params::new())
            .await?;
        let classic = classic_value
            .as_classic_protection_rules()
            .ok_or_else(|| unexpected_value(keys::REPO_CLASSIC_BRANCH_PROTECTIONS, &classic_value))?;
        for rule in classic {
            if raw.len() >= DELETION_SCOPE_CAP {
                truncated = true;
                break;
            }
            raw.push(DeletionScope::new(
                rule.pattern.clone(),
                !rule.allows_deletions,
                "classic-branch-protection",
                format!("allowsDeletions={}", rule.allows_deletions),
            ));
        }

        if !truncated {
            truncated = self.collect_ruleset_scopes(ctx, repo, resolver, &mut raw).await?;
        }

        Ok(DependencyValue::DeletionStatus(DeletionStatus {
            scopes: dedupe_scopes(raw),
            truncated,
        }))
    }
}

impl DeletionStatusProvider {
    /// Appends one scope per include pattern of every active branch ruleset,
    /// fetching each ruleset's detail to check for a `deletion` rule.
    /// Returns whether the scope cap stopped collection.
    async fn collect_ruleset_scopes(
        &self,
        ctx: &ResolveCtx,
        repo: &RepoIdentity,
        resolver: &Resolver,
        raw: &mut Vec<DeletionScope>,
    ) -> Result<bool, ResolveError> {
        let rulesets_value =
            resolver.resolve(ctx, repo, keys::REPO_ALL_RULESETS, &Params::new()).await?;
        let rulesets = rulesets_value
            .as_rulesets()
            .ok_or_else(|| unexpected_value(keys::REPO_ALL_RULESETS, &rulesets_value))?;

        for listed in rulesets {
            if listed.enforcement != RulesetEnforcement::Active
                || !matches!(listed.target, None | Some(RulesetTarget::Branch))
            {
                continue;
            }
            if raw.len() >= DELETION_SCOPE_CAP {
                return Ok(true);
            }

            resolver.budget().acquire(ctx.cancellation(), 1).await?;
            let outcome =
                resolver.remote().ruleset(&repo.owner, &repo.name, listed.id, true).await;
            observe(resolver.budget(), &outcome);
            let detail = outcome?.into_value();

            let blocks = detail.rules.iter().any(|rule| matches!(rule, RulesetRule::Deletion));
            let source = format!("ruleset:{}", detail.name);
            let note = format!("id={}", detail.id);
            let includes: Vec<String> = detail
                .conditions
                .as_ref()
                .and_then(|c| c.ref_name.as_ref())
                .map(|r| r.include.clone())
                .unwrap_or_default();

            if includes.is_empty() {
                raw.push(DeletionScope::new(ALL_REFS_SCOPE, blocks, source, note));
            } else {
                for pattern in includes {
                    if raw.len() >= DELETION_SCOPE_CAP {
                        return Ok(true);
                    }
                    raw.push(DeletionScope::new(pattern, blocks, source.clone(), note.clone()));
                }
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{repo, resolver};
    use repolens_primitives::{RefNameCondition, Ruleset, RulesetConditions};
    use repolens_remote::test_utils::MockRemoteClient;
    use serde_json::json;
    use std::sync::Arc;

    fn graphql_page(nodes: serde_json::Value, next: Option<&str>) -> serde_json::Value {
        json!({
            "repository": {
                "branchProtectionRules": {
                    "nodes": nodes,
                    "pageInfo": {
                        "hasNextPage": next.is_some(),
                        "endCursor": next,
                    },
                }
            }
        })
    }

    fn deletion_ruleset(id: u64, name: &str, include: Vec<&str>) -> Ruleset {
        Ruleset {
            id,
            name: name.to_owned(),
            enforcement: RulesetEnforcement::Active,
            target: Some(RulesetTarget::Branch),
            conditions: Some(RulesetConditions {
                ref_name: Some(RefNameCondition {
                    include: include.into_iter().map(str::to_owned).collect(),
                    exclude: Vec::new(),
                }),
            }),
            rules: vec![RulesetRule::Deletion],
        }
    }

    #[tokio::test]
    async fn classic_rules_paginate() {
        let mock = Arc::new(
            MockRemoteClient::new()
                .push_graphql(graphql_page(
                    json!([{ "pattern": "main", "allowsDeletions": false }]),
                    Some("CURSOR"),
                ))
                .push_graphql(graphql_page(
                    json!([{ "pattern": "release/*", "allowsDeletions": true }]),
                    None,
                )),
        );
        let resolver = resolver(Arc::clone(&mock));

        let value = resolver
            .resolve(
                &ResolveCtx::new(),
                &repo(),
                keys::REPO_CLASSIC_BRANCH_PROTECTIONS,
                &Params::new(),
            )
            .await
            .unwrap();
        let rules = value.as_classic_protection_rules().unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].pattern, "main");
        assert!(!rules[0].allows_deletions);
        assert_eq!(mock.calls().graphql, 2);
        // One budget token per page.
        assert_eq!(resolver.budget().remaining(), 4998);
    }

    #[tokio::test]
    async fn malformed_graphql_payload_is_a_decode_failure() {
        let mock =
            Arc::new(MockRemoteClient::new().push_graphql(json!({ "repository": null })));
        let resolver = resolver(mock);

        let err = resolver
            .resolve(
                &ResolveCtx::new(),
                &repo(),
                keys::REPO_CLASSIC_BRANCH_PROTECTIONS,
                &Params::new(),
            )
            .await
            .unwrap_err();
        assert_matches::assert_matches!(err, ResolveError::Decode(_));
    }

    #[tokio::test]
    async fn classic_and_ruleset_scopes_merge_by_normalized_pattern() {
        let mock = Arc::new(
            MockRemoteClient::new()
                .push_graphql(graphql_page(
                    json!([{ "pattern": "main", "allowsDeletions": false }]),
                    None,
                ))
                .with_repo_rulesets(
                    "octo/widgets",
                    vec![deletion_ruleset(1, "X", vec!["refs/heads/main"])],
                )
                .with_ruleset_detail(
                    "octo/widgets",
                    deletion_ruleset(1, "X", vec!["refs/heads/main"]),
                ),
        );
        let resolver = resolver(Arc::clone(&mock));

        let value = resolver
            .resolve(
                &ResolveCtx::new(),
                &repo(),
                keys::REPO_PROTECTED_BRANCHES_DELETION_STATUS,
                &Params::new(),
            )
            .await
            .unwrap();
        let status = value.as_deletion_status().unwrap();
        assert!(!status.truncated);
        assert_eq!(status.scopes.len(), 1);
        let scope = &status.scopes[0];
        assert_eq!(scope.display_name, "main");
        assert!(scope.blocked);
        assert_eq!(scope.source, "classic-branch-protection, ruleset:X");
        assert_eq!(scope.detail, "allowsDeletions=false; id=1");
    }

    #[tokio::test]
    async fn ruleset_without_includes_records_a_broad_scope() {
        let mut no_condition = deletion_ruleset(4, "blanket", vec![]);
        no_condition.conditions = None;
        let mock = Arc::new(
            MockRemoteClient::new()
                .push_graphql(graphql_page(json!([]), None))
                .with_repo_rulesets("octo/widgets", vec![no_condition.clone()])
                .with_ruleset_detail("octo/widgets", no_condition),
        );
        let resolver = resolver(Arc::clone(&mock));

        let value = resolver
            .resolve(
                &ResolveCtx::new(),
                &repo(),
                keys::REPO_PROTECTED_BRANCHES_DELETION_STATUS,
                &Params::new(),
            )
            .await
            .unwrap();
        let status = value.as_deletion_status().unwrap();
        assert_eq!(status.scopes.len(), 1);
        assert_eq!(status.scopes[0].display_name, ALL_REFS_SCOPE);
        assert!(status.scopes[0].blocked);
    }

    #[tokio::test]
    async fn inactive_and_tag_rulesets_are_skipped_without_detail_fetches() {
        let inactive = Ruleset {
            enforcement: RulesetEnforcement::Disabled,
            ..deletion_ruleset(5, "off", vec!["refs/heads/main"])
        };
        let tags = Ruleset {
            target: Some(RulesetTarget::Tag),
            ..deletion_ruleset(6, "tags", vec!["refs/tags/*"])
        };
        let mock = Arc::new(
            MockRemoteClient::new()
                .push_graphql(graphql_page(json!([]), None))
                .with_repo_rulesets("octo/widgets", vec![inactive, tags]),
        );
        let resolver = resolver(Arc::clone(&mock));

        let value = resolver
            .resolve(
                &ResolveCtx::new(),
                &repo(),
                keys::REPO_PROTECTED_BRANCHES_DELETION_STATUS,
                &Params::new(),
            )
            .await
            .unwrap();
        let status = value.as_deletion_status().unwrap();
        assert!(status.scopes.is_empty());
        assert_eq!(mock.calls().ruleset, 0);
    }

    #[tokio::test]
    async fn scope_cap_truncates_deterministically() {
        // 60 classic patterns: collection stops at 50 and flags truncation.
        let nodes: Vec<_> = (0..60)
            .map(|i| json!({ "pattern": format!("branch{i:02}"), "allowsDeletions": false }))
            .collect();
        let mock = Arc::new(
            MockRemoteClient::new().push_graphql(graphql_page(json!(nodes), None)),
        );
        let resolver = resolver(Arc::clone(&mock));

        let value = resolver
            .resolve(
                &ResolveCtx::new(),
                &repo(),
                keys::REPO_PROTECTED_BRANCHES_DELETION_STATUS,
                &Params::new(),
            )
            .await
            .unwrap();
        let status = value.as_deletion_status().unwrap();
        assert!(status.truncated);
        assert_eq!(status.scopes.len(), DELETION_SCOPE_CAP);
        assert_eq!(status.scopes[0].display_name, "branch00");
        assert_eq!(status.scopes[49].display_name, "branch49");
        // Source B is not consulted once the cap is hit.
        assert_eq!(mock.calls().repo_rulesets, 0);
    }
}
