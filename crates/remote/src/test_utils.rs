//! Scripted in-memory [`RemoteClient`] for tests.

use crate::{Fetched, RemoteClient, RemoteError, RemoteResponse, RemoteResult};
use async_trait::async_trait;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use parking_lot::Mutex;
use repolens_primitives::{BranchProtection, BranchRule, FileContent, RepoMetadata, Ruleset};
use std::{
    collections::{HashMap, VecDeque},
    sync::atomic::{AtomicUsize, Ordering},
};

/// Snapshot of per-endpoint call counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct CallSnapshot {
    pub repo: usize,
    pub branch_protection: usize,
    pub branch_rules: usize,
    pub contents: usize,
    pub readme: usize,
    pub repo_rulesets: usize,
    pub ruleset: usize,
    pub org_rulesets: usize,
    pub graphql: usize,
}

impl CallSnapshot {
    /// Total remote calls across all endpoints.
    pub fn total(&self) -> usize {
        self.repo
            + self.branch_protection
            + self.branch_rules
            + self.contents
            + self.readme
            + self.repo_rulesets
            + self.ruleset
            + self.org_rulesets
            + self.graphql
    }
}

#[derive(Debug, Default)]
struct CallLog {
    repo: AtomicUsize,
    branch_protection: AtomicUsize,
    branch_rules: AtomicUsize,
    contents: AtomicUsize,
    readme: AtomicUsize,
    repo_rulesets: AtomicUsize,
    ruleset: AtomicUsize,
    org_rulesets: AtomicUsize,
    graphql: AtomicUsize,
}

/// In-memory [`RemoteClient`] backed by scripted payloads.
///
/// Build it with the `with_*` methods, share it as `Arc<MockRemoteClient>`,
/// and assert on [`MockRemoteClient::calls`] afterwards. Configured headers
/// are attached to every response, so budget observation paths see them on
/// hits, misses and failures alike.
#[derive(Debug, Default)]
pub struct MockRemoteClient {
    repos: Mutex<HashMap<String, RepoMetadata>>,
    protections: Mutex<HashMap<(String, String), BranchProtection>>,
    branch_rules: Mutex<HashMap<(String, String), Vec<BranchRule>>>,
    contents: Mutex<HashMap<(String, String), FileContent>>,
    readmes: Mutex<HashMap<String, FileContent>>,
    repo_rulesets: Mutex<HashMap<String, Vec<Ruleset>>>,
    ruleset_details: Mutex<HashMap<(String, u64), Ruleset>>,
    org_rulesets: Mutex<HashMap<String, Vec<Ruleset>>>,
    org_ruleset_statuses: Mutex<HashMap<String, StatusCode>>,
    graphql_pages: Mutex<VecDeque<serde_json::Value>>,
    failures: Mutex<HashMap<&'static str, StatusCode>>,
    headers: Mutex<HeaderMap>,
    calls: CallLog,
}

impl MockRemoteClient {
    /// An empty mock; every lookup misses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers repository metadata under its `full_name`.
    pub fn with_repo(self, meta: RepoMetadata) -> Self {
        self.repos.lock().insert(meta.full_name.clone(), meta);
        self
    }

    /// Registers a classic branch protection.
    pub fn with_branch_protection(
        self,
        repo: &str,
        branch: &str,
        protection: BranchProtection,
    ) -> Self {
        self.protections.lock().insert((repo.to_owned(), branch.to_owned()), protection);
        self
    }

    /// Registers the rules effective on a branch.
    pub fn with_branch_rules(self, repo: &str, branch: &str, rules: Vec<BranchRule>) -> Self {
        self.branch_rules.lock().insert((repo.to_owned(), branch.to_owned()), rules);
        self
    }

    /// Registers a file at `path`.
    pub fn with_content(self, repo: &str, path: &str) -> Self {
        self.contents.lock().insert(
            (repo.to_owned(), path.to_owned()),
            FileContent { name: path.rsplit('/').next().unwrap_or(path).to_owned(), path: path.to_owned(), sha: None },
        );
        self
    }

    /// Registers a README at `path`.
    pub fn with_readme(self, repo: &str, path: &str) -> Self {
        self.readmes.lock().insert(
            repo.to_owned(),
            FileContent { name: path.to_owned(), path: path.to_owned(), sha: None },
        );
        self
    }

    /// Registers the ruleset listing of a repository.
    pub fn with_repo_rulesets(self, repo: &str, rulesets: Vec<Ruleset>) -> Self {
        self.repo_rulesets.lock().insert(repo.to_owned(), rulesets);
        self
    }

    /// Registers a ruleset detail payload.
    pub fn with_ruleset_detail(self, repo: &str, ruleset: Ruleset) -> Self {
        self.ruleset_details.lock().insert((repo.to_owned(), ruleset.id), ruleset);
        self
    }

    /// Registers the ruleset listing of an organization.
    pub fn with_org_rulesets(self, owner: &str, rulesets: Vec<Ruleset>) -> Self {
        self.org_rulesets.lock().insert(owner.to_owned(), rulesets);
        self
    }

    /// Makes the org-ruleset listing answer with `status` (e.g. 403).
    pub fn with_org_ruleset_status(self, owner: &str, status: StatusCode) -> Self {
        self.org_ruleset_statuses.lock().insert(owner.to_owned(), status);
        self
    }

    /// Queues a GraphQL `data` payload; pages pop in FIFO order.
    pub fn push_graphql(self, data: serde_json::Value) -> Self {
        self.graphql_pages.lock().push_back(data);
        self
    }

    /// Makes `operation` fail with `status` on every call.
    pub fn with_failure(self, operation: &'static str, status: StatusCode) -> Self {
        self.failures.lock().insert(operation, status);
        self
    }

    /// Attaches a header to every response.
    pub fn with_header(self, name: &'static str, value: &str) -> Self {
        self.headers.lock().insert(
            HeaderName::from_static(name),
            HeaderValue::from_str(value).expect("valid header value"),
        );
        self
    }

    /// Current per-endpoint call counts.
    pub fn calls(&self) -> CallSnapshot {
        CallSnapshot {
            repo: self.calls.repo.load(Ordering::SeqCst),
            branch_protection: self.calls.branch_protection.load(Ordering::SeqCst),
            branch_rules: self.calls.branch_rules.load(Ordering::SeqCst),
            contents: self.calls.contents.load(Ordering::SeqCst),
            readme: self.calls.readme.load(Ordering::SeqCst),
            repo_rulesets: self.calls.repo_rulesets.load(Ordering::SeqCst),
            ruleset: self.calls.ruleset.load(Ordering::SeqCst),
            org_rulesets: self.calls.org_rulesets.load(Ordering::SeqCst),
            graphql: self.calls.graphql.load(Ordering::SeqCst),
        }
    }

    fn respond(&self, status: StatusCode) -> RemoteResponse {
        RemoteResponse::new(status, self.headers.lock().clone())
    }

    fn check_failure(&self, operation: &'static str) -> Result<(), RemoteError> {
        if let Some(status) = self.failures.lock().get(operation) {
            return Err(RemoteError::Status { operation, response: self.respond(*status) });
        }
        Ok(())
    }
}

fn repo_key(owner: &str, name: &str) -> String {
    format!("{owner}/{name}")
}

#[async_trait]
impl RemoteClient for MockRemoteClient {
    async fn repo(&self, owner: &str, name: &str) -> RemoteResult<RepoMetadata> {
        self.calls.repo.fetch_add(1, Ordering::SeqCst);
        self.check_failure("repo")?;
        match self.repos.lock().get(&repo_key(owner, name)) {
            Some(meta) => Ok(Fetched::new(meta.clone(), self.respond(StatusCode::OK))),
            None => Err(RemoteError::Status {
                operation: "repo",
                response: self.respond(StatusCode::NOT_FOUND),
            }),
        }
    }

    async fn branch_protection(
        &self,
        owner: &str,
        name: &str,
        branch: &str,
    ) -> RemoteResult<Option<BranchProtection>> {
        self.calls.branch_protection.fetch_add(1, Ordering::SeqCst);
        self.check_failure("branch_protection")?;
        let key = (repo_key(owner, name), branch.to_owned());
        match self.protections.lock().get(&key) {
            Some(protection) => {
                Ok(Fetched::new(Some(protection.clone()), self.respond(StatusCode::OK)))
            }
            None => Ok(Fetched::new(None, self.respond(StatusCode::NOT_FOUND))),
        }
    }

    async fn branch_rules(
        &self,
        owner: &str,
        name: &str,
        branch: &str,
    ) -> RemoteResult<Vec<BranchRule>> {
        self.calls.branch_rules.fetch_add(1, Ordering::SeqCst);
        self.check_failure("branch_rules")?;
        let key = (repo_key(owner, name), branch.to_owned());
        match self.branch_rules.lock().get(&key) {
            Some(rules) => Ok(Fetched::new(rules.clone(), self.respond(StatusCode::OK))),
            None => Ok(Fetched::new(Vec::new(), self.respond(StatusCode::NOT_FOUND))),
        }
    }

    async fn contents(
        &self,
        owner: &str,
        name: &str,
        path: &str,
        _reference: &str,
    ) -> RemoteResult<Option<FileContent>> {
        self.calls.contents.fetch_add(1, Ordering::SeqCst);
        self.check_failure("contents")?;
        let key = (repo_key(owner, name), path.to_owned());
        match self.contents.lock().get(&key) {
            Some(content) => Ok(Fetched::new(Some(content.clone()), self.respond(StatusCode::OK))),
            None => Ok(Fetched::new(None, self.respond(StatusCode::NOT_FOUND))),
        }
    }

    async fn readme(
        &self,
        owner: &str,
        name: &str,
        _reference: &str,
    ) -> RemoteResult<Option<FileContent>> {
        self.calls.readme.fetch_add(1, Ordering::SeqCst);
        self.check_failure("readme")?;
        match self.readmes.lock().get(&repo_key(owner, name)) {
            Some(content) => Ok(Fetched::new(Some(content.clone()), self.respond(StatusCode::OK))),
            None => Ok(Fetched::new(None, self.respond(StatusCode::NOT_FOUND))),
        }
    }

    async fn repo_rulesets(
        &self,
        owner: &str,
        name: &str,
        _include_parents: bool,
    ) -> RemoteResult<Vec<Ruleset>> {
        self.calls.repo_rulesets.fetch_add(1, Ordering::SeqCst);
        self.check_failure("repo_rulesets")?;
        let rulesets =
            self.repo_rulesets.lock().get(&repo_key(owner, name)).cloned().unwrap_or_default();
        Ok(Fetched::new(rulesets, self.respond(StatusCode::OK)))
    }

    async fn ruleset(
        &self,
        owner: &str,
        name: &str,
        id: u64,
        _include_parents: bool,
    ) -> RemoteResult<Ruleset> {
        self.calls.ruleset.fetch_add(1, Ordering::SeqCst);
        self.check_failure("ruleset")?;
        let key = (repo_key(owner, name), id);
        match self.ruleset_details.lock().get(&key) {
            Some(ruleset) => Ok(Fetched::new(ruleset.clone(), self.respond(StatusCode::OK))),
            None => Err(RemoteError::Status {
                operation: "ruleset",
                response: self.respond(StatusCode::NOT_FOUND),
            }),
        }
    }

    async fn org_rulesets(&self, owner: &str) -> RemoteResult<Vec<Ruleset>> {
        self.calls.org_rulesets.fetch_add(1, Ordering::SeqCst);
        self.check_failure("org_rulesets")?;
        if let Some(status) = self.org_ruleset_statuses.lock().get(owner) {
            // 404 and 403 both mean "none configured" at this seam.
            return Ok(Fetched::new(Vec::new(), self.respond(*status)));
        }
        let rulesets = self.org_rulesets.lock().get(owner).cloned().unwrap_or_default();
        Ok(Fetched::new(rulesets, self.respond(StatusCode::OK)))
    }

    async fn graphql(
        &self,
        _query: &str,
        _variables: serde_json::Value,
    ) -> RemoteResult<serde_json::Value> {
        self.calls.graphql.fetch_add(1, Ordering::SeqCst);
        self.check_failure("graphql")?;
        match self.graphql_pages.lock().pop_front() {
            Some(data) => Ok(Fetched::new(data, self.respond(StatusCode::OK))),
            None => Err(RemoteError::Transport {
                operation: "graphql",
                message: "no scripted response queued".to_owned(),
            }),
        }
    }
}
