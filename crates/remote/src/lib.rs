//! Narrow client facade over the code-hosting service API.
//!
//! The resolver and its providers reach the service exclusively through the
//! [`RemoteClient`] trait. Every operation surfaces the raw response (status
//! and headers) on success *and* on failure, so the request budget can
//! observe rate-limit headers either way. Operations where a missing
//! resource is a domain signal rather than a failure map 404 (and, for
//! organization rulesets, 403) to empty values at this seam.

mod error;
mod response;
#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use error::RemoteError;
pub use response::{Fetched, RemoteResponse};

use async_trait::async_trait;
use repolens_primitives::{BranchProtection, BranchRule, FileContent, RepoMetadata, Ruleset};

/// Shorthand for the outcome of a remote operation.
pub type RemoteResult<T> = Result<Fetched<T>, RemoteError>;

/// The operations the resolver needs from the hosting service.
///
/// Implementations wrap the REST and GraphQL transports; they are expected
/// to be cheap to share (`Arc<dyn RemoteClient>`).
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Fetches repository metadata.
    async fn repo(&self, owner: &str, name: &str) -> RemoteResult<RepoMetadata>;

    /// Fetches the classic protection of a branch. 404 means the branch is
    /// unprotected and yields `None`, not an error.
    async fn branch_protection(
        &self,
        owner: &str,
        name: &str,
        branch: &str,
    ) -> RemoteResult<Option<BranchProtection>>;

    /// Lists the rules effective on a branch. 404 yields an empty list.
    async fn branch_rules(
        &self,
        owner: &str,
        name: &str,
        branch: &str,
    ) -> RemoteResult<Vec<BranchRule>>;

    /// Probes a path on a ref. 404 yields `None`, not an error.
    async fn contents(
        &self,
        owner: &str,
        name: &str,
        path: &str,
        reference: &str,
    ) -> RemoteResult<Option<FileContent>>;

    /// Probes the repository README on a ref. 404 yields `None`.
    async fn readme(
        &self,
        owner: &str,
        name: &str,
        reference: &str,
    ) -> RemoteResult<Option<FileContent>>;

    /// Lists the rulesets applying to a repository.
    async fn repo_rulesets(
        &self,
        owner: &str,
        name: &str,
        include_parents: bool,
    ) -> RemoteResult<Vec<Ruleset>>;

    /// Fetches one ruleset with its rules populated.
    async fn ruleset(
        &self,
        owner: &str,
        name: &str,
        id: u64,
        include_parents: bool,
    ) -> RemoteResult<Ruleset>;

    /// Lists an organization's rulesets. 404 and 403 both mean "none
    /// configured" and yield an empty list.
    async fn org_rulesets(&self, owner: &str) -> RemoteResult<Vec<Ruleset>>;

    /// Runs a GraphQL query and returns the `data` payload.
    async fn graphql(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> RemoteResult<serde_json::Value>;
}
