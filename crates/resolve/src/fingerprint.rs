use crate::error::ResolveError;
use repolens_primitives::{FetchScope, Params, RepoIdentity};

/// Computes the canonical flight key of a request.
///
/// The form is `scopePrefix ":" key ":" paramsKey` where `scopePrefix` is
/// the lowercased owner for org-scoped keys or lowercased `owner/name` for
/// repo-scoped ones, and `paramsKey` serializes the parameters as
/// `k1=v1&k2=v2…` with keys ascending. Two logically equal requests yield
/// byte-identical fingerprints regardless of parameter insertion order or
/// the case of identity components.
pub fn fingerprint(
    scope: FetchScope,
    key: &str,
    repo: &RepoIdentity,
    params: &Params,
) -> Result<String, ResolveError> {
    let prefix = match scope {
        FetchScope::Org => {
            if repo.owner.is_empty() {
                return Err(ResolveError::BadRequest(
                    "org-scoped key requires a repository owner".to_owned(),
                ));
            }
            repo.owner.to_lowercase()
        }
        FetchScope::Repo => {
            if repo.owner.is_empty() || repo.name.is_empty() {
                return Err(ResolveError::BadRequest(
                    "repo-scoped key requires a repository owner and name".to_owned(),
                ));
            }
            format!("{}/{}", repo.owner.to_lowercase(), repo.name.to_lowercase())
        }
    };

    let mut out = String::with_capacity(prefix.len() + key.len() + 2);
    out.push_str(&prefix);
    out.push(':');
    out.push_str(key);
    out.push(':');
    // `Params` is a BTreeMap, so iteration is already key-ascending.
    let mut first = true;
    for (name, value) in params {
        if !first {
            out.push('&');
        }
        out.push_str(name);
        out.push('=');
        out.push_str(value);
        first = false;
    }
    Ok(out)
}
