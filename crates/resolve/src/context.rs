use crate::chain::FetchChain;
use tokio_util::sync::CancellationToken;

/// Per-resolution context: a cancellation token plus the fetch chain.
///
/// Cloning is cheap. The chain is extended copy-on-write by the resolver for
/// every hop, so each branch of a resolution tree carries its own path.
#[derive(Clone, Debug, Default)]
pub struct ResolveCtx {
    cancel: CancellationToken,
    chain: FetchChain,
}

impl ResolveCtx {
    /// A fresh context that is never cancelled externally.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context driven by the caller's cancellation token.
    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self { cancel, chain: FetchChain::new() }
    }

    /// The cancellation token, for waits that must remain interruptible.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// The fetch chain accumulated so far.
    pub fn chain(&self) -> &FetchChain {
        &self.chain
    }

    /// A child context whose chain is extended by `fingerprint`.
    pub(crate) fn extended(&self, fingerprint: &str) -> Self {
        Self { cancel: self.cancel.clone(), chain: self.chain.extended(fingerprint) }
    }
}
