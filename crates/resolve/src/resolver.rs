use crate::{
    cache::ResultCache,
    context::ResolveCtx,
    error::ResolveError,
    fingerprint::fingerprint,
    flight::SingleFlight,
    provider::DependencyProvider,
    registry::ProviderRegistry,
};
use repolens_budget::RequestBudget;
use repolens_primitives::{DependencyValue, Params, RepoIdentity};
use repolens_remote::RemoteClient;
use std::{fmt, sync::Arc};

/// The dependency-resolution entry point.
///
/// `Resolver` is cheap to clone and safe to use from many tasks against many
/// repositories at once; all clones share one cache, one single-flight table,
/// one budget and one registry. Providers receive the resolver back on every
/// fetch so they can resolve their own prerequisites re-entrantly.
pub struct Resolver {
    inner: Arc<ResolverInner>,
}

struct ResolverInner {
    remote: Arc<dyn RemoteClient>,
    budget: RequestBudget,
    registry: Arc<ProviderRegistry>,
    cache: ResultCache,
    flights: SingleFlight<Arc<DependencyValue>, ResolveError>,
    scanned: parking_lot::RwLock<Option<Arc<[RepoIdentity]>>>,
}

impl Clone for Resolver {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("registry", &self.inner.registry)
            .field("cached", &self.inner.cache.len())
            .finish_non_exhaustive()
    }
}

impl Resolver {
    /// Creates a resolver over the given remote client, budget and registry.
    pub fn new(
        remote: Arc<dyn RemoteClient>,
        budget: RequestBudget,
        registry: Arc<ProviderRegistry>,
    ) -> Self {
        Self {
            inner: Arc::new(ResolverInner {
                remote,
                budget,
                registry,
                cache: ResultCache::new(),
                flights: SingleFlight::new(),
                scanned: parking_lot::RwLock::new(None),
            }),
        }
    }

    /// The budget every remote call is gated on.
    pub fn budget(&self) -> &RequestBudget {
        &self.inner.budget
    }

    /// The remote client handed to providers.
    pub fn remote(&self) -> &Arc<dyn RemoteClient> {
        &self.inner.remote
    }

    /// The provider registry in use.
    pub fn registry(&self) -> &ProviderRegistry {
        &self.inner.registry
    }

    /// Injects the discovery result; called once by the driver before rule
    /// evaluation begins. An empty list is a valid observation.
    pub fn set_scanned_repos(&self, repos: Vec<RepoIdentity>) {
        *self.inner.scanned.write() = Some(repos.into());
    }

    /// The injected discovery result, if any.
    pub fn scanned_repos(&self) -> Option<Arc<[RepoIdentity]>> {
        self.inner.scanned.read().clone()
    }

    /// Resolves `key` for `repo` into a materialized value.
    ///
    /// The request is fingerprinted, checked against the context's fetch
    /// chain for cycles, answered from the cache when possible, and
    /// otherwise executed through the single-flight coalescer so concurrent
    /// identical requests run the provider exactly once. Successful values
    /// are cached under the fingerprint; errors are not.
    pub async fn resolve(
        &self,
        ctx: &ResolveCtx,
        repo: &RepoIdentity,
        key: &str,
        params: &Params,
    ) -> Result<Arc<DependencyValue>, ResolveError> {
        if key.is_empty() {
            return Err(ResolveError::BadRequest("dependency key must not be empty".to_owned()));
        }
        if repo.owner.is_empty() {
            return Err(ResolveError::BadRequest("repository owner must not be empty".to_owned()));
        }
        if repo.name.is_empty() {
            return Err(ResolveError::BadRequest("repository name must not be empty".to_owned()));
        }

        let provider = self
            .inner
            .registry
            .get(key)
            .cloned()
            .ok_or_else(|| ResolveError::UnsupportedKey(key.to_owned()))?;
        let fp = fingerprint(provider.scope(), key, repo, params)?;

        // Cycle detection runs before the cache so a cycle is reported even
        // when an intermediate value happens to be cached from another chain.
        if ctx.chain().contains(&fp) {
            let mut path = ctx.chain().path();
            path.push(fp);
            return Err(ResolveError::CycleDetected(path));
        }
        let child = ctx.extended(&fp);

        if let Some(value) = self.inner.cache.get(&fp) {
            metrics::counter!("repolens_resolver_cache_hits", 1);
            tracing::trace!(target: "resolve", fingerprint = %fp, "cache hit");
            return Ok(value);
        }
        metrics::counter!("repolens_resolver_cache_misses", 1);

        let (result, shared) = self
            .inner
            .flights
            .run(&fp, || {
                let this = self.clone();
                let repo = repo.clone();
                let params = params.clone();
                let provider = Arc::clone(&provider);
                let child = child.clone();
                let fp = fp.clone();
                async move {
                    tracing::debug!(target: "resolve", fingerprint = %fp, "executing provider");
                    provider.fetch(&child, &repo, &params, &this).await.map(Arc::new)
                }
            })
            .await;
        if shared {
            metrics::counter!("repolens_resolver_flights_shared", 1);
        }

        let value = result?;
        self.inner.cache.insert(&fp, Arc::clone(&value));
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::DependencyProvider;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use repolens_primitives::{FetchScope, MergeMethodMask};
    use repolens_remote::test_utils::MockRemoteClient;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        key: &'static str,
        scope: FetchScope,
        calls: AtomicUsize,
        failures_left: AtomicUsize,
    }

    impl CountingProvider {
        fn new(key: &'static str) -> Self {
            Self {
                key,
                scope: FetchScope::Repo,
                calls: AtomicUsize::new(0),
                failures_left: AtomicUsize::new(0),
            }
        }

        fn failing_once(key: &'static str) -> Self {
            let provider = Self::new(key);
            provider.failures_left.store(1, Ordering::SeqCst);
            provider
        }
    }

    #[async_trait]
    impl DependencyProvider for CountingProvider {
        fn key(&self) -> &'static str {
            self.key
        }

        fn scope(&self) -> FetchScope {
            self.scope
        }

        async fn fetch(
            &self,
            _ctx: &ResolveCtx,
            _repo: &RepoIdentity,
            _params: &Params,
            _resolver: &Resolver,
        ) -> Result<DependencyValue, ResolveError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
                .is_ok()
            {
                return Err(ResolveError::Decode("transient".to_owned()));
            }
            Ok(DependencyValue::MergeMethods(MergeMethodMask::SQUASH))
        }
    }

    /// Provider that resolves `next` before returning, for chain tests.
    struct ChainedProvider {
        key: &'static str,
        next: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DependencyProvider for ChainedProvider {
        fn key(&self) -> &'static str {
            self.key
        }

        fn scope(&self) -> FetchScope {
            FetchScope::Repo
        }

        async fn fetch(
            &self,
            ctx: &ResolveCtx,
            repo: &RepoIdentity,
            params: &Params,
            resolver: &Resolver,
        ) -> Result<DependencyValue, ResolveError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            resolver.resolve(ctx, repo, self.next, params).await?;
            Ok(DependencyValue::MergeMethods(MergeMethodMask::empty()))
        }
    }

    fn resolver_with(providers: Vec<Arc<dyn DependencyProvider>>) -> Resolver {
        let mut registry = ProviderRegistry::new();
        for provider in providers {
            registry.register(provider);
        }
        Resolver::new(
            Arc::new(MockRemoteClient::new()),
            RequestBudget::default(),
            Arc::new(registry),
        )
    }

    fn repo() -> RepoIdentity {
        RepoIdentity::new("octo", "widgets")
    }

    #[tokio::test]
    async fn resolving_twice_reuses_the_cached_value() {
        let provider = Arc::new(CountingProvider::new("stub.value"));
        let resolver = resolver_with(vec![provider.clone()]);
        let ctx = ResolveCtx::new();

        let first = resolver.resolve(&ctx, &repo(), "stub.value", &Params::new()).await.unwrap();
        let second = resolver.resolve(&ctx, &repo(), "stub.value", &Params::new()).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn parameter_order_does_not_fork_the_fingerprint() {
        let provider = Arc::new(CountingProvider::new("stub.value"));
        let resolver = resolver_with(vec![provider.clone()]);
        let ctx = ResolveCtx::new();

        let mut ab = Params::new();
        ab.insert("a".to_owned(), "1".to_owned());
        ab.insert("b".to_owned(), "2".to_owned());
        let mut ba = Params::new();
        ba.insert("b".to_owned(), "2".to_owned());
        ba.insert("a".to_owned(), "1".to_owned());

        resolver.resolve(&ctx, &repo(), "stub.value", &ab).await.unwrap();
        resolver.resolve(&ctx, &repo(), "stub.value", &ba).await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_resolutions_execute_the_provider_once() {
        let provider = Arc::new(CountingProvider::new("stub.value"));
        let resolver = resolver_with(vec![provider.clone()]);

        let tasks: Vec<_> = (0..10)
            .map(|_| {
                let resolver = resolver.clone();
                tokio::spawn(async move {
                    resolver.resolve(&ResolveCtx::new(), &repo(), "stub.value", &Params::new()).await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cycle_is_reported_with_the_full_chain() {
        let a = Arc::new(ChainedProvider { key: "a", next: "b", calls: AtomicUsize::new(0) });
        let b = Arc::new(ChainedProvider { key: "b", next: "a", calls: AtomicUsize::new(0) });
        let resolver = resolver_with(vec![a.clone(), b.clone()]);

        let err = resolver
            .resolve(&ResolveCtx::new(), &repo(), "a", &Params::new())
            .await
            .unwrap_err();
        assert_matches!(err, ResolveError::CycleDetected(path) => {
            assert_eq!(path, [
                "octo/widgets:a:".to_owned(),
                "octo/widgets:b:".to_owned(),
                "octo/widgets:a:".to_owned(),
            ]);
        });
        // Neither provider executed a second time for the repeated key.
        assert_eq!(a.calls.load(Ordering::SeqCst), 1);
        assert_eq!(b.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn precondition_violations_are_bad_requests() {
        let resolver = resolver_with(vec![Arc::new(CountingProvider::new("stub.value"))]);
        let ctx = ResolveCtx::new();

        assert_matches!(
            resolver.resolve(&ctx, &repo(), "", &Params::new()).await,
            Err(ResolveError::BadRequest(_))
        );
        let ownerless = RepoIdentity { owner: String::new(), ..repo() };
        assert_matches!(
            resolver.resolve(&ctx, &ownerless, "stub.value", &Params::new()).await,
            Err(ResolveError::BadRequest(_))
        );
        let nameless = RepoIdentity { name: String::new(), ..repo() };
        assert_matches!(
            resolver.resolve(&ctx, &nameless, "stub.value", &Params::new()).await,
            Err(ResolveError::BadRequest(_))
        );
        assert_matches!(
            resolver.resolve(&ctx, &repo(), "no.such.key", &Params::new()).await,
            Err(ResolveError::UnsupportedKey(key)) => assert_eq!(key, "no.such.key")
        );
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let provider = Arc::new(CountingProvider::failing_once("stub.value"));
        let resolver = resolver_with(vec![provider.clone()]);
        let ctx = ResolveCtx::new();

        assert_matches!(
            resolver.resolve(&ctx, &repo(), "stub.value", &Params::new()).await,
            Err(ResolveError::Decode(_))
        );
        resolver.resolve(&ctx, &repo(), "stub.value", &Params::new()).await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn scanned_repos_round_trip() {
        let resolver = resolver_with(vec![]);
        assert!(resolver.scanned_repos().is_none());

        resolver.set_scanned_repos(vec![repo()]);
        let scanned = resolver.scanned_repos().unwrap();
        assert_eq!(scanned.len(), 1);
        assert_eq!(scanned[0].full_name, "octo/widgets");

        // An explicitly empty injection is a valid observation.
        resolver.set_scanned_repos(Vec::new());
        assert_eq!(resolver.scanned_repos().unwrap().len(), 0);
    }
}
