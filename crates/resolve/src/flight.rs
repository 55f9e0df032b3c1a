use parking_lot::Mutex;
use std::{collections::HashMap, fmt, future::Future, sync::Arc};
use tokio::sync::watch;

type Outcome<T, E> = Option<Result<T, E>>;
type FlightMap<T, E> = Arc<Mutex<HashMap<String, watch::Receiver<Outcome<T, E>>>>>;

/// Collapses concurrent identical computations into one execution.
///
/// The first caller for a key becomes the leader and runs the computation;
/// everyone else waits on the leader's channel and receives a clone of the
/// shared outcome. The key is evicted once the computation completes, so the
/// next call re-executes. If the leader's future is dropped mid-run (its
/// caller was cancelled), the entry is evicted and the waiters transparently
/// re-enter, electing a new leader among themselves.
pub struct SingleFlight<T, E> {
    flights: FlightMap<T, E>,
}

impl<T, E> Default for SingleFlight<T, E> {
    fn default() -> Self {
        Self { flights: Arc::new(Mutex::new(HashMap::new())) }
    }
}

impl<T, E> fmt::Debug for SingleFlight<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingleFlight").field("in_flight", &self.flights.lock().len()).finish()
    }
}

/// Evicts the flight entry when the leader future is dropped before
/// publishing, waking waiters so they can retry.
struct EvictGuard<T, E> {
    flights: FlightMap<T, E>,
    key: String,
    armed: bool,
}

impl<T, E> Drop for EvictGuard<T, E> {
    fn drop(&mut self) {
        if self.armed {
            self.flights.lock().remove(&self.key);
        }
    }
}

enum Role<T, E> {
    Leader(watch::Sender<Outcome<T, E>>),
    Waiter(watch::Receiver<Outcome<T, E>>),
}

impl<T: Clone, E: Clone> SingleFlight<T, E> {
    /// An empty coalescer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `make` under `key`, coalescing with any in-flight execution.
    ///
    /// Returns the shared outcome and whether this caller received someone
    /// else's result (`true` for non-leaders).
    pub async fn run<F, Fut>(&self, key: &str, make: F) -> (Result<T, E>, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut make = Some(make);
        loop {
            let role = {
                let mut flights = self.flights.lock();
                match flights.get(key) {
                    Some(rx) => Role::Waiter(rx.clone()),
                    None => {
                        let (tx, rx) = watch::channel(None);
                        flights.insert(key.to_owned(), rx);
                        Role::Leader(tx)
                    }
                }
            };
            match role {
                Role::Leader(tx) => {
                    let mut guard = EvictGuard {
                        flights: Arc::clone(&self.flights),
                        key: key.to_owned(),
                        armed: true,
                    };
                    let make = make.take().expect("a caller leads at most once");
                    let result = make().await;
                    {
                        // Evict before publishing so a newcomer that misses
                        // the outcome starts a fresh flight.
                        let mut flights = self.flights.lock();
                        flights.remove(key);
                        tx.send_replace(Some(result.clone()));
                    }
                    guard.armed = false;
                    return (result, false);
                }
                Role::Waiter(mut rx) => {
                    if let Some(result) = rx.borrow_and_update().clone() {
                        return (result, true);
                    }
                    match rx.changed().await {
                        Ok(()) => {
                            if let Some(result) = rx.borrow().clone() {
                                return (result, true);
                            }
                        }
                        // The leader was dropped without publishing; retry.
                        Err(_) => {}
                    }
                }
            }
        }
    }
}
