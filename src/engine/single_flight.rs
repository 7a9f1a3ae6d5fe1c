//! # Single-Flight
//!
//! Collapses concurrent calls for the same key into one execution. The first caller starts
//! the work; callers arriving while it runs await the same future and receive a clone of its
//! output. The key is released as soon as the work completes, so the next call after that
//! starts fresh.
//!
//! The work runs as a [`Shared`] future: if the first caller is cancelled, any remaining
//! caller keeps driving it.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

type Flights<K, T> = Arc<Mutex<HashMap<K, Shared<BoxFuture<'static, T>>>>>;

pub struct SingleFlight<K, T> {
    flights: Flights<K, T>,
}

impl<K, T> Default for SingleFlight<K, T> {
    fn default() -> Self {
        Self {
            flights: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K, T> SingleFlight<K, T>
where
    K: Eq + Hash + Clone + std::fmt::Debug + Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `work` unless a call for `key` is already in flight, in which case joins it.
    pub async fn run<F, Fut>(&self, key: K, work: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let flight = {
            let mut flights = lock(&self.flights);
            match flights.get(&key) {
                Some(flight) => {
                    debug!(?key, "Joined in-flight call");
                    flight.clone()
                }
                None => {
                    let registry = Arc::clone(&self.flights);
                    let owned_key = key.clone();
                    let work = work();
                    let flight = async move {
                        let output = work.await;
                        lock(&registry).remove(&owned_key);
                        output
                    }
                    .boxed()
                    .shared();
                    flights.insert(key, flight.clone());
                    flight
                }
            }
        };
        flight.await
    }

    pub fn in_flight(&self, key: &K) -> bool {
        lock(&self.flights).contains_key(key)
    }
}

fn lock<K, T>(flights: &Flights<K, T>) -> MutexGuard<'_, HashMap<K, Shared<BoxFuture<'static, T>>>> {
    flights.lock().unwrap_or_else(PoisonError::into_inner)
}
