//! Collector Cache
//!
//! Maps request paths to lazily-built collector sets with single-flight
//! construction.
//!
//! Each key holds either a completed set or a pending one-shot cell. The
//! first caller for a key reserves it with a pending cell and runs the
//! factory; every other caller awaits the cell. Readers therefore only ever
//! observe "not yet resolved" or a fully built set. A failed build retracts
//! the cell before notifying waiters, so the next request starts fresh.

use crate::domain::collector_set::CollectorSet;
use crate::domain::error::GatewayError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

type Outcome = Result<Arc<CollectorSet>, GatewayError>;

#[derive(Clone)]
enum Slot {
    /// Construction in flight. `generation` identifies the builder that owns it.
    Pending {
        generation: u64,
        ready: watch::Receiver<Option<Outcome>>,
    },
    Ready(Arc<CollectorSet>),
}

impl Slot {
    fn is_pending(&self, generation: u64) -> bool {
        matches!(self, Slot::Pending { generation: g, .. } if *g == generation)
    }
}

/// Path-keyed cache of collector sets.
///
/// Entries live until removed; there is no TTL or size bound.
pub struct CollectorCache {
    slots: DashMap<String, Slot>,
    next_generation: AtomicU64,
}

impl CollectorCache {
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Return the set cached under `key`, building it with `factory` if absent.
    ///
    /// `factory` runs at most once per call and only in the caller that won
    /// the reservation. Callers that find a construction in flight wait for
    /// it and receive its outcome, success or failure. If the builder is
    /// dropped before finishing, waiters retry the reservation themselves.
    pub async fn get_or_create<F, Fut>(&self, key: &str, factory: F) -> Outcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CollectorSet, GatewayError>>,
    {
        let mut factory = Some(factory);

        loop {
            let claim = match self.slots.entry(key.to_string()) {
                Entry::Occupied(entry) => match entry.get() {
                    Slot::Ready(set) => {
                        tracing::debug!("collector cache hit: {}", key);
                        return Ok(set.clone());
                    }
                    Slot::Pending { ready, .. } => Claim::Wait(ready.clone()),
                },
                Entry::Vacant(entry) => {
                    let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
                    let (tx, rx) = watch::channel(None);
                    entry.insert(Slot::Pending {
                        generation,
                        ready: rx,
                    });
                    Claim::Build(PendingGuard {
                        cache: self,
                        key: key.to_string(),
                        generation,
                        tx: Some(tx),
                    })
                }
            };

            match claim {
                Claim::Wait(mut ready) => {
                    tracing::debug!("waiting for in-flight construction: {}", key);
                    let outcome = match ready.wait_for(Option::is_some).await {
                        Ok(value) => value.clone(),
                        Err(_) => None,
                    };
                    match outcome {
                        Some(outcome) => return outcome,
                        None => tracing::debug!("construction abandoned, retrying: {}", key),
                    }
                }
                Claim::Build(guard) => {
                    let Some(factory) = factory.take() else {
                        return Err(GatewayError::Upstream(format!(
                            "collector factory for {} already consumed",
                            key
                        )));
                    };
                    let outcome = factory().await.map(Arc::new);
                    guard.complete(outcome.clone());
                    return outcome;
                }
            }
        }
    }

    /// Remove the completed entry under `key`.
    ///
    /// Returns whether an entry was removed. A construction in flight is left
    /// alone and will install its result when it finishes.
    pub fn remove(&self, key: &str) -> bool {
        self.slots
            .remove_if(key, |_, slot| matches!(slot, Slot::Ready(_)))
            .is_some()
    }

    /// Whether a completed entry exists under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.slots
            .get(key)
            .map(|slot| matches!(*slot, Slot::Ready(_)))
            .unwrap_or(false)
    }

    /// Number of completed entries.
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot.value(), Slot::Ready(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CollectorCache {
    fn default() -> Self {
        Self::new()
    }
}

enum Claim<'a> {
    Wait(watch::Receiver<Option<Outcome>>),
    Build(PendingGuard<'a>),
}

/// Ownership of a pending slot.
///
/// Dropping the guard without completing it (the building request was
/// cancelled) retracts the slot and closes the channel, which wakes waiters.
struct PendingGuard<'a> {
    cache: &'a CollectorCache,
    key: String,
    generation: u64,
    tx: Option<watch::Sender<Option<Outcome>>>,
}

impl PendingGuard<'_> {
    /// Publish the outcome into the map, then notify waiters.
    fn complete(mut self, outcome: Outcome) {
        match &outcome {
            Ok(set) => match self.cache.slots.entry(self.key.clone()) {
                Entry::Occupied(mut entry) => {
                    if entry.get().is_pending(self.generation) {
                        entry.insert(Slot::Ready(set.clone()));
                    }
                }
                Entry::Vacant(entry) => {
                    entry.insert(Slot::Ready(set.clone()));
                }
            },
            Err(err) => {
                tracing::debug!("construction failed for {}: {}", self.key, err);
                self.retract();
            }
        }

        if let Some(tx) = self.tx.take() {
            tx.send_replace(Some(outcome));
        }
    }

    fn retract(&self) {
        let generation = self.generation;
        self.cache
            .slots
            .remove_if(&self.key, |_, slot| slot.is_pending(generation));
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.tx.is_some() {
            tracing::debug!("construction cancelled for {}", self.key);
            self.retract();
        }
    }
}
