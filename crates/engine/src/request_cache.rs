use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::hash::Hash;

use core_types::{AppId, CompatibilityRecord, Title};
use dom::NodeId;

/// Observable state of one key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheState {
    Unresolved,
    Pending,
    Resolved,
}

/// Outcome of [`RequestCache::get_or_fetch`].
#[derive(Clone, Debug, PartialEq)]
pub enum Lookup<V> {
    /// Already settled; `None` is a cached miss or failure.
    Ready(Option<V>),
    /// A request for the key is in flight; the waiter was queued on it.
    Joined,
    /// A new request was dispatched; the waiter will be handed the value on
    /// settlement.
    Dispatched,
}

enum Slot<V, W> {
    Pending { waiters: Vec<W> },
    Resolved(Option<V>),
}

/// Memoizing, deduplicating lookup table for one kind of remote answer.
///
/// - A key is dispatched at most once per cache lifetime.
/// - Settled values never change, misses included.
/// - Every waiter registered while a key is pending is returned by
///   [`settle`](Self::settle), in registration order.
pub struct RequestCache<K, V, W> {
    name: &'static str,
    slots: HashMap<K, Slot<V, W>>,
    dispatched: usize,
}

impl<K, V, W> RequestCache<K, V, W>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slots: HashMap::new(),
            dispatched: 0,
        }
    }

    /// Resolve `key` for `waiter`, calling `dispatch` only if the key has
    /// never been requested. A dispatch error settles the key as a miss.
    pub fn get_or_fetch<F, E>(&mut self, key: K, waiter: W, dispatch: F) -> Lookup<V>
    where
        F: FnOnce(&K) -> Result<(), E>,
        E: Display,
    {
        match self.slots.get_mut(&key) {
            Some(Slot::Resolved(value)) => {
                log::trace!(target: "engine.cache", "{}: hit {:?}", self.name, key);
                return Lookup::Ready(value.clone());
            }
            Some(Slot::Pending { waiters }) => {
                log::debug!(target: "engine.cache", "{}: joined pending {:?}", self.name, key);
                waiters.push(waiter);
                return Lookup::Joined;
            }
            None => {}
        }

        match dispatch(&key) {
            Ok(()) => {
                self.dispatched += 1;
                self.slots.insert(
                    key,
                    Slot::Pending {
                        waiters: vec![waiter],
                    },
                );
                Lookup::Dispatched
            }
            Err(e) => {
                log::warn!(target: "engine.cache", "{}: dispatch for {:?} failed: {}", self.name, key, e);
                self.slots.insert(key, Slot::Resolved(None));
                Lookup::Ready(None)
            }
        }
    }

    /// Record the answer for a pending key and hand back its waiters.
    ///
    /// Answers for keys that are not pending are ignored; a settled value is
    /// never overwritten.
    pub fn settle(&mut self, key: &K, value: Option<V>) -> Vec<W> {
        match self.slots.get(key) {
            Some(Slot::Pending { .. }) => {}
            Some(Slot::Resolved(_)) => {
                log::debug!(target: "engine.cache", "{}: late answer for {:?} ignored", self.name, key);
                return Vec::new();
            }
            None => {
                log::debug!(target: "engine.cache", "{}: unsolicited answer for {:?}", self.name, key);
                return Vec::new();
            }
        }
        match self.slots.insert(key.clone(), Slot::Resolved(value)) {
            Some(Slot::Pending { waiters }) => waiters,
            _ => Vec::new(),
        }
    }

    pub fn state(&self, key: &K) -> CacheState {
        match self.slots.get(key) {
            None => CacheState::Unresolved,
            Some(Slot::Pending { .. }) => CacheState::Pending,
            Some(Slot::Resolved(_)) => CacheState::Resolved,
        }
    }

    /// The settled value, if any. `Some(None)` is a cached miss.
    pub fn peek(&self, key: &K) -> Option<Option<&V>> {
        match self.slots.get(key)? {
            Slot::Resolved(value) => Some(value.as_ref()),
            Slot::Pending { .. } => None,
        }
    }

    pub fn pending(&self) -> usize {
        self.slots
            .values()
            .filter(|slot| matches!(slot, Slot::Pending { .. }))
            .count()
    }

    /// Keys still waiting for an answer.
    pub fn pending_keys(&self) -> Vec<K> {
        self.slots
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Pending { .. }))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Number of requests that actually went out.
    pub fn dispatched(&self) -> usize {
        self.dispatched
    }
}

/// The two per-session lookup tables, keyed independently.
pub struct Caches {
    pub compatibility: RequestCache<AppId, CompatibilityRecord, NodeId>,
    pub titles: RequestCache<Title, AppId, NodeId>,
}

impl Caches {
    pub fn new() -> Self {
        Self {
            compatibility: RequestCache::new("compatibility"),
            titles: RequestCache::new("titles"),
        }
    }

    pub fn pending(&self) -> usize {
        self.compatibility.pending() + self.titles.pending()
    }
}

impl Default for Caches {
    fn default() -> Self {
        Self::new()
    }
}
