//! Cancellable timed continuations keyed by the resource they act on.
//!
//! At most one continuation is pending per key: scheduling again replaces the
//! previous one, so a restarted sequence never fires a stale step.

use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug)]
struct Pending<T> {
    remaining: f32,
    payload: T,
}

/// Frame-stepped timers. Deadlines are in seconds.
#[derive(Debug)]
pub struct Timers<K, T> {
    pending: HashMap<K, Pending<T>>,
}

impl<K, T> Default for Timers<K, T> {
    fn default() -> Self {
        Self { pending: HashMap::new() }
    }
}

impl<K: Eq + Hash + Clone, T> Timers<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `payload` to fire after `delay` seconds. Returns the continuation
    /// it replaced, if any.
    pub fn schedule(&mut self, key: K, delay: f32, payload: T) -> Option<T> {
        self.pending
            .insert(key, Pending { remaining: delay.max(0.0), payload })
            .map(|p| p.payload)
    }

    /// Cancel the pending continuation for `key`. Returns true if one was pending.
    pub fn cancel(&mut self, key: &K) -> bool {
        self.pending.remove(key).is_some()
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Advance all timers by `dt` seconds and return the continuations that came
    /// due, earliest deadline first.
    pub fn advance(&mut self, dt: f32) -> Vec<(K, T)> {
        let mut due = Vec::new();
        for (key, pending) in self.pending.iter_mut() {
            pending.remaining -= dt;
            if pending.remaining <= 0.0 {
                due.push((key.clone(), pending.remaining));
            }
        }
        due.sort_by(|a, b| a.1.total_cmp(&b.1));

        due.into_iter()
            .filter_map(|(key, _)| self.pending.remove(&key).map(|p| (key, p.payload)))
            .collect()
    }
}
