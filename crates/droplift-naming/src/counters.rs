//! Process-lifetime auto-increment counters.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Auto-increment counters keyed by token id.
///
/// One instance is created per process and shared by `Arc` between every
/// pipeline that renders names, so `%i` keeps counting across files. Values
/// start at 1 and are only reset by dropping the arena.
#[derive(Debug, Default)]
pub struct Counters {
    slots: DashMap<&'static str, AtomicU64>,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the counter for `key` and return the new value.
    pub fn next(&self, key: &'static str) -> u64 {
        let slot = self.slots.entry(key).or_insert_with(|| AtomicU64::new(0));
        slot.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Current value for `key` without incrementing (0 if never used).
    pub fn current(&self, key: &str) -> u64 {
        self.slots
            .get(key)
            .map(|slot| slot.load(Ordering::Relaxed))
            .unwrap_or(0)
    }
}
