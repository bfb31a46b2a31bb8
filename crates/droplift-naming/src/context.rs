//! Rendering context: clock value, random source, counters.

use crate::counters::Counters;
use chrono::{DateTime, FixedOffset, Local};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::fmt;
use std::sync::Arc;

/// Source of the timestamp a name is rendered at.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Local wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

/// Everything a token needs to produce its value.
///
/// Rendering is deterministic given the same timestamp and a random source
/// seeded the same way.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use chrono::DateTime;
/// use droplift_naming::{Counters, NameContext, NameTemplate};
///
/// let now = DateTime::parse_from_rfc3339("2024-03-05T13:04:05+00:00").unwrap();
/// let mut ctx = NameContext::new(now, Arc::new(Counters::new())).with_seed(7);
///
/// let name = NameTemplate::compile("%y-%mo-%d_%i{3}").render(&mut ctx);
/// assert_eq!(name, "2024-03-05_001");
/// ```
pub struct NameContext {
    now: DateTime<FixedOffset>,
    rng: Box<dyn RngCore + Send>,
    counters: Arc<Counters>,
    word_list: Option<Arc<Vec<String>>>,
}

impl NameContext {
    /// Create a context at `now` with an entropy-seeded random source.
    pub fn new(now: DateTime<FixedOffset>, counters: Arc<Counters>) -> Self {
        Self {
            now,
            rng: Box::new(StdRng::from_entropy()),
            counters,
            word_list: None,
        }
    }

    /// Create a context at the clock's current time.
    pub fn from_clock(clock: &dyn Clock, counters: Arc<Counters>) -> Self {
        Self::new(clock.now(), counters)
    }

    /// Replace the random source.
    pub fn with_rng<R: RngCore + Send + 'static>(mut self, rng: R) -> Self {
        self.rng = Box::new(rng);
        self
    }

    /// Replace the random source with one seeded from `seed`.
    pub fn with_seed(self, seed: u64) -> Self {
        self.with_rng(StdRng::seed_from_u64(seed))
    }

    /// Lines `%rf` picks from.
    pub fn with_word_list(mut self, words: Arc<Vec<String>>) -> Self {
        self.word_list = Some(words);
        self
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        self.now
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub fn word_list(&self) -> Option<&[String]> {
        self.word_list.as_deref().map(|words| words.as_slice())
    }

    pub fn rng(&mut self) -> &mut dyn RngCore {
        self.rng.as_mut()
    }
}

impl fmt::Debug for NameContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NameContext")
            .field("now", &self.now)
            .field("counters", &self.counters)
            .field("word_list", &self.word_list.as_ref().map(|w| w.len()))
            .finish_non_exhaustive()
    }
}
