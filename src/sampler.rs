//! Uniform sampling over a filtered candidate pool.
//!
//! All randomness goes through [`RandomSource`]; any `rand::Rng` is one, so
//! callers pass `rand::rng()` in production and a seeded `StdRng` in tests.

use std::collections::HashSet;

use log::{debug, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::data::Record;

/// Attempts spent on one slot of a multi-roll before giving up on it. Only
/// bounds the loop; any positive value is correct.
pub const MAX_DRAW_ATTEMPTS: usize = 100;

pub const NO_MATCH_MESSAGE: &str = "No items found matching your filters.";
pub const NO_MATCH_GROUP: &str = "Error";

pub trait RandomSource {
    /// Uniform index in `0..len`; `len` is never zero.
    fn next_index(&mut self, len: usize) -> usize;
}

impl<R: Rng + ?Sized> RandomSource for R {
    fn next_index(&mut self, len: usize) -> usize {
        self.random_range(0..len)
    }
}

/// A record paired with the display name of the group it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollResult {
    #[serde(rename = "item")]
    pub record: Record,
    pub group: String,
}

impl RollResult {
    pub fn new(record: Record, group: impl Into<String>) -> Self {
        Self {
            record,
            group: group.into(),
        }
    }

    pub fn no_match() -> Self {
        let mut record = Record::new();
        record.insert("error", NO_MATCH_MESSAGE);
        Self::new(record, NO_MATCH_GROUP)
    }

    pub fn is_no_match(&self) -> bool {
        self.group == NO_MATCH_GROUP && self.record.id().is_none() && self.record.contains_key("error")
    }

    pub fn id(&self) -> Option<&str> {
        self.record.id()
    }

    /// Identity used for distinctness: the record id, or its serialized form
    /// when it has none.
    pub fn identity(&self) -> String {
        match self.record.id() {
            Some(id) => id.to_string(),
            None => serde_json::to_string(&self.record).unwrap_or_default(),
        }
    }
}

pub fn roll_one<S: RandomSource + ?Sized>(pool: &[RollResult], rng: &mut S) -> RollResult {
    if pool.is_empty() {
        debug!("Roll over an empty pool");
        return RollResult::no_match();
    }
    pool[rng.next_index(pool.len())].clone()
}

/// Up to `n` results with pairwise-distinct identities. Fewer come back only
/// when a slot exhausts [`MAX_DRAW_ATTEMPTS`] on duplicates.
pub fn roll_many<S: RandomSource + ?Sized>(
    pool: &[RollResult],
    n: usize,
    rng: &mut S,
) -> Vec<RollResult> {
    let wanted = n.min(pool.len());
    let mut used = HashSet::with_capacity(wanted);
    let mut rolled = Vec::with_capacity(wanted);
    for slot in 0..wanted {
        let mut accepted = None;
        for _ in 0..MAX_DRAW_ATTEMPTS {
            let candidate = &pool[rng.next_index(pool.len())];
            let identity = candidate.identity();
            if !used.contains(&identity) {
                used.insert(identity);
                accepted = Some(candidate.clone());
                break;
            }
        }
        match accepted {
            Some(result) => rolled.push(result),
            None => warn!(
                "Abandoned roll slot {} after {MAX_DRAW_ATTEMPTS} duplicate draws",
                slot + 1
            ),
        }
    }
    debug!("Rolled {} of {} requested result(s)", rolled.len(), n);
    rolled
}

/// Single roll for `n <= 1`, distinct multi-roll otherwise. Never empty: an
/// empty draw becomes the no-match result.
pub fn roll<S: RandomSource + ?Sized>(
    pool: &[RollResult],
    n: usize,
    rng: &mut S,
) -> Vec<RollResult> {
    if n <= 1 {
        return vec![roll_one(pool, rng)];
    }
    let rolled = roll_many(pool, n, rng);
    if rolled.is_empty() {
        vec![RollResult::no_match()]
    } else {
        rolled
    }
}
