use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::comic::MISSING_COMIC;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RandomMode {
    /// Independent uniform pick, repeats allowed.
    Fast,
    /// No repeats until every comic has been seen once.
    Unique,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GotoOutcome {
    Moved,
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RandomPick {
    pub(crate) num: u32,
    /// The unique pool ran dry and the seen-set was cleared first.
    pub(crate) pool_reset: bool,
}

/// Selection state for one shell session. `1 <= current <= max_known`
/// holds after every operation.
#[derive(Debug)]
pub(crate) struct Session {
    current: u32,
    max_known: u32,
    seen: HashSet<u32>,
    rng: StdRng,
}

impl Session {
    pub(crate) fn new(max_known: u32) -> Self {
        Self::with_rng(max_known, StdRng::from_entropy())
    }

    pub(crate) fn with_rng(max_known: u32, rng: StdRng) -> Self {
        let max_known = max_known.max(1);
        Self {
            current: max_known,
            max_known,
            seen: HashSet::new(),
            rng,
        }
    }

    pub(crate) fn current(&self) -> u32 {
        self.current
    }

    pub(crate) fn max_known(&self) -> u32 {
        self.max_known
    }

    #[cfg(test)]
    pub(crate) fn seen_count(&self) -> usize {
        self.seen.len()
    }

    fn clamp(&self, target: i64) -> u32 {
        target.clamp(1, i64::from(self.max_known)) as u32
    }

    /// Only a landing exactly on the missing comic is skipped; jumps over it
    /// are not adjusted.
    pub(crate) fn next(&mut self, amount: i64) {
        let target = i64::from(self.current).saturating_add(amount);
        self.current = self.clamp(target);
        if self.current == MISSING_COMIC {
            self.current = if self.max_known > MISSING_COMIC {
                MISSING_COMIC + 1
            } else {
                MISSING_COMIC - 1
            };
        }
    }

    pub(crate) fn prev(&mut self, amount: i64) {
        let target = i64::from(self.current).saturating_sub(amount);
        self.current = self.clamp(target);
        if self.current == MISSING_COMIC {
            self.current = MISSING_COMIC - 1;
        }
    }

    pub(crate) fn first(&mut self) {
        self.current = 1;
    }

    pub(crate) fn last(&mut self) {
        self.current = self.max_known;
    }

    /// Clamps into `[1, max_known]`. Asking for the missing comic directly is
    /// refused and leaves the selection alone.
    pub(crate) fn goto(&mut self, target: Option<i64>) -> GotoOutcome {
        let target = target.unwrap_or(i64::from(self.max_known));
        let clamped = self.clamp(target);
        if clamped == MISSING_COMIC {
            return GotoOutcome::NotFound;
        }
        self.current = clamped;
        GotoOutcome::Moved
    }

    /// Raises `max_known` to `latest` when it is newer; returns how many new
    /// comics appeared.
    pub(crate) fn observe_latest(&mut self, latest: u32) -> u32 {
        if latest > self.max_known {
            let delta = latest - self.max_known;
            self.max_known = latest;
            delta
        } else {
            0
        }
    }

    pub(crate) fn random(&mut self, mode: RandomMode) -> RandomPick {
        let pick = match mode {
            RandomMode::Fast => RandomPick {
                num: self.rng.gen_range(1..=self.max_known),
                pool_reset: false,
            },
            RandomMode::Unique => self.random_unique(),
        };
        self.current = pick.num;
        pick
    }

    fn random_unique(&mut self) -> RandomPick {
        let mut pool_reset = false;
        let mut pool = self.unseen_pool();
        if pool.is_empty() {
            self.seen.clear();
            pool_reset = true;
            pool = self.unseen_pool();
        }
        // a fresh pool always holds 1
        let num = pool.choose(&mut self.rng).copied().unwrap_or(1);
        self.seen.insert(num);
        RandomPick { num, pool_reset }
    }

    fn unseen_pool(&self) -> Vec<u32> {
        (1..=self.max_known)
            .filter(|num| *num != MISSING_COMIC && !self.seen.contains(num))
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn set_current(&mut self, current: u32) {
        self.current = current.clamp(1, self.max_known);
    }

    #[cfg(test)]
    pub(crate) fn mark_seen(&mut self, nums: impl IntoIterator<Item = u32>) {
        self.seen.extend(nums);
    }
}
