//! Auxiliary work queues: pending battles and refinement battles

use crate::types::ItemId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Items awaiting a battle that was scheduled but not yet resolved
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PendingBattles(BTreeSet<ItemId>);

impl PendingBattles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an item; returns false if it was already pending
    pub fn insert(&mut self, id: ItemId) -> bool {
        self.0.insert(id)
    }

    /// Removes an item; returns false if it was not pending
    pub fn remove(&mut self, id: &ItemId) -> bool {
        self.0.remove(id)
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.0.contains(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemId> {
        self.0.iter()
    }

    /// Set union, duplicates collapse
    pub fn union(&self, other: &PendingBattles) -> PendingBattles {
        Self(self.0.union(&other.0).cloned().collect())
    }
}

impl FromIterator<ItemId> for PendingBattles {
    fn from_iter<T: IntoIterator<Item = ItemId>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A deferred comparison requested to disambiguate two items
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefinementBattle {
    pub primary_item_id: ItemId,
    pub opponent_item_id: ItemId,
    /// Lower values are consumed first
    pub priority: i64,
}

impl RefinementBattle {
    pub fn new(primary: ItemId, opponent: ItemId, priority: i64) -> Self {
        Self {
            primary_item_id: primary,
            opponent_item_id: opponent,
            priority,
        }
    }
}

/// Refinement battles ordered by ascending priority, FIFO within a priority
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefinementQueue(Vec<RefinementBattle>);

impl RefinementQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one battle per opponent and restores priority order.
    ///
    /// Returns the new queue length.
    pub fn enqueue(&mut self, primary: &ItemId, opponents: &[ItemId], priority: i64) -> usize {
        self.0.extend(
            opponents
                .iter()
                .map(|opponent| RefinementBattle::new(primary.clone(), opponent.clone(), priority)),
        );
        self.sort();
        self.0.len()
    }

    /// Removes and returns the head
    pub fn pop(&mut self) -> Option<RefinementBattle> {
        if self.0.is_empty() {
            None
        } else {
            Some(self.0.remove(0))
        }
    }

    /// Returns the head without removing it
    pub fn peek(&self) -> Option<&RefinementBattle> {
        self.0.first()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &RefinementBattle> {
        self.0.iter()
    }

    /// Concatenates `self` then `other` and stable-sorts by priority.
    ///
    /// Duplicates are kept.
    pub fn concat(&self, other: &RefinementQueue) -> RefinementQueue {
        let mut merged = Self(self.0.iter().chain(other.0.iter()).cloned().collect());
        merged.sort();
        merged
    }

    /// Entries of `self` left after taking away one equal entry per entry of
    /// `other`. Duplicates count: `[x, x] - [x]` is `[x]`. Order is kept.
    pub fn difference(&self, other: &RefinementQueue) -> RefinementQueue {
        let mut unmatched: HashMap<&RefinementBattle, usize> = HashMap::new();
        for battle in &other.0 {
            *unmatched.entry(battle).or_default() += 1;
        }

        Self(
            self.0
                .iter()
                .filter(|battle| match unmatched.get_mut(battle) {
                    Some(count) if *count > 0 => {
                        *count -= 1;
                        false
                    }
                    _ => true,
                })
                .cloned()
                .collect(),
        )
    }

    // Vec::sort_by_key is stable, which gives FIFO order within a priority
    fn sort(&mut self) {
        self.0.sort_by_key(|battle| battle.priority);
    }
}

impl FromIterator<RefinementBattle> for RefinementQueue {
    fn from_iter<T: IntoIterator<Item = RefinementBattle>>(iter: T) -> Self {
        let mut queue = Self(iter.into_iter().collect());
        queue.sort();
        queue
    }
}
