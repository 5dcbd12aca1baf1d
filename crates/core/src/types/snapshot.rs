//! The mergeable content of a rating store

use crate::types::{PendingBattles, RatingSet, RefinementQueue, Timestamp};
use serde::{Deserialize, Serialize};

/// Everything that is exchanged with the remote store and merged on pull
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreSnapshot {
    pub ratings: RatingSet,
    pub pending_battles: PendingBattles,
    pub refinement_queue: RefinementQueue,
    pub total_battles: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_battles_last_updated: Option<Timestamp>,
}

impl StoreSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when there is nothing worth pushing or keeping
    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
            && self.pending_battles.is_empty()
            && self.refinement_queue.is_empty()
            && self.total_battles == 0
    }

    /// Timestamp of the battle counter, missing counts as the epoch
    pub fn total_battles_timestamp(&self) -> Timestamp {
        Timestamp::or_epoch(self.total_battles_last_updated)
    }
}
