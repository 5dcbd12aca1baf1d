// crates/sync-engine/src/merge.rs
//! Merging a pulled snapshot into local state
//!
//! - Ratings: per item, the strictly newer `lastUpdated` wins the whole record;
//!   equal stamps go to the remote copy; a missing stamp counts as the epoch
//! - `totalBattles` and its stamp follow the same rule as one value
//! - Pending battles: set union
//! - Refinement queue: three-way against `base`, the queue the remote held when
//!   this side last saw it. Entries counted as a multiset; base entries the
//!   remote no longer has are dropped locally, remote entries beyond the base
//!   are appended, then stable-sorted by priority

use duelrank_core::{Rating, RefinementQueue, StoreSnapshot, Timestamp};

/// What a merge did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Items present on both sides where the local copy was newer
    pub kept_local: usize,
    /// Items present on both sides that took the remote copy
    pub took_remote: usize,
    /// Items only the remote side knew
    pub added_remote: usize,
    /// Whether the remote battle counter replaced the local one
    pub took_remote_total: bool,
}

impl MergeStats {
    /// Items whose local value changed
    pub fn changed(&self) -> usize {
        self.took_remote + self.added_remote
    }
}

/// Last-write-wins with ties going to `remote`
fn remote_wins(local: Timestamp, remote: Timestamp) -> bool {
    remote >= local
}

fn pick(local: &Rating, remote: &Rating) -> bool {
    remote_wins(local.effective_timestamp(), remote.effective_timestamp())
}

/// Local queue minus what the remote popped, plus what the remote added
fn merge_queues(
    local: &RefinementQueue,
    remote: &RefinementQueue,
    base: &RefinementQueue,
) -> RefinementQueue {
    let popped_elsewhere = base.difference(remote);
    let added_elsewhere = remote.difference(base);
    local.difference(&popped_elsewhere).concat(&added_elsewhere)
}

/// Merges `remote` into `local`; `base` is the remote queue as last seen
pub fn merge_snapshots(
    local: &StoreSnapshot,
    remote: &StoreSnapshot,
    base: &RefinementQueue,
) -> (StoreSnapshot, MergeStats) {
    let mut stats = MergeStats::default();
    let mut ratings = local.ratings.clone();

    for (id, remote_rating) in remote.ratings.iter() {
        match local.ratings.get(id) {
            Some(local_rating) if pick(local_rating, remote_rating) => {
                stats.took_remote += 1;
                ratings.insert(id.clone(), *remote_rating);
            }
            Some(_) => stats.kept_local += 1,
            None => {
                stats.added_remote += 1;
                ratings.insert(id.clone(), *remote_rating);
            }
        }
    }

    let (total_battles, total_battles_last_updated) = if remote_wins(
        local.total_battles_timestamp(),
        remote.total_battles_timestamp(),
    ) {
        stats.took_remote_total = true;
        (remote.total_battles, remote.total_battles_last_updated)
    } else {
        (local.total_battles, local.total_battles_last_updated)
    };

    let merged = StoreSnapshot {
        ratings,
        pending_battles: local.pending_battles.union(&remote.pending_battles),
        refinement_queue: merge_queues(&local.refinement_queue, &remote.refinement_queue, base),
        total_battles,
        total_battles_last_updated,
    };
    (merged, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use duelrank_core::{ItemId, RefinementBattle};

    fn none() -> RefinementQueue {
        RefinementQueue::new()
    }

    fn queue(entries: &[(&str, &str)]) -> RefinementQueue {
        entries
            .iter()
            .map(|(p, o)| RefinementBattle {
                primary_item_id: ItemId::from(*p),
                opponent_item_id: ItemId::from(*o),
                priority: 0,
            })
            .collect()
    }

    fn with_queue(q: &RefinementQueue) -> StoreSnapshot {
        let mut snapshot = StoreSnapshot::new();
        snapshot.refinement_queue = q.clone();
        snapshot
    }

    fn at(millis: i64) -> Timestamp {
        Timestamp::from_millis(millis)
    }

    fn rating(mu: f64, battles: u32, stamp: i64) -> Rating {
        Rating {
            mu,
            sigma: 2.0,
            battle_count: battles,
            last_updated: Some(at(stamp)),
        }
    }

    fn with_ratings(entries: &[(&str, Rating)]) -> StoreSnapshot {
        let mut snapshot = StoreSnapshot::new();
        for (id, r) in entries {
            snapshot.ratings.insert(ItemId::from(*id), *r);
        }
        snapshot
    }

    #[test]
    fn test_newer_remote_replaces_whole_record() {
        let local = with_ratings(&[("x", rating(10.0, 7, 100))]);
        let remote = with_ratings(&[("x", rating(20.0, 2, 200))]);

        let (merged, stats) = merge_snapshots(&local, &remote, &none());
        assert_eq!(merged.ratings.get(&ItemId::from("x")), Some(&rating(20.0, 2, 200)));
        assert_eq!(stats.took_remote, 1);
    }

    #[test]
    fn test_newer_local_is_kept() {
        let local = with_ratings(&[("x", rating(10.0, 7, 300))]);
        let remote = with_ratings(&[("x", rating(20.0, 2, 200))]);

        let (merged, stats) = merge_snapshots(&local, &remote, &none());
        assert_eq!(merged.ratings.get(&ItemId::from("x")).unwrap().mu, 10.0);
        assert_eq!(stats.kept_local, 1);
        assert_eq!(stats.changed(), 0);
    }

    #[test]
    fn test_equal_stamps_go_to_remote() {
        let local = with_ratings(&[("x", rating(10.0, 1, 100))]);
        let remote = with_ratings(&[("x", rating(20.0, 1, 100))]);

        let (merged, _) = merge_snapshots(&local, &remote, &none());
        assert_eq!(merged.ratings.get(&ItemId::from("x")).unwrap().mu, 20.0);
    }

    #[test]
    fn test_missing_stamp_loses_to_any_stamp() {
        let local = with_ratings(&[("x", Rating::new(10.0, 2.0))]);
        let remote = with_ratings(&[("x", rating(20.0, 1, 1))]);
        let (merged, _) = merge_snapshots(&local, &remote, &none());
        assert_eq!(merged.ratings.get(&ItemId::from("x")).unwrap().mu, 20.0);

        let (merged, _) = merge_snapshots(&remote, &local, &none());
        assert_eq!(merged.ratings.get(&ItemId::from("x")).unwrap().mu, 20.0);
    }

    #[test]
    fn test_one_sided_items_are_kept() {
        let local = with_ratings(&[("a", rating(10.0, 1, 100))]);
        let remote = with_ratings(&[("b", rating(20.0, 1, 100))]);

        let (merged, stats) = merge_snapshots(&local, &remote, &none());
        assert_eq!(merged.ratings.len(), 2);
        assert_eq!(stats.added_remote, 1);
    }

    #[test]
    fn test_total_battles_is_one_value() {
        let mut local = StoreSnapshot::new();
        local.total_battles = 50;
        local.total_battles_last_updated = Some(at(100));
        let mut remote = StoreSnapshot::new();
        remote.total_battles = 3;
        remote.total_battles_last_updated = Some(at(200));

        let (merged, stats) = merge_snapshots(&local, &remote, &none());
        assert_eq!(merged.total_battles, 3);
        assert_eq!(merged.total_battles_last_updated, Some(at(200)));
        assert!(stats.took_remote_total);

        let (merged, _) = merge_snapshots(&remote, &local, &none());
        assert_eq!(merged.total_battles, 3);
    }

    #[test]
    fn test_queues_union_and_concat() {
        let mut local = StoreSnapshot::new();
        local.pending_battles.insert(ItemId::from("a"));
        local
            .refinement_queue
            .enqueue(&ItemId::from("p"), &[ItemId::from("q")], 1);
        let mut remote = StoreSnapshot::new();
        remote.pending_battles.insert(ItemId::from("a"));
        remote.pending_battles.insert(ItemId::from("b"));
        remote
            .refinement_queue
            .enqueue(&ItemId::from("p"), &[ItemId::from("q")], 0);

        let (merged, _) = merge_snapshots(&local, &remote, &none());
        assert_eq!(merged.pending_battles.len(), 2);
        let queue: Vec<&RefinementBattle> = merged.refinement_queue.iter().collect();
        assert_eq!(queue.len(), 2);
        assert_eq!(queue[0].priority, 0);
        assert_eq!(queue[1].priority, 1);
    }

    #[test]
    fn test_echo_of_own_queue_is_not_doubled() {
        let mine = queue(&[("p", "a"), ("p", "b")]);

        let (merged, _) = merge_snapshots(&with_queue(&mine), &with_queue(&mine), &mine);
        assert_eq!(merged.refinement_queue, mine);

        // Without a base an echo cannot be told apart from new entries
        let (merged, _) = merge_snapshots(&with_queue(&mine), &with_queue(&mine), &none());
        assert_eq!(merged.refinement_queue.len(), 4);
    }

    #[test]
    fn test_local_pop_survives_stale_remote() {
        let base = queue(&[("p", "a"), ("p", "b")]);
        let local = queue(&[("p", "b")]);

        let (merged, _) = merge_snapshots(&with_queue(&local), &with_queue(&base), &base);
        assert_eq!(merged.refinement_queue, local);
    }

    #[test]
    fn test_remote_pop_and_add_apply_locally() {
        let base = queue(&[("p", "a"), ("p", "b")]);
        let local = queue(&[("p", "a"), ("p", "b"), ("x", "y")]);
        let remote = queue(&[("p", "b"), ("r", "s")]);

        let (merged, _) = merge_snapshots(&with_queue(&local), &with_queue(&remote), &base);
        assert_eq!(merged.refinement_queue, queue(&[("p", "b"), ("x", "y"), ("r", "s")]));
    }

    #[test]
    fn test_duplicates_are_counted() {
        let base = queue(&[("p", "a")]);
        let local = queue(&[("p", "a")]);
        let remote = queue(&[("p", "a"), ("p", "a")]);

        let (merged, _) = merge_snapshots(&with_queue(&local), &with_queue(&remote), &base);
        assert_eq!(merged.refinement_queue.len(), 2);
    }
}
