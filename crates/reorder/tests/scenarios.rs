//! End-to-end behavior of the adjuster on whole lists

use duelrank_core::{ItemId, RankedItem, Rating, RatingSet};
use duelrank_reorder::{ReorderAdjuster, ReorderPlan, ReorderTuning};

fn set_of(scores: &[(&str, f64, f64)]) -> RatingSet {
    scores
        .iter()
        .map(|(id, score, sigma)| (ItemId::from(*id), Rating::with_score(*score, *sigma)))
        .collect()
}

fn apply(set: &mut RatingSet, plan: &ReorderPlan) {
    for update in plan.updates() {
        let rating = set.get(&update.item).copied().unwrap_or_default();
        set.insert(
            update.item.clone(),
            Rating {
                mu: update.mu,
                sigma: update.sigma,
                ..rating
            },
        );
    }
}

fn move_item(adjuster: &ReorderAdjuster, set: &mut RatingSet, item: &str, target: usize) -> ReorderPlan {
    let id = ItemId::from(item);
    let rating = set.get(&id).copied().unwrap_or_default();
    let plan = adjuster.plan(&set.ranked(), &id, rating, target);
    apply(set, &plan);
    plan
}

fn ids(items: &[RankedItem]) -> Vec<String> {
    items.iter().map(|item| item.id.to_string()).collect()
}

fn assert_strictly_decreasing(items: &[RankedItem]) {
    for pair in items.windows(2) {
        assert!(
            pair[0].score() > pair[1].score(),
            "{} ({}) is not above {} ({})",
            pair[0].id,
            pair[0].score(),
            pair[1].id,
            pair[1].score()
        );
    }
}

#[test]
fn test_new_item_moved_to_top_of_three() {
    let adjuster = ReorderAdjuster::default();
    let mut set = set_of(&[("ten", 10.0, 1.0), ("five", 5.0, 1.0), ("two", 2.0, 1.0)]);

    let plan = move_item(&adjuster, &mut set, "p", 0);

    let p = plan.moved_update().unwrap();
    assert!((p.conservative_score() - 10.001).abs() < 1e-9);
    assert_eq!(ids(&set.ranked()), vec!["p", "ten", "five", "two"]);
}

#[test]
fn test_insert_between_tied_items() {
    let adjuster = ReorderAdjuster::default();
    let mut set = set_of(&[("x", 5.0, 2.0), ("y", 5.0, 2.0)]);

    let plan = move_item(&adjuster, &mut set, "p", 1);

    let ranked = set.ranked();
    assert_eq!(ids(&ranked), vec!["x", "p", "y"]);
    assert!((ranked[0].score() - 5.00001).abs() < 1e-9);
    assert!((ranked[1].score() - 5.0).abs() < 1e-9);
    assert!((ranked[2].score() - 4.99999).abs() < 1e-9);
    assert!((ranked[0].rating.sigma - 2.0 * 0.9999).abs() < 1e-12);
    assert_eq!(plan.tie_break_count(), 2);
}

#[test]
fn test_long_tied_run_resolves_in_one_move() {
    let adjuster = ReorderAdjuster::default();
    let scores: Vec<(String, f64, f64)> = (0..200)
        .map(|i| (format!("item{:03}", i), 3.0, 1.5))
        .collect();
    let mut set: RatingSet = scores
        .iter()
        .map(|(id, score, sigma)| (ItemId::new(id.clone()), Rating::with_score(*score, *sigma)))
        .collect();

    let plan = move_item(&adjuster, &mut set, "p", 77);

    // every tied item is touched at most once
    assert!(plan.len() <= 201);
    let ranked = set.ranked();
    assert_strictly_decreasing(&ranked);
    assert_eq!(ranked[77].id, ItemId::from("p"));
}

#[test]
fn test_tied_run_squeezed_between_close_bounds() {
    let adjuster = ReorderAdjuster::default();
    let mut set = set_of(&[
        ("top", 5.000004, 1.0),
        ("a", 5.0, 1.0),
        ("b", 5.0, 1.0),
        ("c", 5.0, 1.0),
        ("d", 5.0, 1.0),
        ("bottom", 4.999996, 1.0),
    ]);

    move_item(&adjuster, &mut set, "p", 3);

    let ranked = set.ranked();
    assert_strictly_decreasing(&ranked);
    assert_eq!(ranked[0].id, ItemId::from("top"));
    assert_eq!(ranked[3].id, ItemId::from("p"));
    assert_eq!(ranked.last().unwrap().id, ItemId::from("bottom"));
}

#[test]
fn test_repeated_request_is_idempotent() {
    let adjuster = ReorderAdjuster::default();
    let mut set = set_of(&[
        ("a", 9.0, 2.0),
        ("b", 5.0, 2.0),
        ("c", 5.0, 2.0),
        ("d", 5.0, 2.0),
        ("e", 1.0, 2.0),
    ]);

    let first = move_item(&adjuster, &mut set, "p", 2);
    assert!(!first.is_empty());
    let after_first = set.clone();

    let second = move_item(&adjuster, &mut set, "p", 2);
    assert!(second.is_empty(), "second plan changed {:?}", second.updates());
    assert_eq!(set, after_first);
}

#[test]
fn test_items_outside_the_neighbor_chain_are_untouched() {
    let adjuster = ReorderAdjuster::default();
    let mut set = set_of(&[
        ("far", 20.0, 2.0),
        ("x", 5.0, 2.0),
        ("y", 5.0, 2.0),
        ("low", 1.0, 2.0),
    ]);
    let before = set.clone();

    let plan = move_item(&adjuster, &mut set, "p", 2);

    let touched: Vec<&ItemId> = plan.updates().iter().map(|u| &u.item).collect();
    assert!(!touched.contains(&&ItemId::from("far")));
    assert!(!touched.contains(&&ItemId::from("low")));
    assert_eq!(set.get(&ItemId::from("far")), before.get(&ItemId::from("far")));
}

#[test]
fn property_every_move_lands_where_requested() {
    let adjuster = ReorderAdjuster::new(ReorderTuning::default());
    let mut set: RatingSet = (0..30)
        .map(|i| {
            // a few clusters of identical scores
            let score = f64::from(i / 4);
            (ItemId::new(format!("n{:02}", i)), Rating::with_score(score, 1.0 + f64::from(i % 3)))
        })
        .collect();

    // deterministic pseudo-random walk over (item, target) pairs
    let mut seed: u64 = 0x2545_F491_4F6C_DD1D;
    for _ in 0..300 {
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        let item = format!("n{:02}", seed % 30);
        let target = ((seed >> 16) % 30) as usize;

        move_item(&adjuster, &mut set, &item, target);

        let ranked = set.ranked();
        assert_eq!(
            ranked[target].id,
            ItemId::new(item.clone()),
            "{} did not land at {}",
            item,
            target
        );
    }
}

#[test]
fn property_sigma_never_drops_below_floor() {
    let tuning = ReorderTuning {
        sigma_shrink: 0.5,
        ..ReorderTuning::default()
    };
    let adjuster = ReorderAdjuster::new(tuning);
    let mut set = set_of(&[("x", 5.0, 0.0002), ("y", 5.0, 0.0002)]);

    move_item(&adjuster, &mut set, "p", 1);

    for (_, rating) in set.iter() {
        assert!(rating.sigma >= tuning.min_sigma);
    }
}
