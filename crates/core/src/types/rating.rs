//! Item ratings and the rating set

use crate::types::Timestamp;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Skill estimate of an unrated item
pub const DEFAULT_MU: f64 = 25.0;

/// Uncertainty of an unrated item (25 / 3)
pub const DEFAULT_SIGMA: f64 = 25.0 / 3.0;

/// Smallest sigma the store will ever hold. Sigma must stay strictly positive.
pub const MIN_SIGMA: f64 = 1e-4;

/// Identifier of a rankable item
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(String);

impl ItemId {
    /// Creates an item id from anything string-like
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A bare `(mu, sigma)` pair, as consumed and produced by a skill-rating model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Skill {
    pub mu: f64,
    pub sigma: f64,
}

impl Skill {
    pub fn new(mu: f64, sigma: f64) -> Self {
        Self { mu, sigma }
    }

    /// `mu - sigma`
    pub fn conservative_score(&self) -> f64 {
        self.mu - self.sigma
    }
}

/// Stored rating of one item
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    /// Skill estimate
    pub mu: f64,
    /// Uncertainty, always > 0
    pub sigma: f64,
    /// Number of battles this item took part in
    #[serde(default)]
    pub battle_count: u32,
    /// Last local or remote write; absent on legacy records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<Timestamp>,
}

impl Rating {
    /// Creates an unstamped rating with no battles
    pub fn new(mu: f64, sigma: f64) -> Self {
        Self {
            mu,
            sigma,
            battle_count: 0,
            last_updated: None,
        }
    }

    /// The sort key: `mu - sigma`
    pub fn conservative_score(&self) -> f64 {
        self.mu - self.sigma
    }

    /// Returns the `(mu, sigma)` pair
    pub fn skill(&self) -> Skill {
        Skill::new(self.mu, self.sigma)
    }

    /// Timestamp used by last-write-wins comparisons
    pub fn effective_timestamp(&self) -> Timestamp {
        Timestamp::or_epoch(self.last_updated)
    }

    /// Returns a copy stamped with the given time
    pub fn stamped(mut self, at: Timestamp) -> Self {
        self.last_updated = Some(at);
        self
    }

    /// Builds a rating whose conservative score is exactly `score`
    pub fn with_score(score: f64, sigma: f64) -> Self {
        Self::new(score + sigma, sigma)
    }
}

impl Default for Rating {
    fn default() -> Self {
        Self::new(DEFAULT_MU, DEFAULT_SIGMA)
    }
}

/// Clamps a `(mu, sigma)` pair into the store's invariants.
///
/// Returns the sanitized pair and whether anything had to change.
pub fn sanitize_skill(mu: f64, sigma: f64) -> (Skill, bool) {
    let clean_mu = if mu.is_finite() { mu } else { DEFAULT_MU };
    let clean_sigma = if sigma.is_finite() && sigma >= MIN_SIGMA {
        sigma
    } else {
        MIN_SIGMA
    };
    // NaN never compares equal, so a NaN input always reports a change
    let changed = clean_mu != mu || clean_sigma != sigma;
    (Skill::new(clean_mu, clean_sigma), changed)
}

/// A requested write of new `(mu, sigma)` values for one item
#[derive(Debug, Clone, PartialEq)]
pub struct RatingUpdate {
    pub item: ItemId,
    pub mu: f64,
    pub sigma: f64,
}

impl RatingUpdate {
    pub fn new(item: ItemId, mu: f64, sigma: f64) -> Self {
        Self { item, mu, sigma }
    }

    pub fn conservative_score(&self) -> f64 {
        self.mu - self.sigma
    }
}

/// An item paired with its rating, as shown in the ranked list
#[derive(Debug, Clone, PartialEq)]
pub struct RankedItem {
    pub id: ItemId,
    pub rating: Rating,
}

impl RankedItem {
    pub fn new(id: ItemId, rating: Rating) -> Self {
        Self { id, rating }
    }

    pub fn score(&self) -> f64 {
        self.rating.conservative_score()
    }
}

/// All ratings of a session keyed by item id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RatingSet(BTreeMap<ItemId, Rating>);

impl RatingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &ItemId) -> Option<&Rating> {
        self.0.get(id)
    }

    pub fn get_mut(&mut self, id: &ItemId) -> Option<&mut Rating> {
        self.0.get_mut(id)
    }

    /// Inserts or replaces a rating, returning the previous one
    pub fn insert(&mut self, id: ItemId, rating: Rating) -> Option<Rating> {
        self.0.insert(id, rating)
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.0.contains_key(id)
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

    pub fn iter(&self) -> impl Iterator<Item = (&ItemId, &Rating)> {
        self.0.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ItemId> {
        self.0.keys()
    }

    /// Items sorted by descending conservative score.
    ///
    /// Equal scores fall back to id order so the list is stable between reads.
    pub fn ranked(&self) -> Vec<RankedItem> {
        let mut items: Vec<RankedItem> = self
            .0
            .iter()
            .map(|(id, rating)| RankedItem::new(id.clone(), *rating))
            .collect();
        items.sort_by(|a, b| {
            b.score()
                .partial_cmp(&a.score())
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        items
    }
}

impl FromIterator<(ItemId, Rating)> for RatingSet {
    fn from_iter<T: IntoIterator<Item = (ItemId, Rating)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for RatingSet {
    type Item = (ItemId, Rating);
    type IntoIter = std::collections::btree_map::IntoIter<ItemId, Rating>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
