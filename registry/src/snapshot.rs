use chrono::{DateTime, Utc};
use common::models::{normalize_label, Coin, CoinKey};

/// Immutable deep copy of the registry taken after all merge passes.
///
/// Ranking reads from a snapshot only, so recalculations with different
/// hash rates never touch the canonical data.
#[derive(Debug, Clone)]
pub struct CoinSnapshot {
    coins: Vec<Coin>,
    taken_at: DateTime<Utc>,
}

impl CoinSnapshot {
    pub fn from_coins(coins: Vec<Coin>) -> Self {
        Self {
            coins,
            taken_at: Utc::now(),
        }
    }

    pub fn coins(&self) -> &[Coin] {
        &self.coins
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    pub fn len(&self) -> usize {
        self.coins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
    }

    /// Non-multi-pool coin with the given identity
    pub fn get(&self, key: &CoinKey) -> Option<&Coin> {
        self.coins
            .iter()
            .find(|c| !c.is_multi_pool && c.tag_name == key.tag_name && c.algorithm == key.algorithm)
    }

    /// All coins sharing a tag, across algorithms
    pub fn by_tag<'a>(&'a self, tag_name: &str) -> impl Iterator<Item = &'a Coin> + 'a {
        let tag = normalize_label(tag_name);
        self.coins.iter().filter(move |c| c.tag_name == tag)
    }
}
