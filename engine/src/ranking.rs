use crate::calculator::{CalcParams, FiatContext, ProfitCalculator, Yields};
use crate::matcher::AlgorithmMatcher;
use common::models::{normalize_label, Coin, CoinKey, FiatRates, Profile};
use rayon::prelude::*;
use registry::CoinSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// What-if hash rate replacing the profile's figure for one algorithm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HashRateOverride {
    pub algorithm: String,
    /// Mh/s
    pub hash_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCoin {
    pub coin: Coin,
    /// Name of the algorithm entry the coin resolved to
    pub algorithm: String,
    pub hash_rate: f64,
    pub reward_style: Option<String>,
    pub reward_target: Option<f64>,
    /// Some market the price came from is frozen for trading
    pub has_frozen_markets: bool,
    pub yields: Yields,
}

/// A coin of interest whose yield could not be computed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedCoin {
    pub key: CoinKey,
    pub is_multi_pool: bool,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Ranking {
    pub profile: String,
    /// Most profitable first
    pub ranked: Vec<RankedCoin>,
    pub rejected: Vec<RejectedCoin>,
}

impl Ranking {
    pub fn top(&self) -> Option<&RankedCoin> {
        self.ranked.first()
    }

    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }
}

enum Outcome {
    Ranked(RankedCoin),
    Rejected(RejectedCoin),
    Skipped,
}

/// Compute and order the yield of every coin of interest in `snapshot`.
///
/// Coins whose algorithm does not resolve to an enabled profile entry are
/// left out. Coins that fail to compute land in `rejected` and never abort
/// the pass. Ties keep snapshot order, so the same snapshot and profile
/// always produce the same ranking.
pub fn rank(
    snapshot: &CoinSnapshot,
    profile: &Profile,
    fiat_rates: Option<&FiatRates>,
    overrides: &[HashRateOverride],
) -> Ranking {
    let matcher = AlgorithmMatcher::new(&profile.algorithms);
    let overrides = resolve_overrides(&matcher, overrides);

    let fiat = match (profile.calc_fiat, fiat_rates) {
        (true, Some(rates)) => Some(FiatContext::from_profile(profile, *rates)),
        (true, None) => {
            warn!("Fiat adjustment requested but no exchange rates available, ranking on gross yield");
            None
        }
        (false, _) => None,
    };

    let outcomes: Vec<Outcome> = snapshot
        .coins()
        .par_iter()
        .map(|coin| evaluate(coin, &matcher, profile, &overrides, fiat.as_ref()))
        .collect();

    let mut ranking = Ranking {
        profile: profile.name.clone(),
        ..Default::default()
    };
    for outcome in outcomes {
        match outcome {
            Outcome::Ranked(ranked) => ranking.ranked.push(ranked),
            Outcome::Rejected(rejected) => ranking.rejected.push(rejected),
            Outcome::Skipped => {}
        }
    }

    ranking
        .ranked
        .sort_by(|a, b| b.yields.currency_per_day.total_cmp(&a.yields.currency_per_day));

    debug!(
        "Ranked {} coins for profile '{}' ({} rejected, {} in snapshot)",
        ranking.ranked.len(),
        ranking.profile,
        ranking.rejected.len(),
        snapshot.len()
    );

    ranking
}

fn resolve_overrides(matcher: &AlgorithmMatcher<'_>, overrides: &[HashRateOverride]) -> HashMap<String, f64> {
    let mut resolved = HashMap::new();
    for o in overrides {
        if !(o.hash_rate.is_finite() && o.hash_rate >= 0.0) {
            warn!("Ignoring hash rate override {} for {}", o.hash_rate, o.algorithm);
            continue;
        }
        match matcher.resolve_name(&o.algorithm) {
            Some(name) => {
                resolved.insert(name, o.hash_rate);
            }
            None => warn!("Ignoring hash rate override for unknown algorithm {}", o.algorithm),
        }
    }
    resolved
}

fn evaluate(
    coin: &Coin,
    matcher: &AlgorithmMatcher<'_>,
    profile: &Profile,
    overrides: &HashMap<String, f64>,
    fiat: Option<&FiatContext>,
) -> Outcome {
    let entry = match matcher.resolve(&coin.algorithm) {
        Some(entry) if entry.enabled => entry,
        _ => return Outcome::Skipped,
    };

    let algorithm = normalize_label(&entry.name);
    let mut params = CalcParams::for_entry(entry, profile);
    if let Some(hash_rate) = overrides.get(&algorithm) {
        params.hash_rate = *hash_rate;
    }

    match ProfitCalculator::compute(coin, &params, fiat) {
        Ok(calc) => Outcome::Ranked(RankedCoin {
            has_frozen_markets: calc.coin.has_frozen_markets(),
            coin: calc.coin,
            algorithm,
            hash_rate: params.hash_rate,
            reward_style: params.reward_style,
            reward_target: params.reward_target,
            yields: calc.yields,
        }),
        Err(e) => {
            if e.is_per_coin() {
                debug!("Skipping {} from {}: {}", coin.key(), coin.source, e);
            } else {
                warn!("Failed to compute {} from {}: {}", coin.key(), coin.source, e);
            }
            Outcome::Rejected(RejectedCoin {
                key: coin.key(),
                is_multi_pool: coin.is_multi_pool,
                reason: e.to_string(),
            })
        }
    }
}
