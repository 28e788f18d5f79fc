use crate::models::{normalize_label, AlgorithmFamily, ExchangeQuote};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of a canonical coin: normalized tag and algorithm
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CoinKey {
    pub tag_name: String,
    pub algorithm: String,
}

impl CoinKey {
    pub fn new(tag_name: &str, algorithm: &str) -> Self {
        Self {
            tag_name: normalize_label(tag_name),
            algorithm: normalize_label(algorithm),
        }
    }
}

impl std::fmt::Display for CoinKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.tag_name, self.algorithm)
    }
}

/// Network parameters for one coin as reported by a network-data provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkRecord {
    /// Ticker symbol (e.g., "LTC")
    pub tag_name: String,
    /// Human-readable name (e.g., "Litecoin")
    pub full_name: String,
    /// Algorithm as labelled by the provider, not yet canonicalized
    pub algorithm_label: String,
    pub difficulty: f64,
    /// 24h average difficulty, when the provider has one
    pub difficulty_24h: Option<f64>,
    pub block_reward: f64,
    pub chain_height: u64,
    /// Pool payout rate rather than a minable chain
    pub is_multi_pool: bool,
    /// Price observation bundled with the network data
    pub primary_quote: Option<ExchangeQuote>,
}

/// Canonical coin entity held by the registry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Coin {
    pub full_name: String,
    /// Normalized ticker symbol
    pub tag_name: String,
    /// Canonical (normalized) algorithm name
    pub algorithm: String,
    pub family: AlgorithmFamily,
    pub difficulty: f64,
    pub difficulty_24h: Option<f64>,
    pub block_reward: f64,
    pub chain_height: u64,
    pub is_multi_pool: bool,
    /// At least one exchange pass has contributed a quote
    pub has_market_data: bool,
    pub quotes: Vec<ExchangeQuote>,
    /// Sum of quote volumes in BTC
    pub total_volume: f64,
    /// Provider that created the record
    pub source: String,
    pub retrieved_at: DateTime<Utc>,
}

impl Coin {
    /// Build a coin from a provider record. `algorithm` is the canonical
    /// algorithm name the caller resolved from `record.algorithm_label`.
    pub fn from_record(record: NetworkRecord, algorithm: &str, source: &str) -> Self {
        let algorithm = normalize_label(algorithm);
        let family = AlgorithmFamily::classify(&algorithm, record.is_multi_pool);
        let quotes: Vec<ExchangeQuote> = record.primary_quote.into_iter().collect();
        let total_volume = quotes.iter().map(|q| q.volume).sum();

        Self {
            full_name: record.full_name,
            tag_name: normalize_label(&record.tag_name),
            algorithm,
            family,
            difficulty: record.difficulty,
            difficulty_24h: record.difficulty_24h,
            block_reward: record.block_reward,
            chain_height: record.chain_height,
            is_multi_pool: record.is_multi_pool,
            has_market_data: record.is_multi_pool,
            quotes,
            total_volume,
            source: source.to_string(),
            retrieved_at: Utc::now(),
        }
    }

    pub fn key(&self) -> CoinKey {
        CoinKey {
            tag_name: self.tag_name.clone(),
            algorithm: self.algorithm.clone(),
        }
    }

    /// Append an exchange quote and account for its volume.
    pub fn push_quote(&mut self, quote: ExchangeQuote) {
        self.total_volume += quote.volume;
        self.quotes.push(quote);
        self.has_market_data = true;
    }

    /// Sort quotes by volume, most liquid first.
    pub fn sort_quotes(&mut self) {
        self.quotes.sort_by(|a, b| b.volume.total_cmp(&a.volume));
    }

    pub fn has_frozen_markets(&self) -> bool {
        self.quotes.iter().any(|q| q.is_frozen)
    }
}
