use crate::{CoinSnapshot, RegistryError};
use common::models::{normalize_label, Coin, CoinKey, ExchangeQuote, MarketTicker, PriceSelection};
use common::REFERENCE_CURRENCY;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, RwLock};
use tracing::{debug, info};

/// What `add_or_update` did with a coin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AddOutcome {
    Inserted,
    /// An existing record with a lower chain height was discarded
    Replaced,
    /// An existing record with an equal or higher chain height was kept
    Dropped,
}

/// Result of merging one exchange's markets
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    pub exchange: String,
    /// Coins that received at least one quote
    pub coins_matched: usize,
    pub quotes_added: usize,
    /// BTC markets without a usable price
    pub tickers_rejected: usize,
}

#[derive(Default)]
struct Entries {
    coins: Vec<Mutex<Coin>>,
    /// Slot of every non-multi-pool coin by identity
    index: HashMap<CoinKey, usize>,
}

/// Deduplicated set of coins merged from every provider and exchange.
///
/// The list sits behind a reader/writer lock and every coin behind its own
/// mutex: inserts take the write lock, exchange merges take the read lock and
/// only serialize on the coin they append to.
#[derive(Default)]
pub struct CoinRegistry {
    entries: RwLock<Entries>,
}

impl CoinRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a coin from a network-data provider.
    ///
    /// For an existing non-multi-pool coin with the same identity the record
    /// with the strictly higher chain height wins; ties keep the first one.
    pub fn add_or_update(&self, coin: Coin) -> Result<AddOutcome, RegistryError> {
        let mut entries = self.entries.write()?;

        if coin.is_multi_pool {
            debug!("Inserting multi-pool {} from {}", coin.key(), coin.source);
            entries.coins.push(Mutex::new(coin));
            return Ok(AddOutcome::Inserted);
        }

        let key = coin.key();
        match entries.index.get(&key).copied() {
            Some(slot) => {
                let existing = entries.coins[slot].get_mut()?;
                if existing.chain_height < coin.chain_height {
                    debug!(
                        "Replacing {} from {} (height {}) with {} (height {})",
                        key, existing.source, existing.chain_height, coin.source, coin.chain_height
                    );
                    *existing = coin;
                    Ok(AddOutcome::Replaced)
                } else {
                    debug!(
                        "Dropping {} from {} (height {}), keeping {} (height {})",
                        key, coin.source, coin.chain_height, existing.source, existing.chain_height
                    );
                    Ok(AddOutcome::Dropped)
                }
            }
            None => {
                let slot = entries.coins.len();
                entries.coins.push(Mutex::new(coin));
                entries.index.insert(key, slot);
                Ok(AddOutcome::Inserted)
            }
        }
    }

    /// Attach a quote to the coin with the given identity.
    ///
    /// Returns `false` without touching anything when no coin matches.
    pub fn merge_exchange_quote(
        &self,
        tag_name: &str,
        algorithm: &str,
        quote: ExchangeQuote,
    ) -> Result<bool, RegistryError> {
        let entries = self.entries.read()?;
        let key = CoinKey::new(tag_name, algorithm);

        match entries.index.get(&key) {
            Some(&slot) => {
                entries.coins[slot].lock()?.push_quote(quote);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Merge one exchange's markets into every coin whose tag matches.
    ///
    /// Only markets priced in the reference currency are used. Exchanges do
    /// not know algorithms, so every non-multi-pool coin sharing a tag gets
    /// the quote. Re-applying the same batch counts its volume twice.
    pub fn merge_market_batch(
        &self,
        exchange_name: &str,
        tickers: &[MarketTicker],
        selection: PriceSelection,
        order_depth: bool,
    ) -> Result<MergeSummary, RegistryError> {
        let mut by_tag: HashMap<String, Vec<ExchangeQuote>> = HashMap::new();
        let mut tickers_rejected = 0;

        for ticker in tickers
            .iter()
            .filter(|t| normalize_label(&t.quote) == REFERENCE_CURRENCY)
        {
            match ExchangeQuote::from_ticker(exchange_name, ticker, selection, order_depth) {
                Ok(quote) => by_tag
                    .entry(normalize_label(&ticker.base))
                    .or_default()
                    .push(quote),
                Err(e) => {
                    debug!("Skipping market: {}", e);
                    tickers_rejected += 1;
                }
            }
        }

        let entries = self.entries.read()?;
        let added = entries
            .coins
            .par_iter()
            .map(|slot| -> Result<usize, RegistryError> {
                let mut coin = slot.lock()?;
                if coin.is_multi_pool {
                    return Ok(0);
                }

                match by_tag.get(&coin.tag_name) {
                    Some(quotes) => {
                        for quote in quotes {
                            coin.push_quote(quote.clone());
                        }
                        Ok(quotes.len())
                    }
                    None => Ok(0),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        let summary = MergeSummary {
            exchange: exchange_name.to_string(),
            coins_matched: added.iter().filter(|n| **n > 0).count(),
            quotes_added: added.iter().sum(),
            tickers_rejected,
        };

        info!(
            "Merged {}: {} quotes into {} coins ({} markets rejected)",
            exchange_name, summary.quotes_added, summary.coins_matched, summary.tickers_rejected
        );

        Ok(summary)
    }

    /// Deep copy of every coin
    pub fn snapshot(&self) -> Result<CoinSnapshot, RegistryError> {
        let entries = self.entries.read()?;
        let coins = entries
            .coins
            .iter()
            .map(|slot| slot.lock().map(|coin| coin.clone()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CoinSnapshot::from_coins(coins))
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.coins.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::models::{NetworkRecord, TradingPair};
    use std::collections::HashSet;

    fn coin(tag: &str, algo: &str, height: u64, source: &str) -> Coin {
        let record = NetworkRecord {
            tag_name: tag.to_string(),
            full_name: tag.to_string(),
            algorithm_label: algo.to_string(),
            difficulty: 100.0,
            difficulty_24h: None,
            block_reward: 50.0,
            chain_height: height,
            is_multi_pool: false,
            primary_quote: None,
        };
        Coin::from_record(record, algo, source)
    }

    fn multi_pool(tag: &str, algo: &str) -> Coin {
        let record = NetworkRecord {
            tag_name: tag.to_string(),
            full_name: format!("NiceHash {}", algo),
            algorithm_label: algo.to_string(),
            difficulty: 0.0,
            difficulty_24h: None,
            block_reward: 0.0,
            chain_height: 0,
            is_multi_pool: true,
            primary_quote: Some(ExchangeQuote::new("NiceHash", 0.01, 0.0)),
        };
        Coin::from_record(record, algo, "NiceHash")
    }

    fn ticker(base: &str, quote: &str, last: Option<f64>, volume: f64) -> MarketTicker {
        MarketTicker {
            last,
            ..MarketTicker::new(
                TradingPair {
                    base: base.to_string(),
                    quote: quote.to_string(),
                },
                volume,
            )
        }
    }

    #[test]
    fn test_higher_height_wins_in_either_order() {
        let registry = CoinRegistry::new();
        assert_eq!(registry.add_or_update(coin("LTC", "SCRYPT", 100, "A")).unwrap(), AddOutcome::Inserted);
        assert_eq!(registry.add_or_update(coin("LTC", "SCRYPT", 200, "B")).unwrap(), AddOutcome::Replaced);
        let snapshot = registry.snapshot().unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.coins()[0].source, "B");

        let registry = CoinRegistry::new();
        registry.add_or_update(coin("LTC", "SCRYPT", 200, "B")).unwrap();
        assert_eq!(registry.add_or_update(coin("LTC", "SCRYPT", 100, "A")).unwrap(), AddOutcome::Dropped);
        let snapshot = registry.snapshot().unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.coins()[0].source, "B");
    }

    #[test]
    fn test_equal_height_keeps_first_seen() {
        let registry = CoinRegistry::new();
        registry.add_or_update(coin("LTC", "SCRYPT", 100, "A")).unwrap();
        assert_eq!(registry.add_or_update(coin("ltc", "scrypt", 100, "B")).unwrap(), AddOutcome::Dropped);
        assert_eq!(registry.snapshot().unwrap().coins()[0].source, "A");
    }

    #[test]
    fn test_same_tag_different_algorithm_are_distinct() {
        let registry = CoinRegistry::new();
        registry.add_or_update(coin("MYR", "SHA256", 10, "A")).unwrap();
        registry.add_or_update(coin("MYR", "SCRYPT", 10, "A")).unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_multi_pools_never_deduplicated() {
        let registry = CoinRegistry::new();
        registry.add_or_update(multi_pool("NICESCRYPT", "SCRYPT")).unwrap();
        registry.add_or_update(multi_pool("NICESCRYPT", "SCRYPT")).unwrap();
        registry.add_or_update(coin("NICESCRYPT", "SCRYPT", 5, "A")).unwrap();
        assert_eq!(registry.len(), 3);

        let snapshot = registry.snapshot().unwrap();
        assert!(snapshot.coins()[0].has_market_data);
        assert_eq!(
            snapshot.get(&CoinKey::new("NICESCRYPT", "SCRYPT")).unwrap().source,
            "A"
        );
    }

    #[test]
    fn test_no_duplicate_identities_for_any_sequence() {
        let tags = ["LTC", "DOGE", "ltc", "FTC"];
        let algos = ["SCRYPT", "scrypt", "X11"];
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = || {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            seed
        };

        for _ in 0..20 {
            let registry = CoinRegistry::new();
            for _ in 0..60 {
                let n = next();
                let tag = tags[(n % tags.len() as u64) as usize];
                let algo = algos[((n >> 8) % algos.len() as u64) as usize];
                let height = (n >> 16) % 5;
                if (n >> 24) % 7 == 0 {
                    registry.add_or_update(multi_pool(tag, algo)).unwrap();
                } else {
                    registry.add_or_update(coin(tag, algo, height, "P")).unwrap();
                }
            }

            let snapshot = registry.snapshot().unwrap();
            let mut seen = HashSet::new();
            for c in snapshot.coins().iter().filter(|c| !c.is_multi_pool) {
                assert!(seen.insert(c.key()), "duplicate {}", c.key());
            }
        }
    }

    #[test]
    fn test_merge_exchange_quote() {
        let registry = CoinRegistry::new();
        registry.add_or_update(coin("LTC", "SCRYPT", 1, "A")).unwrap();

        assert!(registry
            .merge_exchange_quote("ltc", "Scrypt", ExchangeQuote::new("Bittrex", 0.02, 60.0))
            .unwrap());
        assert!(registry
            .merge_exchange_quote("LTC", "SCRYPT", ExchangeQuote::new("Poloniex", 0.03, 40.0))
            .unwrap());
        assert!(!registry
            .merge_exchange_quote("LTC", "X11", ExchangeQuote::new("Poloniex", 0.03, 40.0))
            .unwrap());

        let snapshot = registry.snapshot().unwrap();
        let ltc = &snapshot.coins()[0];
        assert!(ltc.has_market_data);
        assert_eq!(ltc.quotes.len(), 2);
        assert_eq!(ltc.total_volume, 100.0);
    }

    #[test]
    fn test_merge_market_batch_matches_btc_markets_by_tag() {
        let registry = CoinRegistry::new();
        registry.add_or_update(coin("LTC", "SCRYPT", 1, "A")).unwrap();
        registry.add_or_update(coin("DOGE", "SCRYPT", 1, "A")).unwrap();
        registry.add_or_update(coin("DOGE", "X11", 1, "A")).unwrap();
        registry.add_or_update(multi_pool("DOGE", "SCRYPT")).unwrap();

        let tickers = vec![
            ticker("LTC", "BTC", Some(0.02), 30.0),
            ticker("LTC", "USDT", Some(9.0), 1000.0),
            ticker("DOGE", "btc", Some(0.0000004), 5.0),
            ticker("VTC", "BTC", Some(0.0001), 1.0),
            ticker("FTC", "BTC", None, 1.0),
        ];

        let summary = registry
            .merge_market_batch("Bittrex", &tickers, PriceSelection::Last, false)
            .unwrap();
        assert_eq!(summary.exchange, "Bittrex");
        assert_eq!(summary.coins_matched, 3);
        assert_eq!(summary.quotes_added, 3);
        assert_eq!(summary.tickers_rejected, 1);

        let snapshot = registry.snapshot().unwrap();
        let ltc = snapshot.get(&CoinKey::new("LTC", "SCRYPT")).unwrap();
        assert_eq!(ltc.quotes.len(), 1);
        assert_eq!(ltc.total_volume, 30.0);
        assert_eq!(snapshot.by_tag("doge").filter(|c| c.has_market_data).count(), 3);

        let pool = snapshot.coins().iter().find(|c| c.is_multi_pool).unwrap();
        assert_eq!(pool.quotes.len(), 1);
    }

    #[test]
    fn test_concurrent_merges_lose_no_volume() {
        let registry = CoinRegistry::new();
        registry.add_or_update(coin("LTC", "SCRYPT", 1, "A")).unwrap();
        registry.add_or_update(coin("LTC", "X11", 1, "A")).unwrap();

        std::thread::scope(|scope| {
            for worker in 0..4 {
                let registry = &registry;
                scope.spawn(move || {
                    let name = format!("Exchange{}", worker);
                    let batch = vec![ticker("LTC", "BTC", Some(0.02), 1.0)];
                    for _ in 0..25 {
                        registry
                            .merge_market_batch(&name, &batch, PriceSelection::Bid, false)
                            .unwrap();
                        registry
                            .merge_exchange_quote("LTC", "SCRYPT", ExchangeQuote::new(&name, 0.02, 1.0))
                            .unwrap();
                    }
                });
            }
        });

        let snapshot = registry.snapshot().unwrap();
        let scrypt = snapshot.get(&CoinKey::new("LTC", "SCRYPT")).unwrap();
        assert_eq!(scrypt.quotes.len(), 200);
        assert_eq!(scrypt.total_volume, 200.0);
        let x11 = snapshot.get(&CoinKey::new("LTC", "X11")).unwrap();
        assert_eq!(x11.quotes.len(), 100);
        assert_eq!(x11.total_volume, 100.0);
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_merges() {
        let registry = CoinRegistry::new();
        registry.add_or_update(coin("LTC", "SCRYPT", 1, "A")).unwrap();
        let before = registry.snapshot().unwrap();

        registry
            .merge_exchange_quote("LTC", "SCRYPT", ExchangeQuote::new("Bittrex", 0.02, 10.0))
            .unwrap();

        assert!(before.coins()[0].quotes.is_empty());
        assert_eq!(registry.snapshot().unwrap().coins()[0].quotes.len(), 1);
    }
}
