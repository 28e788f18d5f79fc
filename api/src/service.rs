use chrono::{DateTime, Utc};
use common::{
    models::{normalize_label, Coin, FiatRates, NetworkRecord, Profile},
    Error, Result,
};
use connectors::{ExchangeConnector, FiatRateProvider, NetworkDataProvider};
use engine::{AlgorithmMatcher, HashRateOverride, Ranking};
use futures::future::join_all;
use futures::stream::{FuturesUnordered, StreamExt};
use registry::{AddOutcome, CoinRegistry, CoinSnapshot, MergeSummary};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// What one network-data provider contributed to a refresh
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProviderReport {
    pub provider: String,
    pub records: usize,
    pub inserted: usize,
    pub replaced: usize,
    pub dropped: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderFailure {
    pub provider: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Coins in the new snapshot
    pub coins: usize,
    pub providers: Vec<ProviderReport>,
    pub exchanges: Vec<MergeSummary>,
    pub failures: Vec<ProviderFailure>,
}

/// Source name for coins defined in the profile
pub const CUSTOM_SOURCE: &str = "Custom";

/// A snapshot built by a refresh, not yet installed
pub struct Refreshed {
    pub snapshot: CoinSnapshot,
    pub report: RefreshReport,
}

/// Service collecting coin data from providers and ranking it for the profile
pub struct ProfitService {
    profile: Profile,
    providers: Vec<Arc<dyn NetworkDataProvider>>,
    exchanges: Vec<Arc<dyn ExchangeConnector>>,
    fiat: Option<Arc<dyn FiatRateProvider>>,
    /// Snapshot of the last completed refresh
    snapshot: Option<Arc<CoinSnapshot>>,
    last_report: Option<RefreshReport>,
}

impl ProfitService {
    pub fn new(
        profile: Profile,
        providers: Vec<Arc<dyn NetworkDataProvider>>,
        exchanges: Vec<Arc<dyn ExchangeConnector>>,
        fiat: Option<Arc<dyn FiatRateProvider>>,
    ) -> Self {
        Self {
            profile,
            providers,
            exchanges,
            fiat,
            snapshot: None,
            last_report: None,
        }
    }

    pub fn last_report(&self) -> Option<&RefreshReport> {
        self.last_report.as_ref()
    }

    /// Fetch every provider and exchange into a fresh registry and snapshot it.
    ///
    /// A failing provider or exchange is reported and skipped; the others
    /// still contribute. Dropping the returned future abandons the fetches in
    /// flight without touching the installed snapshot.
    pub async fn refresh(&self) -> Result<Refreshed> {
        let started_at = Utc::now();
        let registry = CoinRegistry::new();
        let matcher = AlgorithmMatcher::new(&self.profile.algorithms);
        let mut failures = Vec::new();

        // Provider results are applied in configuration order so height ties
        // resolve the same way on every refresh.
        let fetched = join_all(self.providers.iter().map(|provider| async move {
            (provider.name().to_string(), provider.fetch_coins().await)
        }))
        .await;

        let mut providers = Vec::with_capacity(fetched.len());
        for (name, result) in fetched {
            match result {
                Ok(records) => providers.push(ingest(&registry, &matcher, &name, records)?),
                Err(e) => {
                    error!("Network data provider {} failed: {}", name, e);
                    failures.push(ProviderFailure {
                        provider: name,
                        error: e.to_string(),
                    });
                }
            }
        }

        // Custom coins go in after the providers and before exchange data
        let custom = self.profile.custom_records();
        if !custom.is_empty() {
            providers.push(ingest(&registry, &matcher, CUSTOM_SOURCE, custom)?);
        }

        let selection = self.profile.price_selection;
        let order_depth = self.profile.order_depth;
        let mut pending: FuturesUnordered<_> = self
            .exchanges
            .iter()
            .map(|exchange| async move {
                (exchange.name().to_string(), exchange.fetch_markets(order_depth).await)
            })
            .collect();

        let mut exchanges = Vec::with_capacity(self.exchanges.len());
        while let Some((name, result)) = pending.next().await {
            match result {
                Ok(tickers) => {
                    exchanges.push(registry.merge_market_batch(&name, &tickers, selection, order_depth)?);
                }
                Err(e) => {
                    error!("Exchange {} failed: {}", name, e);
                    failures.push(ProviderFailure {
                        provider: name,
                        error: e.to_string(),
                    });
                }
            }
        }
        exchanges.sort_by(|a, b| a.exchange.cmp(&b.exchange));

        let snapshot = registry.snapshot()?;
        let report = RefreshReport {
            started_at,
            finished_at: Utc::now(),
            coins: snapshot.len(),
            providers,
            exchanges,
            failures,
        };

        if report.failures.is_empty() {
            info!("Refresh complete: {} coins", report.coins);
        } else {
            warn!(
                "Refresh complete with {} failed sources: {} coins",
                report.failures.len(),
                report.coins
            );
        }

        Ok(Refreshed { snapshot, report })
    }

    /// Make a refreshed snapshot the one rankings are computed from
    pub fn install(&mut self, refreshed: Refreshed) -> RefreshReport {
        self.snapshot = Some(Arc::new(refreshed.snapshot));
        self.last_report = Some(refreshed.report.clone());
        refreshed.report
    }

    async fn fiat_rates(&self) -> Option<FiatRates> {
        if !self.profile.calc_fiat {
            return None;
        }

        let provider = self.fiat.as_ref()?;
        match provider.fetch_rates().await {
            Ok(rates) => Some(rates),
            Err(e) => {
                warn!("{} rates unavailable, ranking without fiat adjustment: {}", provider.name(), e);
                None
            }
        }
    }

    /// Rank the installed snapshot, optionally with what-if hash rates
    pub async fn rank(&self, overrides: Vec<HashRateOverride>) -> Result<Ranking> {
        let snapshot = self
            .snapshot
            .clone()
            .ok_or_else(|| Error::NotFound("No coin data yet, refresh first".to_string()))?;
        let rates = self.fiat_rates().await;
        let profile = self.profile.clone();

        debug!(
            "Ranking {} coins taken at {} ({} overrides)",
            snapshot.len(),
            snapshot.taken_at(),
            overrides.len()
        );

        tokio::task::spawn_blocking(move || engine::rank(&snapshot, &profile, rates.as_ref(), &overrides))
            .await
            .map_err(|e| Error::InternalError(format!("Ranking task failed: {}", e)))
    }

    /// Ranking restricted to one tag, across algorithms
    pub async fn rank_tag(&self, tag: &str, overrides: Vec<HashRateOverride>) -> Result<Ranking> {
        let tag = normalize_label(tag);
        let mut ranking = self.rank(overrides).await?;

        ranking.ranked.retain(|r| r.coin.tag_name == tag);
        ranking.rejected.retain(|r| r.key.tag_name == tag);

        if ranking.ranked.is_empty() && ranking.rejected.is_empty() {
            return Err(Error::NotFound(format!("No ranked coin with tag '{}'", tag)));
        }
        Ok(ranking)
    }
}

// Add one source's records to the registry, counting what happened to each
fn ingest(
    registry: &CoinRegistry,
    matcher: &AlgorithmMatcher<'_>,
    name: &str,
    records: Vec<NetworkRecord>,
) -> Result<ProviderReport> {
    let mut report = ProviderReport {
        provider: name.to_string(),
        records: records.len(),
        ..Default::default()
    };
    for record in records {
        let algorithm = matcher.canonicalize(&record.algorithm_label);
        let coin = Coin::from_record(record, &algorithm, name);
        match registry.add_or_update(coin)? {
            AddOutcome::Inserted => report.inserted += 1,
            AddOutcome::Replaced => report.replaced += 1,
            AddOutcome::Dropped => report.dropped += 1,
        }
    }
    info!(
        "{}: {} records, {} inserted, {} replaced, {} dropped",
        name, report.records, report.inserted, report.replaced, report.dropped
    );
    Ok(report)
}
