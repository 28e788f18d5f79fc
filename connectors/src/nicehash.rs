use crate::{get_json, NetworkDataProvider, Numeric};
use async_trait::async_trait;
use common::{
    models::{ExchangeQuote, NetworkRecord},
    Result,
};
use serde::Deserialize;
use tracing::{debug, info, warn};

const NICEHASH_API_URL: &str = "https://www.nicehash.com/api?method=stats.global.current";
const PROVIDER_NAME: &str = "NiceHash";

pub struct NiceHashProvider {
    client: reqwest::Client,
}

impl NiceHashProvider {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for NiceHashProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct NiceHashResponse {
    result: NiceHashResult,
}

#[derive(Debug, Deserialize)]
struct NiceHashResult {
    stats: Vec<NiceHashStat>,
}

#[derive(Debug, Deserialize)]
struct NiceHashStat {
    algo: u32,
    /// BTC paid per GH/s per day
    price: Numeric,
}

/// Algorithm name for a NiceHash algorithm id
fn algorithm_name(id: u32) -> Option<&'static str> {
    match id {
        0 => Some("Scrypt"),
        2 => Some("ScryptN"),
        3 => Some("X11"),
        4 => Some("X13"),
        5 => Some("Keccak"),
        6 => Some("X15"),
        7 => Some("Nist5"),
        _ => None,
    }
}

fn into_records(response: NiceHashResponse) -> Vec<NetworkRecord> {
    let mut records = Vec::with_capacity(response.result.stats.len());

    for stat in response.result.stats {
        let Some(algorithm) = algorithm_name(stat.algo) else {
            debug!("Skipping unknown {} algorithm id {}", PROVIDER_NAME, stat.algo);
            continue;
        };

        let price = match stat.price.value("payout price") {
            Ok(price) => price,
            Err(e) => {
                warn!("Skipping {} {}: {}", PROVIDER_NAME, algorithm, e);
                continue;
            }
        };

        records.push(NetworkRecord {
            tag_name: format!("NICE{}", algorithm.to_uppercase()),
            full_name: format!("{} {}", PROVIDER_NAME, algorithm),
            algorithm_label: algorithm.to_string(),
            difficulty: 0.0,
            difficulty_24h: None,
            block_reward: 0.0,
            chain_height: 0,
            is_multi_pool: true,
            primary_quote: Some(ExchangeQuote::new(PROVIDER_NAME, price, 0.0)),
        });
    }

    records
}

#[async_trait]
impl NetworkDataProvider for NiceHashProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn fetch_coins(&self) -> Result<Vec<NetworkRecord>> {
        let response: NiceHashResponse = get_json(&self.client, PROVIDER_NAME, NICEHASH_API_URL).await?;
        let records = into_records(response);
        info!("Fetched {} multi-pool payouts from {}", records.len(), PROVIDER_NAME);
        Ok(records)
    }
}
