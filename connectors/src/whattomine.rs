use crate::{get_json, NetworkDataProvider};
use async_trait::async_trait;
use common::{
    models::{normalize_label, ExchangeQuote, NetworkRecord},
    Result,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::info;

const WHATTOMINE_API_URL: &str = "https://whattomine.com/coins.json";
const PROVIDER_NAME: &str = "WhatToMine";

pub struct WhatToMineProvider {
    client: reqwest::Client,
}

impl WhatToMineProvider {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for WhatToMineProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct WhatToMineResponse {
    // Keyed by full coin name; BTreeMap keeps the record order stable
    coins: BTreeMap<String, WhatToMineCoin>,
}

#[derive(Debug, Deserialize)]
struct WhatToMineCoin {
    tag: String,
    algorithm: String,
    #[serde(default)]
    block_reward: f64,
    #[serde(default)]
    last_block: u64,
    #[serde(default)]
    difficulty: f64,
    #[serde(default)]
    difficulty24: Option<f64>,
    #[serde(default)]
    exchange_rate: f64,
    /// 24h volume in coins
    #[serde(default)]
    exchange_rate_vol: f64,
}

fn into_records(response: WhatToMineResponse) -> Vec<NetworkRecord> {
    response
        .coins
        .into_iter()
        .map(|(full_name, coin)| {
            let tag_name = normalize_label(&coin.tag);
            let mut algorithm_label = coin.algorithm;
            // Myriad's Groestl variant is listed under plain Groestl
            if tag_name == "MYR" && normalize_label(&algorithm_label) == "GROESTL" {
                algorithm_label = "Myriad-Groestl".to_string();
            }

            let primary_quote = (coin.exchange_rate.is_finite() && coin.exchange_rate > 0.0).then(|| {
                ExchangeQuote::new(
                    PROVIDER_NAME,
                    coin.exchange_rate,
                    coin.exchange_rate_vol * coin.exchange_rate,
                )
            });

            NetworkRecord {
                tag_name,
                full_name,
                algorithm_label,
                difficulty: coin.difficulty,
                difficulty_24h: coin.difficulty24,
                block_reward: coin.block_reward,
                chain_height: coin.last_block,
                is_multi_pool: false,
                primary_quote,
            }
        })
        .collect()
}

#[async_trait]
impl NetworkDataProvider for WhatToMineProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn fetch_coins(&self) -> Result<Vec<NetworkRecord>> {
        let response: WhatToMineResponse = get_json(&self.client, PROVIDER_NAME, WHATTOMINE_API_URL).await?;
        let records = into_records(response);
        info!("Fetched {} coins from {}", records.len(), PROVIDER_NAME);
        Ok(records)
    }
}
