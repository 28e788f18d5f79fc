pub mod bittrex;
pub mod coindesk;
pub mod nicehash;
pub mod poloniex;
pub mod whattomine;

use async_trait::async_trait;
use common::{
    models::{FiatRates, MarketTicker, NetworkRecord},
    Error, Result,
};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, error};

pub use bittrex::BittrexConnector;
pub use coindesk::CoinDeskRates;
pub use nicehash::NiceHashProvider;
pub use poloniex::PoloniexConnector;
pub use whattomine::WhatToMineProvider;

/// Source of per-coin network parameters (difficulty, reward, height)
#[async_trait]
pub trait NetworkDataProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch every coin the provider knows about
    async fn fetch_coins(&self) -> Result<Vec<NetworkRecord>>;
}

/// Trait defining the interface for exchange API clients
#[async_trait]
pub trait ExchangeConnector: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch all markets of the exchange, with order book levels when
    /// `order_depth` is set
    async fn fetch_markets(&self, order_depth: bool) -> Result<Vec<MarketTicker>>;
}

/// Source of BTC exchange rates in fiat currencies
#[async_trait]
pub trait FiatRateProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_rates(&self) -> Result<FiatRates>;
}

/// A numeric field some APIs send as a JSON number and others as a string
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub(crate) enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    pub(crate) fn value(&self, label: &str) -> Result<f64> {
        match self {
            Numeric::Number(n) => Ok(*n),
            Numeric::Text(s) => parse_number(label, s),
        }
    }
}

/// Parse a numeric string from a provider payload
pub fn parse_number(label: &str, raw: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|e| Error::ParseError(format!("Failed to parse {} '{}': {}", label, raw, e)))
}

/// GET `url` and decode the JSON body, mapping failures to provider errors
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    provider: &str,
    url: &str,
) -> Result<T> {
    debug!("Fetching {} from {}", provider, url);

    let response = client.get(url).send().await.map_err(Error::HttpError)?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        error!("{} API error: {} - {}", provider, status, error_text);
        return Err(Error::ProviderUnavailable(format!(
            "{} API error: {} - {}",
            provider, status, error_text
        )));
    }

    response.json().await.map_err(|e| {
        error!("Failed to decode {} response: {}", provider, e);
        Error::ProviderUnavailable(format!("Failed to decode {} response: {}", provider, e))
    })
}
