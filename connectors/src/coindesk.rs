use crate::{get_json, FiatRateProvider};
use async_trait::async_trait;
use common::{models::FiatRates, Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

const COINDESK_API_URL: &str = "https://api.coindesk.com/v1/bpi";
const PROVIDER_NAME: &str = "CoinDesk";

/// Bitcoin Price Index rates
pub struct CoinDeskRates {
    client: reqwest::Client,
}

impl CoinDeskRates {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for CoinDeskRates {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct BpiResponse {
    bpi: HashMap<String, BpiRate>,
}

#[derive(Debug, Deserialize)]
struct BpiRate {
    rate_float: f64,
}

impl BpiResponse {
    fn rate(&self, code: &str) -> Result<f64> {
        self.bpi
            .get(code)
            .map(|r| r.rate_float)
            .filter(|r| r.is_finite() && *r > 0.0)
            .ok_or_else(|| Error::ProviderUnavailable(format!("{} has no usable {} rate", PROVIDER_NAME, code)))
    }
}

fn into_rates(current: &BpiResponse, cny: &BpiResponse) -> Result<FiatRates> {
    Ok(FiatRates {
        usd: current.rate("USD")?,
        eur: current.rate("EUR")?,
        gbp: current.rate("GBP")?,
        cny: cny.rate("CNY")?,
    })
}

#[async_trait]
impl FiatRateProvider for CoinDeskRates {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn fetch_rates(&self) -> Result<FiatRates> {
        let current_url = format!("{}/currentprice.json", COINDESK_API_URL);
        let cny_url = format!("{}/currentprice/CNY.json", COINDESK_API_URL);

        let (current, cny) = tokio::try_join!(
            get_json::<BpiResponse>(&self.client, PROVIDER_NAME, &current_url),
            get_json::<BpiResponse>(&self.client, PROVIDER_NAME, &cny_url),
        )?;

        let rates = into_rates(&current, &cny)?;
        debug!("BTC rates from {}: {:?}", PROVIDER_NAME, rates);
        Ok(rates)
    }
}
