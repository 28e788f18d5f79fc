use crate::{get_json, ExchangeConnector};
use async_trait::async_trait;
use common::{
    models::{MarketTicker, Order, TradingPair},
    Error, Result, REFERENCE_CURRENCY,
};
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};

const BITTREX_API_URL: &str = "https://bittrex.com/api/v1.1/public";
const EXCHANGE_NAME: &str = "Bittrex";
/// Order book requests in flight at once
const ORDER_BOOK_CONCURRENCY: usize = 8;

pub struct BittrexConnector {
    client: reqwest::Client,
}

impl BittrexConnector {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    async fn fetch_order_book(&self, market_name: &str) -> Result<BittrexOrderBook> {
        let url = format!(
            "{}/getorderbook?market={}&type=both",
            BITTREX_API_URL, market_name
        );
        let response: BittrexResponse<BittrexOrderBook> = get_json(&self.client, EXCHANGE_NAME, &url).await?;
        response.into_result()
    }
}

impl Default for BittrexConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct BittrexResponse<T> {
    success: bool,
    #[serde(default)]
    message: String,
    result: Option<T>,
}

impl<T> BittrexResponse<T> {
    fn into_result(self) -> Result<T> {
        match (self.success, self.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(Error::ProviderUnavailable(format!(
                "{} API error: {}",
                EXCHANGE_NAME, self.message
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BittrexMarketSummary {
    market_name: String,
    bid: Option<f64>,
    ask: Option<f64>,
    last: Option<f64>,
    /// 24h volume in the quote currency
    #[serde(default)]
    base_volume: f64,
    #[serde(default)]
    open_buy_orders: u64,
    #[serde(default)]
    open_sell_orders: u64,
}

#[derive(Debug, Deserialize)]
struct BittrexOrderBook {
    #[serde(default)]
    buy: Vec<BittrexOrder>,
    #[serde(default)]
    sell: Vec<BittrexOrder>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BittrexOrder {
    quantity: f64,
    rate: f64,
}

fn to_ticker(summary: &BittrexMarketSummary) -> Option<MarketTicker> {
    let pair = TradingPair::split(&summary.market_name, '-')?;
    Some(MarketTicker {
        bid: summary.bid,
        ask: summary.ask,
        last: summary.last,
        ..MarketTicker::new(pair, summary.base_volume)
    })
}

fn apply_order_book(ticker: &mut MarketTicker, book: BittrexOrderBook) {
    ticker.buy_orders = book
        .buy
        .iter()
        .map(|o| Order::from_coin_amount(o.rate, o.quantity))
        .collect();
    ticker.sell_orders = book
        .sell
        .iter()
        .map(|o| Order::from_coin_amount(o.rate, o.quantity))
        .collect();
}

#[async_trait]
impl ExchangeConnector for BittrexConnector {
    fn name(&self) -> &str {
        EXCHANGE_NAME
    }

    async fn fetch_markets(&self, order_depth: bool) -> Result<Vec<MarketTicker>> {
        let url = format!("{}/getmarketsummaries", BITTREX_API_URL);
        let response: BittrexResponse<Vec<BittrexMarketSummary>> =
            get_json(&self.client, EXCHANGE_NAME, &url).await?;
        let summaries = response.into_result()?;

        let mut tickers = Vec::with_capacity(summaries.len());
        let mut book_requests = Vec::new();
        for summary in &summaries {
            let Some(ticker) = to_ticker(summary) else {
                debug!("Skipping {} market {}", EXCHANGE_NAME, summary.market_name);
                continue;
            };

            if order_depth
                && ticker.quote == REFERENCE_CURRENCY
                && summary.open_buy_orders > 0
                && summary.open_sell_orders > 0
            {
                book_requests.push((tickers.len(), summary.market_name.clone()));
            }
            tickers.push(ticker);
        }

        if !book_requests.is_empty() {
            let books: Vec<(usize, String, Result<BittrexOrderBook>)> = stream::iter(book_requests)
                .map(|(index, market)| async move {
                    let book = self.fetch_order_book(&market).await;
                    (index, market, book)
                })
                .buffered(ORDER_BOOK_CONCURRENCY)
                .collect()
                .await;

            for (index, market, book) in books {
                match book {
                    Ok(book) => apply_order_book(&mut tickers[index], book),
                    Err(e) => warn!("No order book for {} {}: {}", EXCHANGE_NAME, market, e),
                }
            }
        }

        info!("Fetched {} markets from {}", tickers.len(), EXCHANGE_NAME);
        Ok(tickers)
    }
}
