use crate::{get_json, ExchangeConnector, Numeric};
use async_trait::async_trait;
use common::{
    models::{MarketTicker, Order, TradingPair},
    Result, REFERENCE_CURRENCY,
};
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

const POLONIEX_API_URL: &str = "https://poloniex.com/public";
const EXCHANGE_NAME: &str = "Poloniex";
const ORDER_BOOK_DEPTH: usize = 50;
const ORDER_BOOK_CONCURRENCY: usize = 8;

pub struct PoloniexConnector {
    client: reqwest::Client,
}

impl PoloniexConnector {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    async fn fetch_order_book(&self, currency_pair: &str) -> Result<PoloniexOrderBook> {
        let url = format!(
            "{}?command=returnOrderBook&currencyPair={}&depth={}",
            POLONIEX_API_URL, currency_pair, ORDER_BOOK_DEPTH
        );
        get_json(&self.client, EXCHANGE_NAME, &url).await
    }
}

impl Default for PoloniexConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PoloniexTicker {
    last: Option<Numeric>,
    lowest_ask: Option<Numeric>,
    highest_bid: Option<Numeric>,
    /// 24h volume in the quote currency
    base_volume: Numeric,
    #[serde(default)]
    is_frozen: String,
}

#[derive(Debug, Deserialize)]
struct PoloniexOrderBook {
    #[serde(default)]
    asks: Vec<[Numeric; 2]>,
    #[serde(default)]
    bids: Vec<[Numeric; 2]>,
}

fn optional_price(label: &str, raw: &Option<Numeric>) -> Result<Option<f64>> {
    raw.as_ref().map(|n| n.value(label)).transpose()
}

/// Decode one `returnTicker` entry. `Ok(None)` for an unsplittable pair name.
fn to_ticker(currency_pair: &str, ticker: &PoloniexTicker) -> Result<Option<MarketTicker>> {
    let Some(pair) = TradingPair::split(currency_pair, '_') else {
        return Ok(None);
    };

    Ok(Some(MarketTicker {
        bid: optional_price("highestBid", &ticker.highest_bid)?,
        ask: optional_price("lowestAsk", &ticker.lowest_ask)?,
        last: optional_price("last", &ticker.last)?,
        is_frozen: ticker.is_frozen == "1",
        ..MarketTicker::new(pair, ticker.base_volume.value("baseVolume")?)
    }))
}

fn to_order([price, amount]: &[Numeric; 2]) -> Result<Order> {
    Ok(Order::from_coin_amount(
        price.value("order price")?,
        amount.value("order amount")?,
    ))
}

fn to_orders(levels: &[[Numeric; 2]]) -> Result<Vec<Order>> {
    levels.iter().map(to_order).collect()
}

fn apply_order_book(ticker: &mut MarketTicker, book: &PoloniexOrderBook) -> Result<()> {
    ticker.buy_orders = to_orders(&book.bids)?;
    ticker.sell_orders = to_orders(&book.asks)?;
    Ok(())
}

#[async_trait]
impl ExchangeConnector for PoloniexConnector {
    fn name(&self) -> &str {
        EXCHANGE_NAME
    }

    async fn fetch_markets(&self, order_depth: bool) -> Result<Vec<MarketTicker>> {
        let url = format!("{}?command=returnTicker", POLONIEX_API_URL);
        let markets: BTreeMap<String, PoloniexTicker> = get_json(&self.client, EXCHANGE_NAME, &url).await?;

        let mut tickers = Vec::with_capacity(markets.len());
        let mut book_requests = Vec::new();
        for (currency_pair, raw) in &markets {
            let ticker = match to_ticker(currency_pair, raw) {
                Ok(Some(ticker)) => ticker,
                Ok(None) => {
                    debug!("Skipping {} market {}", EXCHANGE_NAME, currency_pair);
                    continue;
                }
                Err(e) => {
                    warn!("Skipping {} market {}: {}", EXCHANGE_NAME, currency_pair, e);
                    continue;
                }
            };

            if order_depth && ticker.quote == REFERENCE_CURRENCY {
                book_requests.push((tickers.len(), currency_pair.clone()));
            }
            tickers.push(ticker);
        }

        if !book_requests.is_empty() {
            let books: Vec<(usize, String, Result<PoloniexOrderBook>)> = stream::iter(book_requests)
                .map(|(index, pair)| async move {
                    let book = self.fetch_order_book(&pair).await;
                    (index, pair, book)
                })
                .buffered(ORDER_BOOK_CONCURRENCY)
                .collect()
                .await;

            for (index, pair, book) in books {
                let applied = book.and_then(|book| apply_order_book(&mut tickers[index], &book));
                if let Err(e) = applied {
                    warn!("No order book for {} {}: {}", EXCHANGE_NAME, pair, e);
                    tickers[index].buy_orders.clear();
                    tickers[index].sell_orders.clear();
                }
            }
        }

        info!("Fetched {} markets from {}", tickers.len(), EXCHANGE_NAME);
        Ok(tickers)
    }
}
