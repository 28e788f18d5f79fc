use crate::models::normalize_label;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Order book levels kept per side when order depth is requested.
pub const MAX_ORDER_DEPTH: usize = 50;

/// One order book level
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Order {
    /// Price of one coin in BTC
    pub price: f64,
    /// Order size in BTC
    pub volume: f64,
    /// Order size in coins
    pub coin_volume: f64,
}

impl Order {
    /// Build a level from price and coin amount, deriving the BTC size.
    pub fn from_coin_amount(price: f64, coin_volume: f64) -> Self {
        Self {
            price,
            volume: price * coin_volume,
            coin_volume,
        }
    }
}

/// One exchange's price observation for a coin
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExchangeQuote {
    /// Name of the exchange (or provider) this quote is from
    pub exchange_name: String,
    /// Price of one coin in BTC
    pub price: f64,
    /// 24h volume in BTC
    pub volume: f64,
    /// Share of the coin's total volume, filled in by the calculator
    pub weight: f64,
    /// Exchange reported a trading or wallet halt
    pub is_frozen: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buy_orders: Vec<Order>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sell_orders: Vec<Order>,
}

impl ExchangeQuote {
    pub fn new(exchange_name: impl Into<String>, price: f64, volume: f64) -> Self {
        Self {
            exchange_name: exchange_name.into(),
            price,
            volume,
            weight: 0.0,
            is_frozen: false,
            buy_orders: Vec::new(),
            sell_orders: Vec::new(),
        }
    }

    /// Turn a decoded exchange market into a quote.
    ///
    /// Fails with `InvalidPriceData` when the ticker has no usable price for
    /// the requested selection, so a missing price never becomes zero.
    pub fn from_ticker(
        exchange_name: &str,
        ticker: &MarketTicker,
        selection: PriceSelection,
        order_depth: bool,
    ) -> Result<Self> {
        let price = selection.pick(ticker).ok_or_else(|| {
            Error::InvalidPriceData(format!(
                "{} {}/{} has no {} or last price",
                exchange_name, ticker.base, ticker.quote, selection
            ))
        })?;

        let (buy_orders, sell_orders) = if order_depth {
            (
                ticker.buy_orders.iter().take(MAX_ORDER_DEPTH).copied().collect(),
                ticker.sell_orders.iter().take(MAX_ORDER_DEPTH).copied().collect(),
            )
        } else {
            (Vec::new(), Vec::new())
        };

        Ok(Self {
            exchange_name: exchange_name.to_string(),
            price,
            volume: ticker.volume,
            weight: 0.0,
            is_frozen: ticker.is_frozen,
            buy_orders,
            sell_orders,
        })
    }
}

/// A single market as reported by an exchange, pair already split
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketTicker {
    /// Traded coin symbol (e.g., LTC)
    pub base: String,
    /// Pricing currency symbol (e.g., BTC)
    pub quote: String,
    /// Highest bid, if the book has one
    pub bid: Option<f64>,
    /// Lowest ask, if the book has one
    pub ask: Option<f64>,
    /// Most recent trade price
    pub last: Option<f64>,
    /// 24h volume in the quote currency
    pub volume: f64,
    pub is_frozen: bool,
    #[serde(default)]
    pub buy_orders: Vec<Order>,
    #[serde(default)]
    pub sell_orders: Vec<Order>,
}

impl MarketTicker {
    pub fn new(pair: TradingPair, volume: f64) -> Self {
        Self {
            base: pair.base,
            quote: pair.quote,
            bid: None,
            ask: None,
            last: None,
            volume,
            is_frozen: false,
            buy_orders: Vec::new(),
            sell_orders: Vec::new(),
        }
    }
}

/// Which side of the market a quote is priced from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum PriceSelection {
    /// Highest bid
    #[default]
    Bid,
    /// Last trade
    Last,
    /// Lowest ask
    Ask,
}

impl PriceSelection {
    /// Selected price, falling back to the last trade when that side of the
    /// book is empty. Non-positive or non-finite prices count as missing.
    pub fn pick(&self, ticker: &MarketTicker) -> Option<f64> {
        let usable = |p: Option<f64>| p.filter(|v| v.is_finite() && *v > 0.0);

        match self {
            PriceSelection::Bid => usable(ticker.bid).or_else(|| usable(ticker.last)),
            PriceSelection::Last => usable(ticker.last),
            PriceSelection::Ask => usable(ticker.ask).or_else(|| usable(ticker.last)),
        }
    }
}

impl std::fmt::Display for PriceSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriceSelection::Bid => write!(f, "bid"),
            PriceSelection::Last => write!(f, "last"),
            PriceSelection::Ask => write!(f, "ask"),
        }
    }
}

/// Represents a pair of coins being traded
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TradingPair {
    pub base: String,   // Traded coin (e.g., LTC)
    pub quote: String,  // Pricing currency (e.g., BTC)
}

impl TradingPair {
    /// Split a quote-first market name such as `BTC-LTC` or `BTC_LTC` into a
    /// pair. Symbols come back normalized (trimmed, upper-cased).
    pub fn split(symbol: &str, separator: char) -> Option<Self> {
        let (first, second) = symbol.split_once(separator)?;
        let (first, second) = (normalize_label(first), normalize_label(second));
        if first.is_empty() || second.is_empty() {
            return None;
        }

        Some(TradingPair {
            base: second,
            quote: first,
        })
    }
}
