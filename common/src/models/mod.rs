mod algorithm;
mod coin;
mod fiat;
mod price;
mod profile;

pub use algorithm::{normalize_label, AlgorithmFamily};
pub use coin::{Coin, CoinKey, NetworkRecord};
pub use fiat::{FiatCurrency, FiatRates, FiatYields};
pub use price::{ExchangeQuote, MarketTicker, Order, PriceSelection, TradingPair};
pub use profile::{AlgorithmEntry, CustomCoin, Profile};
