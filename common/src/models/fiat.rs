use serde::{Deserialize, Serialize};

/// Fiat currencies yields are projected into
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum FiatCurrency {
    #[default]
    Usd,
    Eur,
    Gbp,
    Cny,
}

impl std::fmt::Display for FiatCurrency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FiatCurrency::Usd => write!(f, "USD"),
            FiatCurrency::Eur => write!(f, "EUR"),
            FiatCurrency::Gbp => write!(f, "GBP"),
            FiatCurrency::Cny => write!(f, "CNY"),
        }
    }
}

/// Value of one BTC in each supported fiat currency
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FiatRates {
    pub usd: f64,
    pub eur: f64,
    pub gbp: f64,
    pub cny: f64,
}

impl FiatRates {
    pub fn rate(&self, currency: FiatCurrency) -> f64 {
        match currency {
            FiatCurrency::Usd => self.usd,
            FiatCurrency::Eur => self.eur,
            FiatCurrency::Gbp => self.gbp,
            FiatCurrency::Cny => self.cny,
        }
    }

    /// Project a BTC amount into every currency.
    pub fn project(&self, btc: f64) -> FiatYields {
        FiatYields {
            usd: btc * self.usd,
            eur: btc * self.eur,
            gbp: btc * self.gbp,
            cny: btc * self.cny,
        }
    }
}

/// Daily yield per fiat currency
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FiatYields {
    pub usd: f64,
    pub eur: f64,
    pub gbp: f64,
    pub cny: f64,
}
