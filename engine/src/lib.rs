pub mod calculator;
pub mod matcher;
pub mod ranking;

pub use calculator::{CalcParams, Calculation, FiatContext, ProfitCalculator, Yields};
pub use matcher::AlgorithmMatcher;
pub use ranking::{rank, HashRateOverride, RankedCoin, Ranking, RejectedCoin};
