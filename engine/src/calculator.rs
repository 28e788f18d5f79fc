use common::models::{
    AlgorithmEntry, AlgorithmFamily, Coin, FiatCurrency, FiatRates, FiatYields, Profile,
};
use common::{Error, Result};
use serde::Serialize;

const TWO_POW_32: f64 = 4_294_967_296.0;
const TWO_POW_24: f64 = 16_777_216.0;
const SECONDS_PER_DAY: f64 = 86_400.0;
const MINUTES_PER_DAY: f64 = 1_440.0;
/// CryptoNight difficulty is network hash rate times this block target.
const CRYPTONIGHT_BLOCK_TARGET_SECS: f64 = 60.0;
const HASHES_PER_MEGAHASH: f64 = 1_000_000.0;

/// Per-algorithm inputs of one calculation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalcParams {
    /// Hash rate in Mh/s
    pub hash_rate: f64,
    /// Power draw in watts, only used for the fiat adjustment
    pub wattage: f64,
    pub weighted: bool,
    pub fall_through_price: bool,
    pub multiplier: f64,
    pub reward_style: Option<String>,
    pub reward_target: Option<f64>,
    pub use_24h_diff: bool,
}

impl CalcParams {
    pub fn for_entry(entry: &AlgorithmEntry, profile: &Profile) -> Self {
        Self {
            hash_rate: entry.hash_rate,
            wattage: entry.wattage,
            weighted: profile.weighted,
            fall_through_price: profile.fall_through_price,
            multiplier: profile.multiplier,
            reward_style: entry.reward_style.clone(),
            reward_target: entry.reward_target,
            use_24h_diff: profile.use_24h_diff,
        }
    }
}

/// Exchange rates and electricity price for one calculation pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FiatContext {
    pub rates: FiatRates,
    /// Electricity price in `fiat_of_choice`
    pub fiat_per_kwh: f64,
    pub fiat_of_choice: FiatCurrency,
}

impl FiatContext {
    pub fn from_profile(profile: &Profile, rates: FiatRates) -> Self {
        Self {
            rates,
            fiat_per_kwh: profile.fiat_per_kwh,
            fiat_of_choice: profile.fiat_of_choice,
        }
    }
}

/// Daily returns of one coin
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Yields {
    pub coins_per_day: f64,
    /// BTC per day before electricity
    pub gross_currency_per_day: f64,
    /// BTC per day after electricity when fiat adjustment ran
    pub currency_per_day: f64,
    /// Price the BTC yield was computed with
    pub price_used: f64,
    pub weighted_price: Option<f64>,
    /// Electricity cost per day in BTC
    pub electricity_cost: Option<f64>,
    pub fiat: Option<FiatYields>,
}

/// A coin copy with sorted, weighted quotes and its yields
#[derive(Debug, Clone, PartialEq)]
pub struct Calculation {
    pub coin: Coin,
    pub yields: Yields,
}

pub struct ProfitCalculator;

impl ProfitCalculator {
    /// Compute the daily yield of `coin` for the given parameters.
    ///
    /// Works on a clone: the returned coin carries the volume-sorted quotes
    /// and their weights, the input is left as it was.
    pub fn compute(coin: &Coin, params: &CalcParams, fiat: Option<&FiatContext>) -> Result<Calculation> {
        let mut coin = coin.clone();

        let mut yields = match coin.family {
            AlgorithmFamily::MultiPool => {
                let price = top_price(&coin)?;
                let currency_per_day = (params.hash_rate / 1000.0) * price * params.multiplier;
                Yields {
                    coins_per_day: 0.0,
                    gross_currency_per_day: currency_per_day,
                    currency_per_day,
                    price_used: price,
                    weighted_price: None,
                    electricity_cost: None,
                    fiat: None,
                }
            }
            family => {
                coin.sort_quotes();
                let coins_per_day = daily_coins(family, &coin, params)?;
                let (price_used, weighted_price) = select_price(&mut coin, params)?;
                let currency_per_day = coins_per_day * price_used;
                Yields {
                    coins_per_day,
                    gross_currency_per_day: currency_per_day,
                    currency_per_day,
                    price_used,
                    weighted_price,
                    electricity_cost: None,
                    fiat: None,
                }
            }
        };

        if let Some(ctx) = fiat {
            apply_fiat(&mut yields, params.wattage, ctx)?;
        }

        Ok(Calculation { coin, yields })
    }
}

fn daily_coins(family: AlgorithmFamily, coin: &Coin, params: &CalcParams) -> Result<f64> {
    let difficulty = if params.use_24h_diff {
        coin.difficulty_24h
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or(coin.difficulty)
    } else {
        coin.difficulty
    };

    if !(difficulty.is_finite() && difficulty > 0.0) {
        return Err(Error::InvalidNetworkData(format!(
            "{} has difficulty {}",
            coin.key(),
            difficulty
        )));
    }
    if !(coin.block_reward.is_finite() && coin.block_reward >= 0.0) {
        return Err(Error::InvalidNetworkData(format!(
            "{} has block reward {}",
            coin.key(),
            coin.block_reward
        )));
    }

    let block_reward = coin.block_reward;
    let hash_rate_hs = params.hash_rate * HASHES_PER_MEGAHASH;

    let coins = match family {
        AlgorithmFamily::QuarkStyle => {
            block_reward / (difficulty * TWO_POW_24 / hash_rate_hs / SECONDS_PER_DAY) * params.multiplier
        }
        AlgorithmFamily::CryptoNightStyle => {
            block_reward
                * MINUTES_PER_DAY
                * (hash_rate_hs / (difficulty / CRYPTONIGHT_BLOCK_TARGET_SECS))
                * params.multiplier
        }
        AlgorithmFamily::Default | AlgorithmFamily::MultiPool => {
            block_reward / (difficulty * TWO_POW_32 / hash_rate_hs / SECONDS_PER_DAY) * params.multiplier
        }
    };

    Ok(coins)
}

/// Price of the most liquid quote. Quotes must already be sorted.
fn top_price(coin: &Coin) -> Result<f64> {
    let quote = coin
        .quotes
        .first()
        .ok_or_else(|| Error::InvalidPriceData(format!("{} has no quotes", coin.key())))?;

    if quote.price.is_finite() && quote.price > 0.0 {
        Ok(quote.price)
    } else {
        Err(Error::InvalidPriceData(format!(
            "{} quote from {} has price {}",
            coin.key(),
            quote.exchange_name,
            quote.price
        )))
    }
}

/// Fill in quote weights and pick the price: `(price_used, weighted_price)`.
fn select_price(coin: &mut Coin, params: &CalcParams) -> Result<(f64, Option<f64>)> {
    let top = top_price(coin)?;
    let total_volume = coin.total_volume;

    if total_volume > 0.0 && total_volume.is_finite() {
        let mut weighted = 0.0;
        for quote in coin.quotes.iter_mut() {
            quote.weight = quote.volume / total_volume;
            weighted += quote.weight * quote.price;
        }

        if !params.weighted {
            return Ok((top, Some(weighted)));
        }
        if weighted.is_finite() && weighted > 0.0 {
            Ok((weighted, Some(weighted)))
        } else {
            Err(Error::InvalidPriceData(format!(
                "{} weighted price is {}",
                coin.key(),
                weighted
            )))
        }
    } else {
        for quote in coin.quotes.iter_mut() {
            quote.weight = 0.0;
        }

        if params.fall_through_price {
            Ok((top, Some(top)))
        } else if params.weighted {
            Err(Error::InvalidPriceData(format!(
                "{} has zero total volume and price fallback is disabled",
                coin.key()
            )))
        } else {
            Ok((top, None))
        }
    }
}

fn apply_fiat(yields: &mut Yields, wattage: f64, ctx: &FiatContext) -> Result<()> {
    let rate = ctx.rates.rate(ctx.fiat_of_choice);
    if !(rate.is_finite() && rate > 0.0) {
        return Err(Error::InvalidPriceData(format!(
            "no usable BTC/{} rate ({})",
            ctx.fiat_of_choice, rate
        )));
    }

    let electricity_cost = (wattage / 1000.0) * 24.0 * ctx.fiat_per_kwh / rate;
    yields.currency_per_day -= electricity_cost;
    yields.electricity_cost = Some(electricity_cost);
    yields.fiat = Some(ctx.rates.project(yields.currency_per_day));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::models::{ExchangeQuote, NetworkRecord};

    const EPSILON: f64 = 1e-12;

    fn params(hash_rate: f64) -> CalcParams {
        CalcParams {
            hash_rate,
            wattage: 0.0,
            weighted: true,
            fall_through_price: true,
            multiplier: 1.0,
            reward_style: None,
            reward_target: None,
            use_24h_diff: false,
        }
    }

    fn coin(algo: &str, difficulty: f64, reward: f64, quotes: &[(&str, f64, f64)]) -> Coin {
        let record = NetworkRecord {
            tag_name: "TST".into(),
            full_name: "Testcoin".into(),
            algorithm_label: algo.into(),
            difficulty,
            difficulty_24h: None,
            block_reward: reward,
            chain_height: 1,
            is_multi_pool: false,
            primary_quote: None,
        };
        let mut coin = Coin::from_record(record, algo, "test");
        for (name, volume, price) in quotes {
            coin.push_quote(ExchangeQuote::new(*name, *price, *volume));
        }
        coin
    }

    fn multi_pool(price: f64) -> Coin {
        let record = NetworkRecord {
            tag_name: "NICESCRYPT".into(),
            full_name: "NiceHash SCRYPT".into(),
            algorithm_label: "SCRYPT".into(),
            difficulty: 0.0,
            difficulty_24h: None,
            block_reward: 0.0,
            chain_height: 0,
            is_multi_pool: true,
            primary_quote: Some(ExchangeQuote::new("NiceHash", price, 0.0)),
        };
        Coin::from_record(record, "SCRYPT", "NiceHash")
    }

    #[test]
    fn test_default_family_exact_arithmetic() {
        let c = coin("SCRYPT", 4294967296.0, 25.0, &[("A", 1.0, 0.001)]);
        let calc = ProfitCalculator::compute(&c, &params(1.0), None).unwrap();

        let expected = 25.0 / (4294967296.0 * 4294967296.0 / 1_000_000.0 / 86400.0);
        assert_eq!(calc.yields.coins_per_day, expected);
        assert_eq!(calc.yields.currency_per_day, expected * 0.001);
    }

    #[test]
    fn test_quark_family_uses_two_pow_24() {
        let c = coin("QUARK", 2.0, 1.0, &[("A", 1.0, 0.001)]);
        let calc = ProfitCalculator::compute(&c, &params(5.0), None).unwrap();

        let expected = 1.0 / (2.0 * 16777216.0 / 5_000_000.0 / 86400.0);
        assert_eq!(calc.yields.coins_per_day, expected);
    }

    #[test]
    fn test_cryptonight_family() {
        // 1000 H/s against a network of 1 MH/s earns a thousandth of 1440 blocks.
        let c = coin("CRYPTONIGHT", 60_000_000.0, 10.0, &[("A", 1.0, 0.001)]);
        let calc = ProfitCalculator::compute(&c, &params(0.001), None).unwrap();
        assert!((calc.yields.coins_per_day - 14.4).abs() < EPSILON);
    }

    #[test]
    fn test_multiplier_scales_yield() {
        let c = coin("SCRYPT", 1000.0, 25.0, &[("A", 1.0, 0.001)]);
        let single = ProfitCalculator::compute(&c, &params(1.0), None).unwrap();

        let mut doubled = params(1.0);
        doubled.multiplier = 2.0;
        let double = ProfitCalculator::compute(&c, &doubled, None).unwrap();
        assert!((double.yields.coins_per_day - 2.0 * single.yields.coins_per_day).abs() < EPSILON);
    }

    #[test]
    fn test_multi_pool_payout() {
        let calc = ProfitCalculator::compute(&multi_pool(0.0001), &params(1000.0), None).unwrap();
        assert_eq!(calc.yields.coins_per_day, 0.0);
        assert_eq!(calc.yields.currency_per_day, 0.0001);
    }

    #[test]
    fn test_weighted_price_and_weight_sum() {
        let c = coin("SCRYPT", 1000.0, 25.0, &[("ExchB", 40.0, 2.0), ("ExchA", 60.0, 1.0)]);
        let calc = ProfitCalculator::compute(&c, &params(1.0), None).unwrap();

        let weighted = calc.yields.weighted_price.unwrap();
        assert!((weighted - 1.4).abs() < EPSILON);
        assert!((calc.yields.price_used - 1.4).abs() < EPSILON);

        let weight_sum: f64 = calc.coin.quotes.iter().map(|q| q.weight).sum();
        assert!((weight_sum - 1.0).abs() < EPSILON);

        assert_eq!(calc.coin.quotes[0].exchange_name, "ExchA");
        assert!((calc.coin.quotes[0].weight - 0.6).abs() < EPSILON);
        assert_eq!(calc.yields.currency_per_day, calc.yields.coins_per_day * weighted);

        // The input coin is untouched.
        assert_eq!(c.quotes[0].exchange_name, "ExchB");
        assert_eq!(c.quotes[0].weight, 0.0);
    }

    #[test]
    fn test_unweighted_uses_most_liquid_exchange() {
        let c = coin("SCRYPT", 1000.0, 25.0, &[("ExchB", 40.0, 2.0), ("ExchA", 60.0, 1.0)]);
        let mut p = params(1.0);
        p.weighted = false;
        let calc = ProfitCalculator::compute(&c, &p, None).unwrap();
        assert_eq!(calc.yields.price_used, 1.0);
        assert_eq!(calc.yields.currency_per_day, calc.yields.coins_per_day);
    }

    #[test]
    fn test_zero_volume_falls_back_to_first_quote() {
        let c = coin("SCRYPT", 1000.0, 25.0, &[("ExchA", 0.0, 0.5), ("ExchB", 0.0, 0.7)]);
        let calc = ProfitCalculator::compute(&c, &params(1.0), None).unwrap();

        let weighted = calc.yields.weighted_price.unwrap();
        assert!(!weighted.is_nan());
        assert_eq!(weighted, calc.coin.quotes[0].price);
        assert_eq!(calc.yields.price_used, 0.5);
    }

    #[test]
    fn test_zero_volume_without_fallback() {
        let c = coin("SCRYPT", 1000.0, 25.0, &[("ExchA", 0.0, 0.5), ("ExchB", 0.0, 0.7)]);
        let mut p = params(1.0);
        p.fall_through_price = false;

        let err = ProfitCalculator::compute(&c, &p, None).unwrap_err();
        assert!(matches!(err, Error::InvalidPriceData(_)));

        p.weighted = false;
        let calc = ProfitCalculator::compute(&c, &p, None).unwrap();
        assert_eq!(calc.yields.price_used, 0.5);
        assert_eq!(calc.yields.weighted_price, None);
    }

    #[test]
    fn test_missing_quotes_and_bad_network_data() {
        let no_quotes = coin("SCRYPT", 1000.0, 25.0, &[]);
        assert!(matches!(
            ProfitCalculator::compute(&no_quotes, &params(1.0), None),
            Err(Error::InvalidPriceData(_))
        ));

        let zero_diff = coin("SCRYPT", 0.0, 25.0, &[("A", 1.0, 0.1)]);
        assert!(matches!(
            ProfitCalculator::compute(&zero_diff, &params(1.0), None),
            Err(Error::InvalidNetworkData(_))
        ));
    }

    #[test]
    fn test_use_24h_difficulty() {
        let mut c = coin("SCRYPT", 1000.0, 25.0, &[("A", 1.0, 0.1)]);
        c.difficulty_24h = Some(2000.0);

        let current = ProfitCalculator::compute(&c, &params(1.0), None).unwrap();
        let mut p = params(1.0);
        p.use_24h_diff = true;
        let averaged = ProfitCalculator::compute(&c, &p, None).unwrap();

        assert!((current.yields.coins_per_day - 2.0 * averaged.yields.coins_per_day).abs() < EPSILON);
    }

    #[test]
    fn test_fiat_adjustment() {
        let c = coin("SCRYPT", 1000.0, 25.0, &[("A", 1.0, 0.1)]);
        let mut p = params(1.0);
        p.wattage = 1000.0;
        let ctx = FiatContext {
            rates: FiatRates {
                usd: 500.0,
                eur: 400.0,
                gbp: 300.0,
                cny: 3000.0,
            },
            fiat_per_kwh: 0.1,
            fiat_of_choice: FiatCurrency::Usd,
        };

        let calc = ProfitCalculator::compute(&c, &p, Some(&ctx)).unwrap();
        let cost = calc.yields.electricity_cost.unwrap();
        assert!((cost - 0.0048).abs() < EPSILON);
        assert!((calc.yields.gross_currency_per_day - calc.yields.currency_per_day - cost).abs() < EPSILON);

        let fiat = calc.yields.fiat.unwrap();
        assert!((fiat.usd - calc.yields.currency_per_day * 500.0).abs() < EPSILON);
        assert!((fiat.cny - calc.yields.currency_per_day * 3000.0).abs() < EPSILON);
    }

    #[test]
    fn test_fiat_without_rate_is_invalid() {
        let c = coin("SCRYPT", 1000.0, 25.0, &[("A", 1.0, 0.1)]);
        let ctx = FiatContext {
            rates: FiatRates {
                usd: 500.0,
                eur: 0.0,
                gbp: 300.0,
                cny: 3000.0,
            },
            fiat_per_kwh: 0.1,
            fiat_of_choice: FiatCurrency::Eur,
        };
        assert!(matches!(
            ProfitCalculator::compute(&c, &params(1.0), Some(&ctx)),
            Err(Error::InvalidPriceData(_))
        ));
    }
}
