use crate::models::{normalize_label, FiatCurrency, NetworkRecord, PriceSelection};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// A hashing algorithm the user can mine, with its hardware figures
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlgorithmEntry {
    /// Canonical algorithm name (e.g., "SCRYPTN")
    pub name: String,
    /// Alternative labels providers use for the same algorithm
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Hash rate in Mh/s
    pub hash_rate: f64,
    /// Power draw in watts
    #[serde(default)]
    pub wattage: f64,
    #[serde(default)]
    pub reward_style: Option<String>,
    #[serde(default)]
    pub reward_target: Option<f64>,
}

/// A coin the user describes by hand, for chains no provider covers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomCoin {
    pub tag_name: String,
    #[serde(default)]
    pub full_name: String,
    pub algorithm: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub difficulty: f64,
    pub block_reward: f64,
    /// Competes with provider records for the same coin
    #[serde(default)]
    pub chain_height: u64,
}

impl CustomCoin {
    pub fn to_record(&self) -> NetworkRecord {
        let full_name = if self.full_name.trim().is_empty() {
            self.tag_name.clone()
        } else {
            self.full_name.clone()
        };

        NetworkRecord {
            tag_name: self.tag_name.clone(),
            full_name,
            algorithm_label: self.algorithm.clone(),
            difficulty: self.difficulty,
            difficulty_24h: None,
            block_reward: self.block_reward,
            chain_height: self.chain_height,
            is_multi_pool: false,
            primary_quote: None,
        }
    }
}

/// User profile driving a calculation pass
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// Electricity price in the fiat currency of choice
    #[serde(default)]
    pub fiat_per_kwh: f64,
    #[serde(default)]
    pub fiat_of_choice: FiatCurrency,
    #[serde(default)]
    pub price_selection: PriceSelection,
    /// Use the volume-weighted price instead of the most liquid exchange
    #[serde(default = "default_enabled")]
    pub weighted: bool,
    /// Fall back to the most liquid exchange's price when volume is zero
    #[serde(default = "default_enabled")]
    pub fall_through_price: bool,
    /// Deduct electricity and project into fiat currencies
    #[serde(default)]
    pub calc_fiat: bool,
    #[serde(default)]
    pub use_24h_diff: bool,
    /// Keep order book levels on exchange quotes
    #[serde(default)]
    pub order_depth: bool,
    #[serde(default)]
    pub algorithms: Vec<AlgorithmEntry>,
    #[serde(default)]
    pub custom_coins: Vec<CustomCoin>,
}

fn default_enabled() -> bool {
    true
}

fn default_name() -> String {
    "default".into()
}

fn default_multiplier() -> f64 {
    1.0
}

impl Profile {
    /// Load and validate a profile from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("Failed to read profile at {}: {}", path.display(), e))
        })?;

        let profile = Self::from_toml(&contents)?;
        tracing::debug!(
            "Loaded profile '{}' with {} algorithms from {}",
            profile.name,
            profile.algorithms.len(),
            path.display()
        );
        Ok(profile)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let profile: Profile = toml::from_str(contents)
            .map_err(|e| Error::ConfigError(format!("Invalid profile format: {}", e)))?;
        profile.validate()?;
        Ok(profile)
    }

    /// Check the numeric settings and that no label is claimed by two entries.
    ///
    /// The matcher resolves overlapping labels to the first entry; this is the
    /// load-time guard against configuring that by accident.
    pub fn validate(&self) -> Result<()> {
        if !(self.multiplier.is_finite() && self.multiplier > 0.0) {
            return Err(Error::ConfigError(format!(
                "multiplier must be positive, got {}",
                self.multiplier
            )));
        }
        if !(self.fiat_per_kwh.is_finite() && self.fiat_per_kwh >= 0.0) {
            return Err(Error::ConfigError(format!(
                "fiat_per_kwh must not be negative, got {}",
                self.fiat_per_kwh
            )));
        }

        let mut owners: HashMap<String, &str> = HashMap::new();
        for entry in &self.algorithms {
            if !(entry.hash_rate.is_finite() && entry.hash_rate >= 0.0) {
                return Err(Error::ConfigError(format!(
                    "{}: hash_rate must not be negative",
                    entry.name
                )));
            }
            if !(entry.wattage.is_finite() && entry.wattage >= 0.0) {
                return Err(Error::ConfigError(format!(
                    "{}: wattage must not be negative",
                    entry.name
                )));
            }

            let mut labels: Vec<String> = entry.synonyms.iter().map(|s| normalize_label(s)).collect();
            labels.push(normalize_label(&entry.name));
            labels.sort();
            labels.dedup();

            for label in labels {
                if let Some(owner) = owners.insert(label.clone(), &entry.name) {
                    return Err(Error::ConfigError(format!(
                        "algorithm label '{}' is claimed by both {} and {}",
                        label, owner, entry.name
                    )));
                }
            }
        }

        for coin in &self.custom_coins {
            if normalize_label(&coin.tag_name).is_empty() || normalize_label(&coin.algorithm).is_empty() {
                return Err(Error::ConfigError(
                    "custom coin needs a tag_name and an algorithm".to_string(),
                ));
            }
            if !(coin.difficulty.is_finite() && coin.difficulty > 0.0) {
                return Err(Error::ConfigError(format!(
                    "{}: difficulty must be positive",
                    coin.tag_name
                )));
            }
            if !(coin.block_reward.is_finite() && coin.block_reward >= 0.0) {
                return Err(Error::ConfigError(format!(
                    "{}: block_reward must not be negative",
                    coin.tag_name
                )));
            }
        }

        Ok(())
    }

    /// Network records for the enabled custom coins
    pub fn custom_records(&self) -> Vec<NetworkRecord> {
        self.custom_coins
            .iter()
            .filter(|c| c.enabled)
            .map(CustomCoin::to_record)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        name = "rig-1"
        multiplier = 2
        fiat_per_kwh = 0.12
        fiat_of_choice = "eur"
        price_selection = "last"
        calc_fiat = true

        [[algorithms]]
        name = "SCRYPT"
        hash_rate = 1.2
        wattage = 900

        [[algorithms]]
        name = "SCRYPTN"
        synonyms = ["scrypt-n", "Scrypt-Adaptive-Nfactor"]
        hash_rate = 0.5
        wattage = 900
        enabled = false
    "#;

    #[test]
    fn test_parse_profile() {
        let profile = Profile::from_toml(SAMPLE).unwrap();
        assert_eq!(profile.name, "rig-1");
        assert_eq!(profile.multiplier, 2.0);
        assert_eq!(profile.fiat_of_choice, FiatCurrency::Eur);
        assert_eq!(profile.price_selection, PriceSelection::Last);
        assert!(profile.weighted);
        assert!(profile.fall_through_price);
        assert!(profile.calc_fiat);
        assert!(!profile.use_24h_diff);
        assert_eq!(profile.algorithms.len(), 2);
        assert!(profile.algorithms[0].enabled);
        assert!(!profile.algorithms[1].enabled);
        assert_eq!(profile.algorithms[1].synonyms.len(), 2);
    }

    #[test]
    fn test_overlapping_synonyms_rejected() {
        let toml = r#"
            [[algorithms]]
            name = "SCRYPTN"
            synonyms = ["scrypt-n"]
            hash_rate = 1.0

            [[algorithms]]
            name = "SCRYPT-N"
            hash_rate = 1.0
        "#;
        let err = Profile::from_toml(toml).unwrap_err();
        assert!(matches!(err, Error::ConfigError(msg) if msg.contains("SCRYPT-N")));
    }

    #[test]
    fn test_synonym_repeating_own_name_is_fine() {
        let toml = r#"
            [[algorithms]]
            name = "X11"
            synonyms = ["x11", " X11 "]
            hash_rate = 3.0
        "#;
        assert!(Profile::from_toml(toml).is_ok());
    }

    #[test]
    fn test_bad_numbers_rejected() {
        assert!(Profile::from_toml("multiplier = 0").is_err());
        assert!(Profile::from_toml("fiat_per_kwh = -1.0").is_err());

        let negative_rate = r#"
            [[algorithms]]
            name = "X11"
            hash_rate = -3.0
        "#;
        assert!(Profile::from_toml(negative_rate).is_err());
    }

    #[test]
    fn test_custom_coins() {
        let toml = r#"
            [[custom_coins]]
            tag_name = "xyz"
            algorithm = "Scrypt"
            difficulty = 12.5
            block_reward = 100
            chain_height = 5000

            [[custom_coins]]
            tag_name = "OFF"
            full_name = "Switched Off"
            algorithm = "X11"
            enabled = false
            difficulty = 1
            block_reward = 1
        "#;
        let profile = Profile::from_toml(toml).unwrap();
        assert_eq!(profile.custom_coins.len(), 2);

        let records = profile.custom_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].tag_name, "xyz");
        assert_eq!(records[0].full_name, "xyz");
        assert_eq!(records[0].algorithm_label, "Scrypt");
        assert_eq!(records[0].chain_height, 5000);
        assert!(!records[0].is_multi_pool);
        assert!(records[0].primary_quote.is_none());
    }

    #[test]
    fn test_bad_custom_coin_rejected() {
        let zero_difficulty = r#"
            [[custom_coins]]
            tag_name = "XYZ"
            algorithm = "SCRYPT"
            difficulty = 0
            block_reward = 10
        "#;
        assert!(matches!(Profile::from_toml(zero_difficulty), Err(Error::ConfigError(_))));

        let no_tag = r#"
            [[custom_coins]]
            tag_name = "  "
            algorithm = "SCRYPT"
            difficulty = 1
            block_reward = 10
        "#;
        assert!(Profile::from_toml(no_tag).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = Profile::load("/nonexistent/profile.toml").unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }
}
