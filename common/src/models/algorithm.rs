use serde::{Deserialize, Serialize};

/// Normalize an algorithm label or tag: trimmed, inner whitespace collapsed
/// to single spaces, upper-cased.
pub fn normalize_label(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Yield formula family of a coin.
///
/// Classified once from the canonical algorithm name so the calculator never
/// compares algorithm strings itself.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmFamily {
    /// Difficulty is expressed in units of 2^32 hashes.
    Default,
    /// Difficulty is expressed in units of 2^24 hashes.
    QuarkStyle,
    /// Difficulty equals network hash rate times the 60 second block target.
    CryptoNightStyle,
    /// Pool payout rate rather than chain economics.
    MultiPool,
}

impl AlgorithmFamily {
    pub fn classify(algorithm: &str, is_multi_pool: bool) -> Self {
        if is_multi_pool {
            return AlgorithmFamily::MultiPool;
        }

        match normalize_label(algorithm).as_str() {
            "QUARK" => AlgorithmFamily::QuarkStyle,
            "CRYPTONIGHT" => AlgorithmFamily::CryptoNightStyle,
            _ => AlgorithmFamily::Default,
        }
    }
}

impl std::fmt::Display for AlgorithmFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlgorithmFamily::Default => write!(f, "default"),
            AlgorithmFamily::QuarkStyle => write!(f, "quark"),
            AlgorithmFamily::CryptoNightStyle => write!(f, "cryptonight"),
            AlgorithmFamily::MultiPool => write!(f, "multipool"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("  scrypt-n "), "SCRYPT-N");
        assert_eq!(normalize_label("Myriad  \t groestl"), "MYRIAD GROESTL");
        assert_eq!(normalize_label(""), "");
    }

    #[test]
    fn test_classify_families() {
        assert_eq!(AlgorithmFamily::classify("quark", false), AlgorithmFamily::QuarkStyle);
        assert_eq!(
            AlgorithmFamily::classify(" CryptoNight", false),
            AlgorithmFamily::CryptoNightStyle
        );
        assert_eq!(AlgorithmFamily::classify("SCRYPT", false), AlgorithmFamily::Default);
        assert_eq!(AlgorithmFamily::classify("QUARK", true), AlgorithmFamily::MultiPool);
    }
}
