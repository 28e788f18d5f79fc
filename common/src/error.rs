use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Parsing error: {0}")]
    ParseError(String),

    #[error("Invalid price data: {0}")]
    InvalidPriceData(String),

    #[error("Invalid network data: {0}")]
    InvalidNetworkData(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl Error {
    /// Errors that exclude a single coin from a ranking pass instead of failing it.
    pub fn is_per_coin(&self) -> bool {
        matches!(self, Error::InvalidPriceData(_) | Error::InvalidNetworkData(_))
    }
}
