pub mod error;
pub mod models;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Currency every exchange quote and payout is expressed in.
pub const REFERENCE_CURRENCY: &str = "BTC";
