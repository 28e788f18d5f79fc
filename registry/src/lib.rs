mod coin_registry;
mod error;
mod snapshot;

pub use coin_registry::{AddOutcome, CoinRegistry, MergeSummary};
pub use error::RegistryError;
pub use snapshot::CoinSnapshot;
