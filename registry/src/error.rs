use std::sync::PoisonError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Registry lock poisoned: {0}")]
    LockPoisoned(String),
}

impl From<RegistryError> for common::Error {
    fn from(err: RegistryError) -> Self {
        common::Error::InternalError(err.to_string())
    }
}

impl<T> From<PoisonError<T>> for RegistryError {
    fn from(err: PoisonError<T>) -> Self {
        RegistryError::LockPoisoned(err.to_string())
    }
}
