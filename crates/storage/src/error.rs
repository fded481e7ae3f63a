use mongodb::error::{ErrorKind, WriteFailure};
use thiserror::Error;

const DUPLICATE_KEY: i32 = 11000;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate key")]
    Duplicate,
    #[error("store lock poisoned")]
    Poisoned,
    #[error(transparent)]
    Mongo(mongodb::error::Error),
    #[error("failed to encode document: {0}")]
    Serialize(#[from] mongodb::bson::ser::Error),
}

impl StoreError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::Duplicate)
    }
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        let duplicate = match err.kind.as_ref() {
            ErrorKind::Write(WriteFailure::WriteError(we)) => we.code == DUPLICATE_KEY,
            ErrorKind::Command(ce) => ce.code == DUPLICATE_KEY,
            _ => false,
        };
        if duplicate {
            StoreError::Duplicate
        } else {
            StoreError::Mongo(err)
        }
    }
}
