//! Startup errors.

use keel_db::DbError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid value for {name}: {value:?}")]
    InvalidVar { name: &'static str, value: String },

    #[error(transparent)]
    Database(#[from] DbError),
}
