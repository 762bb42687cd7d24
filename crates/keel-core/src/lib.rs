//! Keel Core — domain models, repository traits and the shared error
//! type used by every other Keel crate.

pub mod error;
pub mod models;
pub mod repository;

pub use error::{KeelError, KeelResult};
