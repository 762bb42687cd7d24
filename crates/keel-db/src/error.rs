//! Database-specific error types and conversions.

use keel_core::error::KeelError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Duplicate {entity}: {detail}")]
    Duplicate { entity: String, detail: String },
}

impl From<DbError> for KeelError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => KeelError::NotFound { entity, id },
            DbError::Duplicate { entity, .. } => KeelError::AlreadyExists { entity },
            other => KeelError::Database(other.to_string()),
        }
    }
}

/// Parse a UUID stored as a string column.
pub(crate) fn parse_uuid(value: &str, column: &str) -> Result<uuid::Uuid, DbError> {
    uuid::Uuid::parse_str(value)
        .map_err(|e| DbError::CorruptRow(format!("invalid {column} UUID: {e}")))
}

/// Classify a failed statement, recognising unique-index violations.
pub(crate) fn statement_error(entity: &str, err: surrealdb::Error) -> DbError {
    let detail = err.to_string();
    if detail.contains("already contains") {
        DbError::Duplicate {
            entity: entity.into(),
            detail,
        }
    } else {
        DbError::Query(detail)
    }
}
