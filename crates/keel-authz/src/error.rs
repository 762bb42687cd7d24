//! Authorization error types.

use keel_core::error::KeelError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("group {0} cannot be nested in itself")]
    SelfNesting(Uuid),

    #[error("nesting group {child} in {parent} would create a cycle")]
    GroupCycle { parent: Uuid, child: Uuid },

    #[error("caller has no tenant context")]
    MissingTenant,

    #[error("access denied: {0}")]
    Denied(String),
}

impl From<AuthzError> for KeelError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::SelfNesting(_) | AuthzError::GroupCycle { .. } => KeelError::Validation {
                message: err.to_string(),
            },
            AuthzError::MissingTenant => KeelError::TenantContext,
            AuthzError::Denied(reason) => KeelError::AuthorizationDenied { reason },
        }
    }
}
