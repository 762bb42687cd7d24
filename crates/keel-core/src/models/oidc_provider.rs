//! OIDC provider domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An external identity provider whose tokens are accepted by the
/// platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OidcProvider {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    /// Expected `iss` claim.
    pub issuer: String,
    /// Claim holding the caller's roles; dotted paths address nested
    /// claims (e.g., `realm_access.roles`).
    pub roles_claim: Option<String>,
    /// JSON object mapping provider role names to platform role names.
    pub roles_mapping: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOidcProvider {
    pub tenant_id: Uuid,
    pub name: String,
    pub issuer: String,
    pub roles_claim: Option<String>,
    pub roles_mapping: Option<String>,
}
