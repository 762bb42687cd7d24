//! Profile domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The mandatory baseline permission template of a user.
///
/// A profile holds object, field and system permission grants with the
/// same shape as a permission set, but each user has exactly one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub description: String,
    /// Seeded by the platform; not meant to be deleted by tenants.
    pub is_system: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProfile {
    pub tenant_id: Uuid,
    pub name: String,
    pub description: String,
    pub is_system: bool,
}
