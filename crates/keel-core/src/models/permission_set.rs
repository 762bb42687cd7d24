//! Permission set domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An optional, additive bundle of grants assignable to many users and
/// groups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionSet {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub description: String,
    pub is_system: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePermissionSet {
    pub tenant_id: Uuid,
    pub name: String,
    pub description: String,
    pub is_system: bool,
}
