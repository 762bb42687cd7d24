//! Record sharing domain models: org-wide defaults and record shares.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::KeelError;

/// Baseline record visibility of a collection inside its tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InternalAccess {
    Private,
    PublicRead,
    #[default]
    PublicReadWrite,
}

impl InternalAccess {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "PRIVATE",
            Self::PublicRead => "PUBLIC_READ",
            Self::PublicReadWrite => "PUBLIC_READ_WRITE",
        }
    }
}

impl FromStr for InternalAccess {
    type Err = KeelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PRIVATE" => Ok(Self::Private),
            "PUBLIC_READ" => Ok(Self::PublicRead),
            "PUBLIC_READ_WRITE" => Ok(Self::PublicReadWrite),
            other => Err(KeelError::validation(format!(
                "unknown internal access level: {other}"
            ))),
        }
    }
}

/// Org-wide default for one collection. Absent rows mean
/// [`InternalAccess::PublicReadWrite`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgWideDefault {
    pub tenant_id: Uuid,
    pub collection_id: Uuid,
    pub internal_access: InternalAccess,
    pub updated_at: DateTime<Utc>,
}

/// Who a record is shared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id")]
pub enum ShareTarget {
    User(Uuid),
    Group(Uuid),
}

impl ShareTarget {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::User(_) => "USER",
            Self::Group(_) => "GROUP",
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Self::User(id) | Self::Group(id) => *id,
        }
    }

    pub fn from_parts(kind: &str, id: Uuid) -> Option<Self> {
        match kind {
            "USER" => Some(Self::User(id)),
            "GROUP" => Some(Self::Group(id)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShareAccessLevel {
    Read,
    ReadWrite,
}

impl ShareAccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "READ",
            Self::ReadWrite => "READ_WRITE",
        }
    }
}

impl FromStr for ShareAccessLevel {
    type Err = KeelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "READ" => Ok(Self::Read),
            "READ_WRITE" => Ok(Self::ReadWrite),
            other => Err(KeelError::validation(format!(
                "unknown share access level: {other}"
            ))),
        }
    }
}

/// Explicit access to one record for one user or group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordShare {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub collection_id: Uuid,
    pub record_id: String,
    pub shared_with: ShareTarget,
    pub access_level: ShareAccessLevel,
    pub reason: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRecordShare {
    pub tenant_id: Uuid,
    pub collection_id: Uuid,
    pub record_id: String,
    pub shared_with: ShareTarget,
    pub access_level: ShareAccessLevel,
    pub reason: Option<String>,
    pub created_by: Uuid,
}

/// How a sharing rule selects the records it opens up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SharingRuleType {
    /// Records owned by members of `shared_from`.
    OwnerBased,
    /// Records matching `criteria`.
    CriteriaBased,
}

impl SharingRuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OwnerBased => "OWNER_BASED",
            Self::CriteriaBased => "CRITERIA_BASED",
        }
    }
}

impl FromStr for SharingRuleType {
    type Err = KeelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OWNER_BASED" => Ok(Self::OwnerBased),
            "CRITERIA_BASED" => Ok(Self::CriteriaBased),
            other => Err(KeelError::validation(format!(
                "unknown sharing rule type: {other}"
            ))),
        }
    }
}

/// Who a sharing rule opens records to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id")]
pub enum SharingRuleTarget {
    /// A role name. Roles are not modelled, so every user of the
    /// tenant matches.
    Role(String),
    Group(Uuid),
    /// A work queue, backed by a group.
    Queue(Uuid),
}

impl SharingRuleTarget {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Role(_) => "ROLE",
            Self::Group(_) => "GROUP",
            Self::Queue(_) => "QUEUE",
        }
    }

    /// Stored form of the target reference.
    pub fn value(&self) -> String {
        match self {
            Self::Role(name) => name.clone(),
            Self::Group(id) | Self::Queue(id) => id.to_string(),
        }
    }

    pub fn from_parts(kind: &str, value: &str) -> Option<Self> {
        match kind {
            "ROLE" => Some(Self::Role(value.to_string())),
            "GROUP" => value.parse().ok().map(Self::Group),
            "QUEUE" => value.parse().ok().map(Self::Queue),
            _ => None,
        }
    }
}

/// Collection-wide access granted to a role, group or queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharingRule {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub collection_id: Uuid,
    pub name: String,
    pub rule_type: SharingRuleType,
    pub shared_from: Option<String>,
    pub shared_to: SharingRuleTarget,
    pub access_level: ShareAccessLevel,
    pub criteria: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSharingRule {
    pub tenant_id: Uuid,
    pub collection_id: Uuid,
    pub name: String,
    pub rule_type: SharingRuleType,
    pub shared_from: Option<String>,
    pub shared_to: SharingRuleTarget,
    pub access_level: ShareAccessLevel,
    pub criteria: Option<String>,
}
