//! Permission domain model: object flags, field visibility, the system
//! permission catalogue and the grant rows held by profiles and
//! permission sets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::KeelError;

/// The owner of a grant row. Profiles and permission sets hold grants
/// of the same shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id")]
pub enum GrantHolder {
    Profile(Uuid),
    PermissionSet(Uuid),
}

impl GrantHolder {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Profile(_) => "Profile",
            Self::PermissionSet(_) => "PermissionSet",
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Self::Profile(id) | Self::PermissionSet(id) => *id,
        }
    }

    /// Rebuild a holder from its stored `(kind, id)` pair.
    pub fn from_parts(kind: &str, id: Uuid) -> Option<Self> {
        match kind {
            "Profile" => Some(Self::Profile(id)),
            "PermissionSet" => Some(Self::PermissionSet(id)),
            _ => None,
        }
    }
}

/// Collection-scoped CRUD and view-all/modify-all flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectPermissions {
    pub can_create: bool,
    pub can_read: bool,
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_view_all: bool,
    pub can_modify_all: bool,
}

impl ObjectPermissions {
    /// No capability granted.
    pub const NONE: Self = Self {
        can_create: false,
        can_read: false,
        can_edit: false,
        can_delete: false,
        can_view_all: false,
        can_modify_all: false,
    };

    /// Every capability granted.
    pub const ALL: Self = Self {
        can_create: true,
        can_read: true,
        can_edit: true,
        can_delete: true,
        can_view_all: true,
        can_modify_all: true,
    };

    /// Flag-wise OR of two grants.
    pub fn merge(self, other: Self) -> Self {
        Self {
            can_create: self.can_create || other.can_create,
            can_read: self.can_read || other.can_read,
            can_edit: self.can_edit || other.can_edit,
            can_delete: self.can_delete || other.can_delete,
            can_view_all: self.can_view_all || other.can_view_all,
            can_modify_all: self.can_modify_all || other.can_modify_all,
        }
    }
}

/// Field-scoped visibility.
///
/// Variants are ordered from least to most restrictive, so the
/// most-restrictive of several grants is their maximum.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldVisibility {
    #[default]
    Visible,
    ReadOnly,
    Hidden,
}

impl FieldVisibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Visible => "VISIBLE",
            Self::ReadOnly => "READ_ONLY",
            Self::Hidden => "HIDDEN",
        }
    }
}

impl fmt::Display for FieldVisibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldVisibility {
    type Err = KeelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "VISIBLE" => Ok(Self::Visible),
            "READ_ONLY" => Ok(Self::ReadOnly),
            "HIDDEN" => Ok(Self::Hidden),
            other => Err(KeelError::validation(format!(
                "unknown field visibility: {other}"
            ))),
        }
    }
}

/// The fixed catalogue of tenant-wide system permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SystemPermission {
    ViewSetup,
    CustomizeApplication,
    ManageUsers,
    ManageGroups,
    ManageReports,
    ManageWorkflows,
    ManageListviews,
    ManageEmailTemplates,
    ManageApprovals,
    ApiAccess,
    ViewAllData,
    ModifyAllData,
}

impl SystemPermission {
    pub const ALL: [SystemPermission; 12] = [
        Self::ViewSetup,
        Self::CustomizeApplication,
        Self::ManageUsers,
        Self::ManageGroups,
        Self::ManageReports,
        Self::ManageWorkflows,
        Self::ManageListviews,
        Self::ManageEmailTemplates,
        Self::ManageApprovals,
        Self::ApiAccess,
        Self::ViewAllData,
        Self::ModifyAllData,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ViewSetup => "VIEW_SETUP",
            Self::CustomizeApplication => "CUSTOMIZE_APPLICATION",
            Self::ManageUsers => "MANAGE_USERS",
            Self::ManageGroups => "MANAGE_GROUPS",
            Self::ManageReports => "MANAGE_REPORTS",
            Self::ManageWorkflows => "MANAGE_WORKFLOWS",
            Self::ManageListviews => "MANAGE_LISTVIEWS",
            Self::ManageEmailTemplates => "MANAGE_EMAIL_TEMPLATES",
            Self::ManageApprovals => "MANAGE_APPROVALS",
            Self::ApiAccess => "API_ACCESS",
            Self::ViewAllData => "VIEW_ALL_DATA",
            Self::ModifyAllData => "MODIFY_ALL_DATA",
        }
    }
}

impl fmt::Display for SystemPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SystemPermission {
    type Err = KeelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| KeelError::validation(format!("unknown system permission: {s}")))
    }
}

/// One object permission row of a profile or permission set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectPermissionGrant {
    pub holder: GrantHolder,
    pub collection_id: Uuid,
    pub permissions: ObjectPermissions,
}

/// One field permission row of a profile or permission set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPermissionGrant {
    pub holder: GrantHolder,
    pub collection_id: Uuid,
    pub field_id: Uuid,
    pub visibility: FieldVisibility,
}

/// One system permission row of a profile or permission set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemPermissionGrant {
    pub holder: GrantHolder,
    pub permission: SystemPermission,
    pub granted: bool,
}
