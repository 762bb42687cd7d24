//! Default profiles of a newly provisioned tenant.

use keel_core::error::KeelResult;
use keel_core::models::permission::{
    GrantHolder, ObjectPermissionGrant, ObjectPermissions, SystemPermission,
    SystemPermissionGrant,
};
use keel_core::models::profile::{CreateProfile, Profile};
use keel_core::repository::{CollectionRepository, GrantRepository, ProfileRepository};
use tracing::{debug, info};
use uuid::Uuid;

use SystemPermission::*;

/// Template of one seeded profile.
#[derive(Debug, Clone, Copy)]
pub struct DefaultProfile {
    pub name: &'static str,
    pub description: &'static str,
    /// Granted system permissions; every other catalogue key is seeded
    /// as explicitly not granted.
    pub system_permissions: &'static [SystemPermission],
    /// Object permissions on every active collection. `None` seeds no
    /// object rows.
    pub object_permissions: Option<ObjectPermissions>,
}

const CRUD: ObjectPermissions = ObjectPermissions {
    can_create: true,
    can_read: true,
    can_edit: true,
    can_delete: true,
    can_view_all: false,
    can_modify_all: false,
};

pub const DEFAULT_PROFILES: [DefaultProfile; 7] = [
    DefaultProfile {
        name: "System Administrator",
        description: "Full, unrestricted access to all features and data",
        system_permissions: &SystemPermission::ALL,
        object_permissions: Some(ObjectPermissions::ALL),
    },
    DefaultProfile {
        name: "Standard User",
        description: "Read, create, and edit records in all collections",
        system_permissions: &[ApiAccess, ManageListviews],
        object_permissions: Some(CRUD),
    },
    DefaultProfile {
        name: "Read Only",
        description: "View all records and reports, no create/edit/delete capability",
        system_permissions: &[ViewAllData],
        object_permissions: Some(ObjectPermissions {
            can_read: true,
            can_view_all: true,
            ..ObjectPermissions::NONE
        }),
    },
    DefaultProfile {
        name: "Marketing User",
        description: "Standard User plus manage email templates",
        system_permissions: &[ApiAccess, ManageListviews, ManageEmailTemplates],
        object_permissions: Some(CRUD),
    },
    DefaultProfile {
        name: "Contract Manager",
        description: "Standard User plus manage approval processes",
        system_permissions: &[ApiAccess, ManageListviews, ManageApprovals],
        object_permissions: Some(CRUD),
    },
    DefaultProfile {
        name: "Solution Manager",
        description: "Customize application structure: collections, fields, layouts, picklists, reports",
        system_permissions: &[
            ViewSetup,
            CustomizeApplication,
            ManageReports,
            ManageWorkflows,
            ManageListviews,
            ApiAccess,
        ],
        object_permissions: Some(ObjectPermissions {
            can_view_all: true,
            ..CRUD
        }),
    },
    DefaultProfile {
        name: "Minimum Access",
        description: "Login only, no data access until explicitly granted via Permission Sets",
        system_permissions: &[],
        object_permissions: None,
    },
];

/// Template for a profile name, if it is one of the defaults.
pub fn default_profile(name: &str) -> Option<&'static DefaultProfile> {
    DEFAULT_PROFILES.iter().find(|p| p.name == name)
}

/// Seeds default profiles and their grants.
pub struct DefaultProfileSeeder<P, R, C>
where
    P: ProfileRepository,
    R: GrantRepository,
    C: CollectionRepository,
{
    profiles: P,
    grants: R,
    collections: C,
}

impl<P, R, C> DefaultProfileSeeder<P, R, C>
where
    P: ProfileRepository,
    R: GrantRepository,
    C: CollectionRepository,
{
    pub fn new(profiles: P, grants: R, collections: C) -> Self {
        Self {
            profiles,
            grants,
            collections,
        }
    }

    /// Create the seven default profiles of a tenant with a complete set
    /// of system permission rows, then object permissions on every
    /// active collection.
    pub async fn seed_default_profiles(&self, tenant_id: Uuid) -> KeelResult<Vec<Profile>> {
        info!(%tenant_id, "Seeding default profiles");

        let mut seeded = Vec::with_capacity(DEFAULT_PROFILES.len());
        for template in &DEFAULT_PROFILES {
            let profile = self
                .profiles
                .create(CreateProfile {
                    tenant_id,
                    name: template.name.into(),
                    description: template.description.into(),
                    is_system: true,
                })
                .await?;

            let holder = GrantHolder::Profile(profile.id);
            for permission in SystemPermission::ALL {
                self.grants
                    .set_system_permission(
                        tenant_id,
                        SystemPermissionGrant {
                            holder,
                            permission,
                            granted: template.system_permissions.contains(&permission),
                        },
                    )
                    .await?;
            }
            seeded.push(profile);
        }

        for collection in self.collections.list_active(tenant_id).await? {
            self.seed_object_permissions_for_collection(tenant_id, collection.id)
                .await?;
        }

        info!(%tenant_id, profiles = seeded.len(), "Seeded default profiles");
        Ok(seeded)
    }

    /// Give every default profile of the tenant its object permissions
    /// on one collection. Returns the number of rows written.
    pub async fn seed_object_permissions_for_collection(
        &self,
        tenant_id: Uuid,
        collection_id: Uuid,
    ) -> KeelResult<usize> {
        let mut written = 0;
        for profile in self.profiles.list(tenant_id).await? {
            let Some(permissions) =
                default_profile(&profile.name).and_then(|t| t.object_permissions)
            else {
                continue;
            };

            self.grants
                .set_object_permission(
                    tenant_id,
                    ObjectPermissionGrant {
                        holder: GrantHolder::Profile(profile.id),
                        collection_id,
                        permissions,
                    },
                )
                .await?;
            written += 1;
        }

        debug!(%tenant_id, %collection_id, written, "Seeded collection object permissions");
        Ok(written)
    }
}
