//! Permission resolution service, the entry point for effective
//! permission lookups.

use std::collections::HashMap;

use keel_core::error::KeelResult;
use keel_core::models::permission::{ObjectPermissions, SystemPermission};
use keel_core::repository::{
    GrantRepository, GroupRepository, PermissionSetRepository, UserRepository,
};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::collector::{CollectedGrants, GrantCollector};
use crate::config::AuthzConfig;
use crate::merge::{
    self, FieldVisibilities, SystemPermissions, field_visibility_by_collection,
    merge_system_permissions, object_permissions_by_collection,
};

/// The subject of a resolution. Carried explicitly on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub platform_admin: bool,
}

impl Principal {
    pub fn user(tenant_id: Uuid, user_id: Uuid) -> Self {
        Self {
            tenant_id,
            user_id,
            platform_admin: false,
        }
    }

    pub fn platform_admin(tenant_id: Uuid, user_id: Uuid) -> Self {
        Self {
            tenant_id,
            user_id,
            platform_admin: true,
        }
    }
}

/// Effective permissions of one user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPermissions {
    /// Set for platform admins and when enforcement is disabled; every
    /// object capability is then granted regardless of the maps below.
    pub all_permissive: bool,
    pub system_permissions: SystemPermissions,
    pub object_permissions: HashMap<Uuid, ObjectPermissions>,
    pub field_permissions: HashMap<Uuid, FieldVisibilities>,
}

impl ResolvedPermissions {
    pub fn all_permissive() -> Self {
        Self {
            all_permissive: true,
            system_permissions: merge::uniform_system_permissions(true),
            object_permissions: HashMap::new(),
            field_permissions: HashMap::new(),
        }
    }

    /// The result for a user that could not be resolved: every catalogue
    /// key present and denied.
    pub fn empty() -> Self {
        Self {
            all_permissive: false,
            system_permissions: merge_system_permissions(&[]),
            object_permissions: HashMap::new(),
            field_permissions: HashMap::new(),
        }
    }

    pub fn from_grants(grants: &CollectedGrants) -> Self {
        Self {
            all_permissive: false,
            system_permissions: merge_system_permissions(&grants.system_grants),
            object_permissions: object_permissions_by_collection(&grants.object_grants),
            field_permissions: field_visibility_by_collection(&grants.field_grants),
        }
    }

    pub fn object_permissions_for(&self, collection_id: Uuid) -> ObjectPermissions {
        if self.all_permissive {
            return ObjectPermissions::ALL;
        }
        self.object_permissions
            .get(&collection_id)
            .copied()
            .unwrap_or(ObjectPermissions::NONE)
    }

    pub fn field_permissions_for(&self, collection_id: Uuid) -> FieldVisibilities {
        self.field_permissions
            .get(&collection_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn has_system_permission(&self, permission: SystemPermission) -> bool {
        self.system_permissions
            .get(&permission)
            .copied()
            .unwrap_or(false)
    }
}

/// Resolves effective permissions by collecting and merging grants.
///
/// Generic over repository implementations so that the resolution
/// layer has no dependency on the database crate. Holds no cache:
/// every call reflects persisted state.
pub struct PermissionResolutionService<U, G, P, R>
where
    U: UserRepository,
    G: GroupRepository,
    P: PermissionSetRepository,
    R: GrantRepository,
{
    collector: GrantCollector<U, G, P, R>,
    config: AuthzConfig,
}

impl<U, G, P, R> PermissionResolutionService<U, G, P, R>
where
    U: UserRepository,
    G: GroupRepository,
    P: PermissionSetRepository,
    R: GrantRepository,
{
    pub fn new(collector: GrantCollector<U, G, P, R>, config: AuthzConfig) -> Self {
        Self { collector, config }
    }

    pub fn collector(&self) -> &GrantCollector<U, G, P, R> {
        &self.collector
    }

    pub fn config(&self) -> &AuthzConfig {
        &self.config
    }

    /// Platform admins and disabled enforcement skip resolution.
    fn bypasses(&self, principal: &Principal) -> bool {
        if principal.platform_admin {
            debug!(tenant_id = %principal.tenant_id, user_id = %principal.user_id, "Platform admin bypass");
            return true;
        }
        !self.config.permissions_enabled
    }

    /// Full effective permission set of the principal.
    pub async fn resolve_for_user(&self, principal: &Principal) -> KeelResult<ResolvedPermissions> {
        if self.bypasses(principal) {
            return Ok(ResolvedPermissions::all_permissive());
        }

        let holders = self
            .collector
            .holders_for_user(principal.tenant_id, principal.user_id)
            .await?;
        if holders.is_empty() {
            return Ok(ResolvedPermissions::empty());
        }

        let grants = self
            .collector
            .collect_from(principal.tenant_id, &holders)
            .await?;
        let resolved = ResolvedPermissions::from_grants(&grants);

        debug!(
            tenant_id = %principal.tenant_id,
            user_id = %principal.user_id,
            sources = holders.len(),
            collections = resolved.object_permissions.len(),
            "Resolved permissions"
        );
        Ok(resolved)
    }

    /// Merged object permissions of the principal on one collection.
    pub async fn get_object_permissions(
        &self,
        principal: &Principal,
        collection_id: Uuid,
    ) -> KeelResult<ObjectPermissions> {
        if self.bypasses(principal) {
            return Ok(ObjectPermissions::ALL);
        }

        let grants = self
            .collector
            .collect_grants(principal.tenant_id, principal.user_id)
            .await?;

        Ok(merge::merge_object_permissions(
            grants
                .object_grants
                .iter()
                .filter(|g| g.collection_id == collection_id)
                .map(|g| g.permissions),
        ))
    }

    /// Merged field visibilities of the principal on one collection.
    /// Fields without any grant are absent and default to visible.
    pub async fn get_field_permissions(
        &self,
        principal: &Principal,
        collection_id: Uuid,
    ) -> KeelResult<FieldVisibilities> {
        if self.bypasses(principal) {
            return Ok(FieldVisibilities::new());
        }

        let grants = self
            .collector
            .collect_grants(principal.tenant_id, principal.user_id)
            .await?;

        let mut by_field: HashMap<Uuid, Vec<_>> = HashMap::new();
        for grant in grants
            .field_grants
            .iter()
            .filter(|g| g.collection_id == collection_id)
        {
            by_field.entry(grant.field_id).or_default().push(grant.visibility);
        }

        Ok(by_field
            .into_iter()
            .map(|(field_id, visibilities)| (field_id, merge::merge_field_visibility(visibilities)))
            .collect())
    }

    /// Whether the principal holds one system permission.
    pub async fn has_system_permission(
        &self,
        principal: &Principal,
        permission: SystemPermission,
    ) -> KeelResult<bool> {
        if self.bypasses(principal) {
            return Ok(true);
        }

        let grants = self
            .collector
            .collect_grants(principal.tenant_id, principal.user_id)
            .await?;

        Ok(grants
            .system_grants
            .iter()
            .any(|g| g.permission == permission && g.granted))
    }
}
