//! Gathers the raw grants that apply to a user.
//!
//! Sources are the user's profile plus every permission set assigned
//! directly to the user or to any group in the user's transitive group
//! set. A permission set reachable through several paths contributes
//! once.

use std::collections::BTreeSet;

use keel_core::error::KeelResult;
use keel_core::models::permission::{
    FieldPermissionGrant, GrantHolder, ObjectPermissionGrant, SystemPermissionGrant,
};
use keel_core::repository::{
    GrantRepository, GroupRepository, PermissionSetRepository, UserRepository,
};
use tracing::debug;
use uuid::Uuid;

use crate::groups::GroupMembershipResolver;

/// Raw grants of every source that applies to a user, tagged with the
/// holder each came from.
#[derive(Debug, Clone, Default)]
pub struct CollectedGrants {
    pub object_grants: Vec<ObjectPermissionGrant>,
    pub field_grants: Vec<FieldPermissionGrant>,
    pub system_grants: Vec<SystemPermissionGrant>,
}

/// Collects grants from profiles and permission sets.
pub struct GrantCollector<U, G, P, R>
where
    U: UserRepository,
    G: GroupRepository,
    P: PermissionSetRepository,
    R: GrantRepository,
{
    users: U,
    groups: GroupMembershipResolver<G>,
    permission_sets: P,
    grants: R,
}

impl<U, G, P, R> GrantCollector<U, G, P, R>
where
    U: UserRepository,
    G: GroupRepository,
    P: PermissionSetRepository,
    R: GrantRepository,
{
    pub fn new(users: U, groups: GroupMembershipResolver<G>, permission_sets: P, grants: R) -> Self {
        Self {
            users,
            groups,
            permission_sets,
            grants,
        }
    }

    pub fn users(&self) -> &U {
        &self.users
    }

    pub fn groups(&self) -> &GroupMembershipResolver<G> {
        &self.groups
    }

    /// The holders whose grants apply to the user: the profile first,
    /// then each distinct permission set. Empty for an unknown user.
    pub async fn holders_for_user(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> KeelResult<Vec<GrantHolder>> {
        let user = match self.users.get_by_id(tenant_id, user_id).await {
            Ok(user) => user,
            Err(e) if e.is_not_found() => {
                debug!(%tenant_id, %user_id, "Unknown user, no grants collected");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let mut set_ids: BTreeSet<Uuid> = self
            .permission_sets
            .get_user_permission_set_ids(tenant_id, user_id)
            .await?
            .into_iter()
            .collect();

        let group_ids: Vec<Uuid> = self
            .groups
            .effective_group_ids(tenant_id, user_id)
            .await?
            .into_iter()
            .collect();
        if !group_ids.is_empty() {
            set_ids.extend(
                self.permission_sets
                    .get_group_permission_set_ids(tenant_id, &group_ids)
                    .await?,
            );
        }

        let mut holders = Vec::with_capacity(set_ids.len() + 1);
        holders.push(GrantHolder::Profile(user.profile_id));
        holders.extend(set_ids.into_iter().map(GrantHolder::PermissionSet));
        Ok(holders)
    }

    /// Every grant row that applies to the user.
    pub async fn collect_grants(&self, tenant_id: Uuid, user_id: Uuid) -> KeelResult<CollectedGrants> {
        let holders = self.holders_for_user(tenant_id, user_id).await?;
        let collected = self.collect_from(tenant_id, &holders).await?;

        debug!(
            %tenant_id,
            %user_id,
            sources = holders.len(),
            object_grants = collected.object_grants.len(),
            field_grants = collected.field_grants.len(),
            system_grants = collected.system_grants.len(),
            "Collected permission grants"
        );
        Ok(collected)
    }

    /// Every grant row held by the given holders.
    pub async fn collect_from(
        &self,
        tenant_id: Uuid,
        holders: &[GrantHolder],
    ) -> KeelResult<CollectedGrants> {
        let mut collected = CollectedGrants::default();
        for holder in holders {
            let grants = self.grants.get_holder_grants(tenant_id, *holder).await?;
            collected.object_grants.extend(grants.object);
            collected.field_grants.extend(grants.field);
            collected.system_grants.extend(grants.system);
        }
        Ok(collected)
    }
}
