//! Record-level access checks.
//!
//! Object permissions gate every check. Past the gate, a record is
//! reachable through the collection's org-wide default, ownership, the
//! owner's manager chain, a sharing rule or an explicit record share.
//! Rules and shares are a separate access path: they never widen the
//! object permissions themselves.

use std::collections::HashSet;
use std::fmt;

use keel_core::error::KeelResult;
use keel_core::models::permission::ObjectPermissions;
use keel_core::models::sharing::{
    InternalAccess, RecordShare, ShareAccessLevel, ShareTarget, SharingRule, SharingRuleTarget,
    SharingRuleType,
};
use keel_core::repository::{
    GrantRepository, GroupRepository, PermissionSetRepository, SharingRepository, UserRepository,
};
use tracing::debug;
use uuid::Uuid;

use crate::error::AuthzError;
use crate::service::{PermissionResolutionService, Principal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessType {
    Read,
    Edit,
    Delete,
}

impl AccessType {
    fn allowed_by(self, permissions: &ObjectPermissions) -> bool {
        match self {
            Self::Read => permissions.can_read,
            Self::Edit => permissions.can_edit,
            Self::Delete => permissions.can_delete,
        }
    }

    /// `view_all` covers reads, `modify_all` covers edits and deletes.
    fn bypassed_by(self, permissions: &ObjectPermissions) -> bool {
        match self {
            Self::Read => permissions.can_view_all,
            Self::Edit | Self::Delete => permissions.can_modify_all,
        }
    }

    fn allowed_by_default(self, access: InternalAccess) -> bool {
        match access {
            InternalAccess::PublicReadWrite => true,
            InternalAccess::PublicRead => self == Self::Read,
            InternalAccess::Private => false,
        }
    }

    fn allowed_by_share(self, level: ShareAccessLevel) -> bool {
        self == Self::Read || level == ShareAccessLevel::ReadWrite
    }
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Read => "read",
            Self::Edit => "edit",
            Self::Delete => "delete",
        })
    }
}

/// A record being accessed.
#[derive(Debug, Clone, Copy)]
pub struct RecordRef<'a> {
    pub collection_id: Uuid,
    pub record_id: &'a str,
    /// Creator of the record, when known.
    pub owner_id: Option<Uuid>,
}

/// Decides whether a principal may read, edit or delete one record.
pub struct RecordAccessService<U, G, P, R, S>
where
    U: UserRepository,
    G: GroupRepository,
    P: PermissionSetRepository,
    R: GrantRepository,
    S: SharingRepository,
{
    resolver: PermissionResolutionService<U, G, P, R>,
    sharing: S,
}

impl<U, G, P, R, S> RecordAccessService<U, G, P, R, S>
where
    U: UserRepository,
    G: GroupRepository,
    P: PermissionSetRepository,
    R: GrantRepository,
    S: SharingRepository,
{
    pub fn new(resolver: PermissionResolutionService<U, G, P, R>, sharing: S) -> Self {
        Self { resolver, sharing }
    }

    pub fn resolver(&self) -> &PermissionResolutionService<U, G, P, R> {
        &self.resolver
    }

    pub async fn can_access(
        &self,
        principal: &Principal,
        record: RecordRef<'_>,
        access: AccessType,
    ) -> KeelResult<bool> {
        let tenant_id = principal.tenant_id;
        let user_id = principal.user_id;

        let permissions = self
            .resolver
            .get_object_permissions(principal, record.collection_id)
            .await?;
        if !access.allowed_by(&permissions) {
            debug!(%user_id, record_id = record.record_id, %access, "Denied by object permissions");
            return Ok(false);
        }
        if access.bypassed_by(&permissions) {
            return Ok(true);
        }

        let internal_access = self
            .sharing
            .get_org_wide_default(tenant_id, record.collection_id)
            .await?
            .map(|owd| owd.internal_access)
            .unwrap_or_default();
        if access.allowed_by_default(internal_access) {
            return Ok(true);
        }

        if let Some(owner_id) = record.owner_id {
            if owner_id == user_id {
                return Ok(true);
            }
            if self.manages(tenant_id, user_id, owner_id).await? {
                debug!(%user_id, %owner_id, "Granted through manager hierarchy");
                return Ok(true);
            }
        }

        // Computed at most once, for rules and shares alike.
        let mut caller_groups = None;

        if self
            .rule_grants(principal, record, access, &mut caller_groups)
            .await?
        {
            debug!(%user_id, record_id = record.record_id, "Granted through sharing rule");
            return Ok(true);
        }

        if self
            .shared_with(principal, record, access, &mut caller_groups)
            .await?
        {
            return Ok(true);
        }

        debug!(
            %user_id,
            collection_id = %record.collection_id,
            record_id = record.record_id,
            %access,
            "Record access denied"
        );
        Ok(false)
    }

    /// Like [`Self::can_access`], failing with an authorization error
    /// when access is not granted.
    pub async fn require_access(
        &self,
        principal: &Principal,
        record: RecordRef<'_>,
        access: AccessType,
    ) -> KeelResult<()> {
        if self.can_access(principal, record, access).await? {
            Ok(())
        } else {
            Err(AuthzError::Denied(format!(
                "{access} access to record {} of collection {}",
                record.record_id, record.collection_id
            ))
            .into())
        }
    }

    /// Whether `user_id` sits anywhere above `owner_id` in the manager
    /// chain.
    async fn manages(&self, tenant_id: Uuid, user_id: Uuid, owner_id: Uuid) -> KeelResult<bool> {
        let users = self.resolver.collector().users();
        let mut visited = HashSet::new();
        let mut current = owner_id;

        loop {
            let manager_id = match users.get_by_id(tenant_id, current).await {
                Ok(user) => user.manager_id,
                Err(e) if e.is_not_found() => None,
                Err(e) => return Err(e),
            };
            let Some(manager_id) = manager_id else {
                return Ok(false);
            };
            if manager_id == user_id {
                return Ok(true);
            }
            if !visited.insert(manager_id) {
                return Ok(false);
            }
            current = manager_id;
        }
    }

    /// The principal's transitive groups, loaded on first use.
    async fn groups_of<'c>(
        &self,
        principal: &Principal,
        cache: &'c mut Option<HashSet<Uuid>>,
    ) -> KeelResult<&'c HashSet<Uuid>> {
        if cache.is_none() {
            let groups = self
                .resolver
                .collector()
                .groups()
                .effective_group_ids(principal.tenant_id, principal.user_id)
                .await?;
            *cache = Some(groups);
        }
        Ok(cache.get_or_insert_with(HashSet::new))
    }

    async fn rule_grants(
        &self,
        principal: &Principal,
        record: RecordRef<'_>,
        access: AccessType,
        caller_groups: &mut Option<HashSet<Uuid>>,
    ) -> KeelResult<bool> {
        let rules: Vec<SharingRule> = self
            .sharing
            .list_active_sharing_rules(principal.tenant_id, record.collection_id)
            .await?
            .into_iter()
            .filter(|r| access.allowed_by_share(r.access_level))
            .collect();
        if rules.is_empty() {
            return Ok(false);
        }

        let owner_groups = match record.owner_id {
            Some(owner_id) if rules.iter().any(|r| owner_group(r).is_some()) => Some(
                self.resolver
                    .collector()
                    .groups()
                    .effective_group_ids(principal.tenant_id, owner_id)
                    .await?,
            ),
            _ => None,
        };
        let groups = self.groups_of(principal, caller_groups).await?;

        Ok(rules
            .iter()
            .any(|rule| rule_applies(rule, groups, owner_groups.as_ref())))
    }

    async fn shared_with(
        &self,
        principal: &Principal,
        record: RecordRef<'_>,
        access: AccessType,
        caller_groups: &mut Option<HashSet<Uuid>>,
    ) -> KeelResult<bool> {
        let shares: Vec<RecordShare> = self
            .sharing
            .list_record_shares(principal.tenant_id, record.collection_id, record.record_id)
            .await?
            .into_iter()
            .filter(|s| access.allowed_by_share(s.access_level))
            .collect();
        if shares.is_empty() {
            return Ok(false);
        }

        if shares
            .iter()
            .any(|s| s.shared_with == ShareTarget::User(principal.user_id))
        {
            return Ok(true);
        }

        if !shares.iter().any(|s| matches!(s.shared_with, ShareTarget::Group(_))) {
            return Ok(false);
        }
        let groups = self.groups_of(principal, caller_groups).await?;

        Ok(shares.iter().any(|s| match s.shared_with {
            ShareTarget::Group(group_id) => groups.contains(&group_id),
            ShareTarget::User(_) => false,
        }))
    }
}

/// The group whose members' records an owner-based rule opens up.
fn owner_group(rule: &SharingRule) -> Option<Uuid> {
    match rule.rule_type {
        SharingRuleType::OwnerBased => rule.shared_from.as_deref()?.parse().ok(),
        SharingRuleType::CriteriaBased => None,
    }
}

/// Whether a rule reaches a caller in `caller_groups`. Role targets
/// reach everyone. Criteria are not evaluated against record data.
fn rule_applies(
    rule: &SharingRule,
    caller_groups: &HashSet<Uuid>,
    owner_groups: Option<&HashSet<Uuid>>,
) -> bool {
    let targeted = match &rule.shared_to {
        SharingRuleTarget::Role(_) => true,
        SharingRuleTarget::Group(id) | SharingRuleTarget::Queue(id) => caller_groups.contains(id),
    };

    targeted
        && owner_group(rule).is_none_or(|from| owner_groups.is_some_and(|g| g.contains(&from)))
}
