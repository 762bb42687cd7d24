//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Tenant-scoped repositories
//! require a `tenant_id` parameter to enforce data isolation.

use uuid::Uuid;

use crate::error::KeelResult;
use crate::models::{
    collection::{Collection, CreateCollection, CreateField, Field},
    group::{CreateGroup, Group, UpdateGroup},
    oidc_provider::{CreateOidcProvider, OidcProvider},
    permission::{FieldPermissionGrant, GrantHolder, ObjectPermissionGrant, SystemPermissionGrant},
    permission_set::{CreatePermissionSet, PermissionSet},
    profile::{CreateProfile, Profile},
    sharing::{
        CreateRecordShare, CreateSharingRule, InternalAccess, OrgWideDefault, RecordShare,
        SharingRule,
    },
    tenant::{CreateTenant, Tenant, UpdateTenant},
    user::{CreateUser, UpdateUser, User},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Tenant (global scope)
// ---------------------------------------------------------------------------

pub trait TenantRepository: Send + Sync {
    fn create(&self, input: CreateTenant) -> impl Future<Output = KeelResult<Tenant>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = KeelResult<Tenant>> + Send;
    fn get_by_slug(&self, slug: &str) -> impl Future<Output = KeelResult<Tenant>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateTenant,
    ) -> impl Future<Output = KeelResult<Tenant>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = KeelResult<PaginatedResult<Tenant>>> + Send;
}

// ---------------------------------------------------------------------------
// Tenant-scoped repositories
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = KeelResult<User>> + Send;
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = KeelResult<User>> + Send;
    fn get_by_email(
        &self,
        tenant_id: Uuid,
        email: &str,
    ) -> impl Future<Output = KeelResult<User>> + Send;
    fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateUser,
    ) -> impl Future<Output = KeelResult<User>> + Send;
    fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = KeelResult<PaginatedResult<User>>> + Send;
}

pub trait CollectionRepository: Send + Sync {
    fn create(
        &self,
        input: CreateCollection,
    ) -> impl Future<Output = KeelResult<Collection>> + Send;
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = KeelResult<Collection>> + Send;
    /// Look up a collection by its API name.
    fn get_by_name(
        &self,
        tenant_id: Uuid,
        name: &str,
    ) -> impl Future<Output = KeelResult<Collection>> + Send;
    /// All active collections of the tenant.
    fn list_active(&self, tenant_id: Uuid)
    -> impl Future<Output = KeelResult<Vec<Collection>>> + Send;
    fn add_field(&self, input: CreateField) -> impl Future<Output = KeelResult<Field>> + Send;
    fn list_fields(
        &self,
        tenant_id: Uuid,
        collection_id: Uuid,
    ) -> impl Future<Output = KeelResult<Vec<Field>>> + Send;
}

// ---------------------------------------------------------------------------
// Groups (tenant-scoped)
// ---------------------------------------------------------------------------

pub trait GroupRepository: Send + Sync {
    fn create(&self, input: CreateGroup) -> impl Future<Output = KeelResult<Group>> + Send;
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = KeelResult<Group>> + Send;
    fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateGroup,
    ) -> impl Future<Output = KeelResult<Group>> + Send;
    fn delete(&self, tenant_id: Uuid, id: Uuid) -> impl Future<Output = KeelResult<()>> + Send;
    fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = KeelResult<PaginatedResult<Group>>> + Send;

    /// Add a user to a group (creates a `member_of` edge).
    fn add_member(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        group_id: Uuid,
    ) -> impl Future<Output = KeelResult<()>> + Send;

    /// Remove a user from a group.
    fn remove_member(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        group_id: Uuid,
    ) -> impl Future<Output = KeelResult<()>> + Send;

    /// Make `child_id` a member of `parent_id` (creates a `nested_in`
    /// edge). Performs no cycle check.
    fn add_nested_group(
        &self,
        tenant_id: Uuid,
        parent_id: Uuid,
        child_id: Uuid,
    ) -> impl Future<Output = KeelResult<()>> + Send;

    /// Remove a GROUP -> GROUP membership.
    fn remove_nested_group(
        &self,
        tenant_id: Uuid,
        parent_id: Uuid,
        child_id: Uuid,
    ) -> impl Future<Output = KeelResult<()>> + Send;

    /// IDs of the groups a user is a direct member of.
    fn get_user_group_ids(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = KeelResult<Vec<Uuid>>> + Send;

    /// IDs of the groups that directly contain `group_id`.
    fn get_parent_group_ids(
        &self,
        tenant_id: Uuid,
        group_id: Uuid,
    ) -> impl Future<Output = KeelResult<Vec<Uuid>>> + Send;

    /// IDs of the groups directly contained in `group_id`.
    fn get_child_group_ids(
        &self,
        tenant_id: Uuid,
        group_id: Uuid,
    ) -> impl Future<Output = KeelResult<Vec<Uuid>>> + Send;

    /// IDs of the users that are direct members of `group_id`.
    fn get_member_user_ids(
        &self,
        tenant_id: Uuid,
        group_id: Uuid,
    ) -> impl Future<Output = KeelResult<Vec<Uuid>>> + Send;
}

// ---------------------------------------------------------------------------
// Profiles, permission sets and their grants (tenant-scoped)
// ---------------------------------------------------------------------------

pub trait ProfileRepository: Send + Sync {
    fn create(&self, input: CreateProfile) -> impl Future<Output = KeelResult<Profile>> + Send;
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = KeelResult<Profile>> + Send;
    fn get_by_name(
        &self,
        tenant_id: Uuid,
        name: &str,
    ) -> impl Future<Output = KeelResult<Profile>> + Send;
    /// All profiles of the tenant, ordered by name.
    fn list(&self, tenant_id: Uuid) -> impl Future<Output = KeelResult<Vec<Profile>>> + Send;
    /// Delete a profile and every grant row it holds.
    fn delete(&self, tenant_id: Uuid, id: Uuid) -> impl Future<Output = KeelResult<()>> + Send;
}

pub trait PermissionSetRepository: Send + Sync {
    fn create(
        &self,
        input: CreatePermissionSet,
    ) -> impl Future<Output = KeelResult<PermissionSet>> + Send;
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = KeelResult<PermissionSet>> + Send;
    fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = KeelResult<PaginatedResult<PermissionSet>>> + Send;
    /// Delete a permission set, its assignments and every grant row it
    /// holds.
    fn delete(&self, tenant_id: Uuid, id: Uuid) -> impl Future<Output = KeelResult<()>> + Send;

    /// Assign a permission set to a user (creates a `has_permission_set` edge).
    fn assign_to_user(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        permission_set_id: Uuid,
    ) -> impl Future<Output = KeelResult<()>> + Send;

    fn unassign_from_user(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        permission_set_id: Uuid,
    ) -> impl Future<Output = KeelResult<()>> + Send;

    /// Assign a permission set to a group.
    fn assign_to_group(
        &self,
        tenant_id: Uuid,
        group_id: Uuid,
        permission_set_id: Uuid,
    ) -> impl Future<Output = KeelResult<()>> + Send;

    fn unassign_from_group(
        &self,
        tenant_id: Uuid,
        group_id: Uuid,
        permission_set_id: Uuid,
    ) -> impl Future<Output = KeelResult<()>> + Send;

    /// IDs of permission sets assigned directly to a user.
    fn get_user_permission_set_ids(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = KeelResult<Vec<Uuid>>> + Send;

    /// IDs of permission sets assigned to any of the given groups.
    fn get_group_permission_set_ids(
        &self,
        tenant_id: Uuid,
        group_ids: &[Uuid],
    ) -> impl Future<Output = KeelResult<Vec<Uuid>>> + Send;
}

/// Every grant row held by a single profile or permission set.
#[derive(Debug, Clone, Default)]
pub struct HolderGrants {
    pub object: Vec<ObjectPermissionGrant>,
    pub field: Vec<FieldPermissionGrant>,
    pub system: Vec<SystemPermissionGrant>,
}

pub trait GrantRepository: Send + Sync {
    /// Create or replace the object permission row of
    /// `(grant.holder, grant.collection_id)`.
    fn set_object_permission(
        &self,
        tenant_id: Uuid,
        grant: ObjectPermissionGrant,
    ) -> impl Future<Output = KeelResult<()>> + Send;

    /// Create or replace the field permission row of
    /// `(grant.holder, grant.field_id)`.
    fn set_field_permission(
        &self,
        tenant_id: Uuid,
        grant: FieldPermissionGrant,
    ) -> impl Future<Output = KeelResult<()>> + Send;

    /// Create or replace the system permission row of
    /// `(grant.holder, grant.permission)`.
    fn set_system_permission(
        &self,
        tenant_id: Uuid,
        grant: SystemPermissionGrant,
    ) -> impl Future<Output = KeelResult<()>> + Send;

    /// Load all grant rows of one holder.
    fn get_holder_grants(
        &self,
        tenant_id: Uuid,
        holder: GrantHolder,
    ) -> impl Future<Output = KeelResult<HolderGrants>> + Send;
}

// ---------------------------------------------------------------------------
// Record sharing (tenant-scoped)
// ---------------------------------------------------------------------------

pub trait SharingRepository: Send + Sync {
    fn set_org_wide_default(
        &self,
        tenant_id: Uuid,
        collection_id: Uuid,
        internal_access: InternalAccess,
    ) -> impl Future<Output = KeelResult<OrgWideDefault>> + Send;

    /// `None` when the collection has no explicit default.
    fn get_org_wide_default(
        &self,
        tenant_id: Uuid,
        collection_id: Uuid,
    ) -> impl Future<Output = KeelResult<Option<OrgWideDefault>>> + Send;

    fn create_record_share(
        &self,
        input: CreateRecordShare,
    ) -> impl Future<Output = KeelResult<RecordShare>> + Send;

    fn delete_record_share(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = KeelResult<()>> + Send;

    /// All shares of one record.
    fn list_record_shares(
        &self,
        tenant_id: Uuid,
        collection_id: Uuid,
        record_id: &str,
    ) -> impl Future<Output = KeelResult<Vec<RecordShare>>> + Send;

    fn create_sharing_rule(
        &self,
        input: CreateSharingRule,
    ) -> impl Future<Output = KeelResult<SharingRule>> + Send;

    fn set_sharing_rule_active(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        active: bool,
    ) -> impl Future<Output = KeelResult<SharingRule>> + Send;

    fn delete_sharing_rule(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = KeelResult<()>> + Send;

    /// Active rules of one collection, oldest first.
    fn list_active_sharing_rules(
        &self,
        tenant_id: Uuid,
        collection_id: Uuid,
    ) -> impl Future<Output = KeelResult<Vec<SharingRule>>> + Send;
}

// ---------------------------------------------------------------------------
// Identity providers
// ---------------------------------------------------------------------------

pub trait OidcProviderRepository: Send + Sync {
    fn create(
        &self,
        input: CreateOidcProvider,
    ) -> impl Future<Output = KeelResult<OidcProvider>> + Send;
    /// Look up the provider whose tokens carry the given `iss` claim.
    fn get_by_issuer(&self, issuer: &str)
    -> impl Future<Output = KeelResult<OidcProvider>> + Send;
    fn list_active(
        &self,
        tenant_id: Uuid,
    ) -> impl Future<Output = KeelResult<Vec<OidcProvider>>> + Send;
}
