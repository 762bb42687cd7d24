//! The caller's own effective permissions, shaped for the
//! `my-permissions` payloads.
//!
//! Unlike [`PermissionResolutionService`], nothing here returns an
//! error: a caller that cannot be resolved, an unknown collection or a
//! failing datastore all degrade to the "no permissions" payload.

use std::collections::BTreeMap;

use keel_core::error::{KeelError, KeelResult};
use keel_core::models::collection::Collection;
use keel_core::models::permission::{FieldVisibility, ObjectPermissions};
use keel_core::repository::{
    CollectionRepository, GrantRepository, GroupRepository, PermissionSetRepository,
    UserRepository,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::merge::{self, SystemPermissions};
use crate::roles::RoleExtractor;
use crate::service::{PermissionResolutionService, Principal};

/// An authenticated caller as seen after token validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedCaller {
    /// Tenant the request is scoped to, when one could be determined.
    pub tenant_id: Option<Uuid>,
    pub email: String,
    pub authorities: Vec<String>,
}

impl AuthenticatedCaller {
    pub fn new(tenant_id: Option<Uuid>, email: impl Into<String>, authorities: Vec<String>) -> Self {
        Self {
            tenant_id,
            email: email.into(),
            authorities,
        }
    }

    /// Build a caller from validated claims. The e-mail comes from
    /// `email`, falling back to `preferred_username`. `None` when
    /// neither is present.
    pub fn from_claims(tenant_id: Option<Uuid>, claims: &Value, extractor: &RoleExtractor) -> Option<Self> {
        let email = ["email", "preferred_username"]
            .iter()
            .find_map(|claim| claims.get(*claim).and_then(Value::as_str))
            .map(str::trim)
            .filter(|e| !e.is_empty())?;

        Some(Self::new(tenant_id, email, extractor.authorities(claims)))
    }

    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.iter().any(|a| a == authority)
    }
}

/// Payload of the `effective` view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectivePermissions {
    pub system_permissions: SystemPermissions,
    pub is_platform_admin: bool,
}

/// Field ID (as a string) -> visibility name.
pub type FieldPermissionView = BTreeMap<String, FieldVisibility>;

/// Answers the four `my-permissions` questions for a caller.
pub struct MyPermissionsService<U, G, P, R, C>
where
    U: UserRepository,
    G: GroupRepository,
    P: PermissionSetRepository,
    R: GrantRepository,
    C: CollectionRepository,
{
    resolver: PermissionResolutionService<U, G, P, R>,
    collections: C,
}

impl<U, G, P, R, C> MyPermissionsService<U, G, P, R, C>
where
    U: UserRepository,
    G: GroupRepository,
    P: PermissionSetRepository,
    R: GrantRepository,
    C: CollectionRepository,
{
    pub fn new(resolver: PermissionResolutionService<U, G, P, R>, collections: C) -> Self {
        Self {
            resolver,
            collections,
        }
    }

    pub fn resolver(&self) -> &PermissionResolutionService<U, G, P, R> {
        &self.resolver
    }

    pub fn is_platform_admin(&self, caller: &AuthenticatedCaller) -> bool {
        caller.has_authority(&self.resolver.config().admin_authority())
    }

    /// System permission map. `{}` when the caller cannot be resolved.
    pub async fn system(&self, caller: &AuthenticatedCaller) -> SystemPermissions {
        if self.is_platform_admin(caller) {
            return merge::uniform_system_permissions(true);
        }
        let Some(principal) = self.principal(caller).await else {
            return SystemPermissions::new();
        };

        match self.resolver.resolve_for_user(&principal).await {
            Ok(resolved) => resolved.system_permissions,
            Err(e) => {
                warn!(error = %e, user_id = %principal.user_id, "System permission lookup failed");
                SystemPermissions::new()
            }
        }
    }

    /// Object flags on a collection addressed by id or API name.
    pub async fn objects(&self, caller: &AuthenticatedCaller, collection: &str) -> ObjectPermissions {
        if self.is_platform_admin(caller) {
            return ObjectPermissions::ALL;
        }
        let Some(principal) = self.principal(caller).await else {
            return ObjectPermissions::NONE;
        };
        let Some(collection) = self.find_collection(principal.tenant_id, collection).await else {
            return ObjectPermissions::NONE;
        };

        self.resolver
            .get_object_permissions(&principal, collection.id)
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, collection = %collection.name, "Object permission lookup failed");
                ObjectPermissions::NONE
            })
    }

    /// Field visibilities on a collection. Only fields with an explicit
    /// grant appear; absent fields are visible.
    pub async fn fields(&self, caller: &AuthenticatedCaller, collection: &str) -> FieldPermissionView {
        if self.is_platform_admin(caller) {
            return FieldPermissionView::new();
        }
        let Some(principal) = self.principal(caller).await else {
            return FieldPermissionView::new();
        };
        let Some(collection) = self.find_collection(principal.tenant_id, collection).await else {
            return FieldPermissionView::new();
        };

        match self
            .resolver
            .get_field_permissions(&principal, collection.id)
            .await
        {
            Ok(fields) => fields
                .into_iter()
                .map(|(field_id, visibility)| (field_id.to_string(), visibility))
                .collect(),
            Err(e) => {
                warn!(error = %e, collection = %collection.name, "Field permission lookup failed");
                FieldPermissionView::new()
            }
        }
    }

    pub async fn effective(&self, caller: &AuthenticatedCaller) -> EffectivePermissions {
        let is_platform_admin = self.is_platform_admin(caller);
        EffectivePermissions {
            system_permissions: self.system(caller).await,
            is_platform_admin,
        }
    }

    /// Map the caller to a user of its tenant by e-mail.
    async fn principal(&self, caller: &AuthenticatedCaller) -> Option<Principal> {
        let Some(tenant_id) = caller.tenant_id else {
            debug!(email = %caller.email, "Caller has no tenant context");
            return None;
        };

        let users = self.resolver.collector().users();
        match users.get_by_email(tenant_id, &caller.email).await {
            Ok(user) => Some(Principal::user(tenant_id, user.id)),
            Err(e) => {
                log_fallback(&e, "user", &caller.email);
                None
            }
        }
    }

    async fn find_collection(&self, tenant_id: Uuid, key: &str) -> Option<Collection> {
        let lookup: KeelResult<Collection> = match key.parse::<Uuid>() {
            Ok(id) => self.collections.get_by_id(tenant_id, id).await,
            Err(_) => self.collections.get_by_name(tenant_id, key).await,
        };

        lookup.map_err(|e| log_fallback(&e, "collection", key)).ok()
    }
}

fn log_fallback(err: &KeelError, entity: &str, key: &str) {
    if err.is_not_found() {
        debug!(entity, key, "Not found, answering with no permissions");
    } else {
        warn!(error = %err, entity, key, "Permission lookup failed");
    }
}
