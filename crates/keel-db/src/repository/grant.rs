//! SurrealDB implementation of [`GrantRepository`].
//!
//! Grant rows are keyed by `(holder_kind, holder_id, scope)`; writes
//! replace the existing row for that key in a single query.

use keel_core::error::KeelResult;
use keel_core::models::permission::{
    FieldPermissionGrant, FieldVisibility, GrantHolder, ObjectPermissionGrant, ObjectPermissions,
    SystemPermission, SystemPermissionGrant,
};
use keel_core::repository::{GrantRepository, HolderGrants};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::{DbError, parse_uuid, statement_error};

#[derive(Debug, SurrealValue)]
struct ObjectPermissionRow {
    collection_id: String,
    can_create: bool,
    can_read: bool,
    can_edit: bool,
    can_delete: bool,
    can_view_all: bool,
    can_modify_all: bool,
}

#[derive(Debug, SurrealValue)]
struct FieldPermissionRow {
    collection_id: String,
    field_id: String,
    visibility: String,
}

#[derive(Debug, SurrealValue)]
struct SystemPermissionRow {
    permission_name: String,
    granted: bool,
}

impl ObjectPermissionRow {
    fn try_into_grant(self, holder: GrantHolder) -> Result<ObjectPermissionGrant, DbError> {
        Ok(ObjectPermissionGrant {
            holder,
            collection_id: parse_uuid(&self.collection_id, "collection")?,
            permissions: ObjectPermissions {
                can_create: self.can_create,
                can_read: self.can_read,
                can_edit: self.can_edit,
                can_delete: self.can_delete,
                can_view_all: self.can_view_all,
                can_modify_all: self.can_modify_all,
            },
        })
    }
}

impl FieldPermissionRow {
    fn try_into_grant(self, holder: GrantHolder) -> Result<FieldPermissionGrant, DbError> {
        let visibility: FieldVisibility = self
            .visibility
            .parse()
            .map_err(|e| DbError::CorruptRow(format!("{e}")))?;
        Ok(FieldPermissionGrant {
            holder,
            collection_id: parse_uuid(&self.collection_id, "collection")?,
            field_id: parse_uuid(&self.field_id, "field")?,
            visibility,
        })
    }
}

impl SystemPermissionRow {
    fn try_into_grant(self, holder: GrantHolder) -> Result<SystemPermissionGrant, DbError> {
        let permission: SystemPermission = self
            .permission_name
            .parse()
            .map_err(|e| DbError::CorruptRow(format!("{e}")))?;
        Ok(SystemPermissionGrant {
            holder,
            permission,
            granted: self.granted,
        })
    }
}

/// SurrealDB implementation of the Grant repository.
#[derive(Clone)]
pub struct SurrealGrantRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealGrantRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> GrantRepository for SurrealGrantRepository<C> {
    async fn set_object_permission(
        &self,
        tenant_id: Uuid,
        grant: ObjectPermissionGrant,
    ) -> KeelResult<()> {
        let p = grant.permissions;

        self.db
            .query(
                "DELETE object_permission WHERE tenant_id = $tenant_id \
                 AND holder_kind = $holder_kind AND holder_id = $holder_id \
                 AND collection_id = $collection_id; \
                 CREATE object_permission SET \
                 tenant_id = $tenant_id, \
                 holder_kind = $holder_kind, holder_id = $holder_id, \
                 collection_id = $collection_id, \
                 can_create = $can_create, can_read = $can_read, \
                 can_edit = $can_edit, can_delete = $can_delete, \
                 can_view_all = $can_view_all, can_modify_all = $can_modify_all;",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("holder_kind", grant.holder.kind()))
            .bind(("holder_id", grant.holder.id().to_string()))
            .bind(("collection_id", grant.collection_id.to_string()))
            .bind(("can_create", p.can_create))
            .bind(("can_read", p.can_read))
            .bind(("can_edit", p.can_edit))
            .bind(("can_delete", p.can_delete))
            .bind(("can_view_all", p.can_view_all))
            .bind(("can_modify_all", p.can_modify_all))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| statement_error("object_permission", e))?;

        Ok(())
    }

    async fn set_field_permission(
        &self,
        tenant_id: Uuid,
        grant: FieldPermissionGrant,
    ) -> KeelResult<()> {
        self.db
            .query(
                "DELETE field_permission WHERE tenant_id = $tenant_id \
                 AND holder_kind = $holder_kind AND holder_id = $holder_id \
                 AND field_id = $field_id; \
                 CREATE field_permission SET \
                 tenant_id = $tenant_id, \
                 holder_kind = $holder_kind, holder_id = $holder_id, \
                 collection_id = $collection_id, field_id = $field_id, \
                 visibility = $visibility;",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("holder_kind", grant.holder.kind()))
            .bind(("holder_id", grant.holder.id().to_string()))
            .bind(("collection_id", grant.collection_id.to_string()))
            .bind(("field_id", grant.field_id.to_string()))
            .bind(("visibility", grant.visibility.as_str()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| statement_error("field_permission", e))?;

        Ok(())
    }

    async fn set_system_permission(
        &self,
        tenant_id: Uuid,
        grant: SystemPermissionGrant,
    ) -> KeelResult<()> {
        self.db
            .query(
                "DELETE system_permission WHERE tenant_id = $tenant_id \
                 AND holder_kind = $holder_kind AND holder_id = $holder_id \
                 AND permission_name = $permission_name; \
                 CREATE system_permission SET \
                 tenant_id = $tenant_id, \
                 holder_kind = $holder_kind, holder_id = $holder_id, \
                 permission_name = $permission_name, granted = $granted;",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("holder_kind", grant.holder.kind()))
            .bind(("holder_id", grant.holder.id().to_string()))
            .bind(("permission_name", grant.permission.as_str()))
            .bind(("granted", grant.granted))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| statement_error("system_permission", e))?;

        Ok(())
    }

    async fn get_holder_grants(
        &self,
        tenant_id: Uuid,
        holder: GrantHolder,
    ) -> KeelResult<HolderGrants> {
        let mut result = self
            .db
            .query(
                "SELECT * FROM object_permission WHERE tenant_id = $tenant_id \
                 AND holder_kind = $holder_kind AND holder_id = $holder_id; \
                 SELECT * FROM field_permission WHERE tenant_id = $tenant_id \
                 AND holder_kind = $holder_kind AND holder_id = $holder_id; \
                 SELECT * FROM system_permission WHERE tenant_id = $tenant_id \
                 AND holder_kind = $holder_kind AND holder_id = $holder_id;",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("holder_kind", holder.kind()))
            .bind(("holder_id", holder.id().to_string()))
            .await
            .map_err(DbError::from)?;

        let object_rows: Vec<ObjectPermissionRow> = result.take(0).map_err(DbError::from)?;
        let field_rows: Vec<FieldPermissionRow> = result.take(1).map_err(DbError::from)?;
        let system_rows: Vec<SystemPermissionRow> = result.take(2).map_err(DbError::from)?;

        Ok(HolderGrants {
            object: object_rows
                .into_iter()
                .map(|row| row.try_into_grant(holder))
                .collect::<Result<_, DbError>>()?,
            field: field_rows
                .into_iter()
                .map(|row| row.try_into_grant(holder))
                .collect::<Result<_, DbError>>()?,
            system: system_rows
                .into_iter()
                .map(|row| row.try_into_grant(holder))
                .collect::<Result<_, DbError>>()?,
        })
    }
}
