//! SurrealDB implementation of [`PermissionSetRepository`].
//!
//! Assignments are `user -> has_permission_set -> permission_set` and
//! `group -> has_permission_set -> permission_set` edges.

use chrono::{DateTime, Utc};
use keel_core::error::KeelResult;
use keel_core::models::permission_set::{CreatePermissionSet, PermissionSet};
use keel_core::repository::{PaginatedResult, Pagination, PermissionSetRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, IdRow, ensure_in_tenant, parse_id_rows};
use crate::error::{DbError, parse_uuid, statement_error};

#[derive(Debug, SurrealValue)]
struct PermissionSetRow {
    record_id: String,
    tenant_id: String,
    name: String,
    description: String,
    is_system: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PermissionSetRow {
    fn try_into_permission_set(self) -> Result<PermissionSet, DbError> {
        Ok(PermissionSet {
            id: parse_uuid(&self.record_id, "permission_set")?,
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            name: self.name,
            description: self.description,
            is_system: self.is_system,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the PermissionSet repository.
#[derive(Clone)]
pub struct SurrealPermissionSetRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPermissionSetRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn relate(
        &self,
        tenant_id: Uuid,
        assignee_table: &'static str,
        assignee_id: Uuid,
        permission_set_id: Uuid,
    ) -> KeelResult<()> {
        ensure_in_tenant(&self.db, assignee_table, tenant_id, assignee_id).await?;
        ensure_in_tenant(&self.db, "permission_set", tenant_id, permission_set_id).await?;

        let query = format!(
            "DELETE has_permission_set WHERE \
             in = {assignee_table}:`{assignee_id}` AND \
             out = permission_set:`{permission_set_id}`; \
             RELATE {assignee_table}:`{assignee_id}` \
             -> has_permission_set -> permission_set:`{permission_set_id}`;"
        );

        self.db
            .query(query)
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| statement_error("has_permission_set", e))?;

        Ok(())
    }

    async fn unrelate(
        &self,
        assignee_table: &'static str,
        assignee_id: Uuid,
        permission_set_id: Uuid,
    ) -> KeelResult<()> {
        self.db
            .query(
                "DELETE has_permission_set WHERE \
                 in = type::record($table, $assignee_id) AND \
                 out = type::record('permission_set', $permission_set_id)",
            )
            .bind(("table", assignee_table))
            .bind(("assignee_id", assignee_id.to_string()))
            .bind(("permission_set_id", permission_set_id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }
}

impl<C: Connection> PermissionSetRepository for SurrealPermissionSetRepository<C> {
    async fn create(&self, input: CreatePermissionSet) -> KeelResult<PermissionSet> {
        let id_str = Uuid::new_v4().to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('permission_set', $id) SET \
                 tenant_id = $tenant_id, name = $name, \
                 description = $description, is_system = $is_system; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('permission_set', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .bind(("is_system", input.is_system))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| statement_error("permission_set", e))?;

        let rows: Vec<PermissionSetRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "permission_set".into(),
            id: id_str,
        })?;

        Ok(row.try_into_permission_set()?)
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> KeelResult<PermissionSet> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('permission_set', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionSetRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "permission_set".into(),
            id: id_str,
        })?;

        Ok(row.try_into_permission_set()?)
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> KeelResult<PaginatedResult<PermissionSet>> {
        let tenant_id_str = tenant_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM permission_set \
                 WHERE tenant_id = $tenant_id GROUP ALL",
            )
            .bind(("tenant_id", tenant_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM permission_set \
                 WHERE tenant_id = $tenant_id \
                 ORDER BY name ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("tenant_id", tenant_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionSetRow> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_permission_set())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> KeelResult<()> {
        ensure_in_tenant(&self.db, "permission_set", tenant_id, id).await?;
        let id_str = id.to_string();

        let query = format!(
            "DELETE has_permission_set WHERE out = permission_set:`{id_str}`; \
             DELETE object_permission WHERE tenant_id = $tenant_id \
             AND holder_kind = 'PermissionSet' AND holder_id = $id; \
             DELETE field_permission WHERE tenant_id = $tenant_id \
             AND holder_kind = 'PermissionSet' AND holder_id = $id; \
             DELETE system_permission WHERE tenant_id = $tenant_id \
             AND holder_kind = 'PermissionSet' AND holder_id = $id; \
             DELETE type::record('permission_set', $id) WHERE tenant_id = $tenant_id;"
        );

        self.db
            .query(query)
            .bind(("id", id_str))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| statement_error("permission_set", e))?;

        Ok(())
    }

    async fn assign_to_user(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        permission_set_id: Uuid,
    ) -> KeelResult<()> {
        self.relate(tenant_id, "user", user_id, permission_set_id)
            .await
    }

    async fn unassign_from_user(
        &self,
        _tenant_id: Uuid,
        user_id: Uuid,
        permission_set_id: Uuid,
    ) -> KeelResult<()> {
        self.unrelate("user", user_id, permission_set_id).await
    }

    async fn assign_to_group(
        &self,
        tenant_id: Uuid,
        group_id: Uuid,
        permission_set_id: Uuid,
    ) -> KeelResult<()> {
        self.relate(tenant_id, "group", group_id, permission_set_id)
            .await
    }

    async fn unassign_from_group(
        &self,
        _tenant_id: Uuid,
        group_id: Uuid,
        permission_set_id: Uuid,
    ) -> KeelResult<()> {
        self.unrelate("group", group_id, permission_set_id).await
    }

    async fn get_user_permission_set_ids(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> KeelResult<Vec<Uuid>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id FROM permission_set \
                 WHERE tenant_id = $tenant_id \
                 AND id IN (\
                     SELECT VALUE out FROM has_permission_set \
                     WHERE in = type::record('user', $user_id)\
                 )",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<IdRow> = result.take(0).map_err(DbError::from)?;
        Ok(parse_id_rows(rows, "permission_set")?)
    }

    async fn get_group_permission_set_ids(
        &self,
        tenant_id: Uuid,
        group_ids: &[Uuid],
    ) -> KeelResult<Vec<Uuid>> {
        if group_ids.is_empty() {
            return Ok(Vec::new());
        }
        let group_ids: Vec<String> = group_ids.iter().map(Uuid::to_string).collect();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id FROM permission_set \
                 WHERE tenant_id = $tenant_id \
                 AND id IN (\
                     SELECT VALUE out FROM has_permission_set \
                     WHERE in IN (\
                         SELECT VALUE id FROM group \
                         WHERE tenant_id = $tenant_id \
                         AND meta::id(id) IN $group_ids\
                     )\
                 )",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("group_ids", group_ids))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<IdRow> = result.take(0).map_err(DbError::from)?;
        Ok(parse_id_rows(rows, "permission_set")?)
    }
}
