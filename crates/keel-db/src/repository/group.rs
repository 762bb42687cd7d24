//! SurrealDB implementation of [`GroupRepository`].
//!
//! User membership is stored as `user -> member_of -> group` edges and
//! group nesting as `child -> nested_in -> parent` edges. Both edge
//! kinds are idempotent: an existing edge is replaced, never duplicated.

use chrono::{DateTime, Utc};
use keel_core::error::KeelResult;
use keel_core::models::group::{CreateGroup, Group, UpdateGroup};
use keel_core::repository::{GroupRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, IdRow, ensure_in_tenant, parse_id_rows};
use crate::error::{DbError, parse_uuid, statement_error};

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct GroupRow {
    tenant_id: String,
    name: String,
    description: String,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl GroupRow {
    fn into_group(self, id: Uuid) -> Result<Group, DbError> {
        Ok(Group {
            id,
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            name: self.name,
            description: self.description,
            metadata: self.metadata,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct GroupRowWithId {
    record_id: String,
    tenant_id: String,
    name: String,
    description: String,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl GroupRowWithId {
    fn try_into_group(self) -> Result<Group, DbError> {
        Ok(Group {
            id: parse_uuid(&self.record_id, "group")?,
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            name: self.name,
            description: self.description,
            metadata: self.metadata,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Group repository.
#[derive(Clone)]
pub struct SurrealGroupRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealGroupRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Group IDs of the tenant matching an edge sub-select.
    async fn group_ids_where(
        &self,
        tenant_id: Uuid,
        edge_select: &str,
        bind: (&'static str, String),
    ) -> KeelResult<Vec<Uuid>> {
        let query = format!(
            "SELECT meta::id(id) AS record_id FROM group \
             WHERE tenant_id = $tenant_id AND id IN ({edge_select})"
        );

        let mut result = self
            .db
            .query(query)
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(bind)
            .await
            .map_err(DbError::from)?;

        let rows: Vec<IdRow> = result.take(0).map_err(DbError::from)?;
        Ok(parse_id_rows(rows, "group")?)
    }
}

impl<C: Connection> GroupRepository for SurrealGroupRepository<C> {
    async fn create(&self, input: CreateGroup) -> KeelResult<Group> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let metadata = input
            .metadata
            .unwrap_or(serde_json::Value::Object(Default::default()));

        let result = self
            .db
            .query(
                "CREATE type::record('group', $id) SET \
                 tenant_id = $tenant_id, \
                 name = $name, description = $description, \
                 metadata = $metadata",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .bind(("metadata", metadata))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| statement_error("group", e))?;

        let rows: Vec<GroupRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "group".into(),
            id: id_str,
        })?;

        Ok(row.into_group(id)?)
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> KeelResult<Group> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('group', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GroupRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "group".into(),
            id: id_str,
        })?;

        Ok(row.into_group(id)?)
    }

    async fn update(&self, tenant_id: Uuid, id: Uuid, input: UpdateGroup) -> KeelResult<Group> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        if input.metadata.is_some() {
            sets.push("metadata = $metadata");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('group', $id) SET {} \
             WHERE tenant_id = $tenant_id",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }
        if let Some(metadata) = input.metadata {
            builder = builder.bind(("metadata", metadata));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| statement_error("group", e))?;

        let rows: Vec<GroupRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "group".into(),
            id: id_str,
        })?;

        Ok(row.into_group(id)?)
    }

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> KeelResult<()> {
        ensure_in_tenant(&self.db, "group", tenant_id, id).await?;
        let id_str = id.to_string();

        // Drop every edge touching the group, then the group record.
        let query = format!(
            "DELETE member_of WHERE out = group:`{id_str}`; \
             DELETE nested_in WHERE in = group:`{id_str}` OR out = group:`{id_str}`; \
             DELETE has_permission_set WHERE in = group:`{id_str}`; \
             DELETE type::record('group', $id) WHERE tenant_id = $tenant_id;"
        );

        self.db
            .query(query)
            .bind(("id", id_str))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| statement_error("group", e))?;

        Ok(())
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> KeelResult<PaginatedResult<Group>> {
        let tenant_id_str = tenant_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM group \
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
                "SELECT meta::id(id) AS record_id, * FROM group \
                 WHERE tenant_id = $tenant_id \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("tenant_id", tenant_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GroupRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_group())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn add_member(&self, tenant_id: Uuid, user_id: Uuid, group_id: Uuid) -> KeelResult<()> {
        ensure_in_tenant(&self.db, "user", tenant_id, user_id).await?;
        ensure_in_tenant(&self.db, "group", tenant_id, group_id).await?;

        let user_id_str = user_id.to_string();
        let group_id_str = group_id.to_string();

        // RELATE requires literal record-id syntax; UUIDs are safe to embed.
        let query = format!(
            "DELETE member_of WHERE in = user:`{user_id_str}` \
             AND out = group:`{group_id_str}`; \
             RELATE user:`{user_id_str}` -> member_of -> group:`{group_id_str}`;"
        );

        self.db
            .query(query)
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| statement_error("member_of", e))?;

        Ok(())
    }

    async fn remove_member(&self, _tenant_id: Uuid, user_id: Uuid, group_id: Uuid) -> KeelResult<()> {
        self.db
            .query(
                "DELETE member_of WHERE \
                 in = type::record('user', $user_id) AND \
                 out = type::record('group', $group_id)",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("group_id", group_id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn add_nested_group(
        &self,
        tenant_id: Uuid,
        parent_id: Uuid,
        child_id: Uuid,
    ) -> KeelResult<()> {
        ensure_in_tenant(&self.db, "group", tenant_id, parent_id).await?;
        ensure_in_tenant(&self.db, "group", tenant_id, child_id).await?;

        let parent_str = parent_id.to_string();
        let child_str = child_id.to_string();

        let query = format!(
            "DELETE nested_in WHERE in = group:`{child_str}` \
             AND out = group:`{parent_str}`; \
             RELATE group:`{child_str}` -> nested_in -> group:`{parent_str}`;"
        );

        self.db
            .query(query)
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| statement_error("nested_in", e))?;

        Ok(())
    }

    async fn remove_nested_group(
        &self,
        _tenant_id: Uuid,
        parent_id: Uuid,
        child_id: Uuid,
    ) -> KeelResult<()> {
        self.db
            .query(
                "DELETE nested_in WHERE \
                 in = type::record('group', $child_id) AND \
                 out = type::record('group', $parent_id)",
            )
            .bind(("child_id", child_id.to_string()))
            .bind(("parent_id", parent_id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn get_user_group_ids(&self, tenant_id: Uuid, user_id: Uuid) -> KeelResult<Vec<Uuid>> {
        self.group_ids_where(
            tenant_id,
            "SELECT VALUE out FROM member_of WHERE in = type::record('user', $user_id)",
            ("user_id", user_id.to_string()),
        )
        .await
    }

    async fn get_parent_group_ids(
        &self,
        tenant_id: Uuid,
        group_id: Uuid,
    ) -> KeelResult<Vec<Uuid>> {
        self.group_ids_where(
            tenant_id,
            "SELECT VALUE out FROM nested_in WHERE in = type::record('group', $group_id)",
            ("group_id", group_id.to_string()),
        )
        .await
    }

    async fn get_child_group_ids(&self, tenant_id: Uuid, group_id: Uuid) -> KeelResult<Vec<Uuid>> {
        self.group_ids_where(
            tenant_id,
            "SELECT VALUE in FROM nested_in WHERE out = type::record('group', $group_id)",
            ("group_id", group_id.to_string()),
        )
        .await
    }

    async fn get_member_user_ids(
        &self,
        tenant_id: Uuid,
        group_id: Uuid,
    ) -> KeelResult<Vec<Uuid>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id FROM user \
                 WHERE tenant_id = $tenant_id \
                 AND id IN (\
                     SELECT VALUE in FROM member_of \
                     WHERE out = type::record('group', $group_id)\
                 )",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("group_id", group_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<IdRow> = result.take(0).map_err(DbError::from)?;
        Ok(parse_id_rows(rows, "user")?)
    }
}
