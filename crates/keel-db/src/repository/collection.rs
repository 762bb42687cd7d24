//! SurrealDB implementation of [`CollectionRepository`].

use chrono::{DateTime, Utc};
use keel_core::error::KeelResult;
use keel_core::models::collection::{Collection, CreateCollection, CreateField, Field};
use keel_core::repository::CollectionRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::ensure_in_tenant;
use crate::error::{DbError, parse_uuid, statement_error};

#[derive(Debug, SurrealValue)]
struct CollectionRow {
    record_id: String,
    tenant_id: String,
    name: String,
    display_name: String,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CollectionRow {
    fn try_into_collection(self) -> Result<Collection, DbError> {
        Ok(Collection {
            id: parse_uuid(&self.record_id, "collection")?,
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            name: self.name,
            display_name: self.display_name,
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct FieldRow {
    record_id: String,
    tenant_id: String,
    collection_id: String,
    name: String,
    created_at: DateTime<Utc>,
}

impl FieldRow {
    fn try_into_field(self) -> Result<Field, DbError> {
        Ok(Field {
            id: parse_uuid(&self.record_id, "field")?,
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            collection_id: parse_uuid(&self.collection_id, "collection")?,
            name: self.name,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the Collection repository.
#[derive(Clone)]
pub struct SurrealCollectionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealCollectionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> CollectionRepository for SurrealCollectionRepository<C> {
    async fn create(&self, input: CreateCollection) -> KeelResult<Collection> {
        let id_str = Uuid::new_v4().to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('collection', $id) SET \
                 tenant_id = $tenant_id, name = $name, \
                 display_name = $display_name, active = true; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('collection', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("name", input.name))
            .bind(("display_name", input.display_name))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| statement_error("collection", e))?;

        // Statement 0 is the CREATE, statement 1 reads it back with its ID.
        let rows: Vec<CollectionRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "collection".into(),
            id: id_str,
        })?;

        Ok(row.try_into_collection()?)
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> KeelResult<Collection> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('collection', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CollectionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "collection".into(),
            id: id_str,
        })?;

        Ok(row.try_into_collection()?)
    }

    async fn get_by_name(&self, tenant_id: Uuid, name: &str) -> KeelResult<Collection> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM collection \
                 WHERE tenant_id = $tenant_id AND name = $name LIMIT 1",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("name", name.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CollectionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "collection".into(),
            id: format!("name={name}"),
        })?;

        Ok(row.try_into_collection()?)
    }

    async fn list_active(&self, tenant_id: Uuid) -> KeelResult<Vec<Collection>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM collection \
                 WHERE tenant_id = $tenant_id AND active = true \
                 ORDER BY name ASC",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CollectionRow> = result.take(0).map_err(DbError::from)?;
        let collections = rows
            .into_iter()
            .map(|row| row.try_into_collection())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(collections)
    }

    async fn add_field(&self, input: CreateField) -> KeelResult<Field> {
        ensure_in_tenant(&self.db, "collection", input.tenant_id, input.collection_id).await?;
        let id_str = Uuid::new_v4().to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('collection_field', $id) SET \
                 tenant_id = $tenant_id, collection_id = $collection_id, \
                 name = $name; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('collection_field', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("collection_id", input.collection_id.to_string()))
            .bind(("name", input.name))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| statement_error("field", e))?;

        let rows: Vec<FieldRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "field".into(),
            id: id_str,
        })?;

        Ok(row.try_into_field()?)
    }

    async fn list_fields(&self, tenant_id: Uuid, collection_id: Uuid) -> KeelResult<Vec<Field>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM collection_field \
                 WHERE tenant_id = $tenant_id AND collection_id = $collection_id \
                 ORDER BY name ASC",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("collection_id", collection_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<FieldRow> = result.take(0).map_err(DbError::from)?;
        let fields = rows
            .into_iter()
            .map(|row| row.try_into_field())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(fields)
    }
}
