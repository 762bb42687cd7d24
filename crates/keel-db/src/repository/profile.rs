//! SurrealDB implementation of [`ProfileRepository`].

use chrono::{DateTime, Utc};
use keel_core::error::KeelResult;
use keel_core::models::profile::{CreateProfile, Profile};
use keel_core::repository::ProfileRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::ensure_in_tenant;
use crate::error::{DbError, parse_uuid, statement_error};

#[derive(Debug, SurrealValue)]
struct ProfileRow {
    record_id: String,
    tenant_id: String,
    name: String,
    description: String,
    is_system: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProfileRow {
    fn try_into_profile(self) -> Result<Profile, DbError> {
        Ok(Profile {
            id: parse_uuid(&self.record_id, "profile")?,
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            name: self.name,
            description: self.description,
            is_system: self.is_system,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Profile repository.
#[derive(Clone)]
pub struct SurrealProfileRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealProfileRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ProfileRepository for SurrealProfileRepository<C> {
    async fn create(&self, input: CreateProfile) -> KeelResult<Profile> {
        let id_str = Uuid::new_v4().to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('profile', $id) SET \
                 tenant_id = $tenant_id, name = $name, \
                 description = $description, is_system = $is_system; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('profile', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .bind(("is_system", input.is_system))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| statement_error("profile", e))?;

        let rows: Vec<ProfileRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "profile".into(),
            id: id_str,
        })?;

        Ok(row.try_into_profile()?)
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> KeelResult<Profile> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('profile', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProfileRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "profile".into(),
            id: id_str,
        })?;

        Ok(row.try_into_profile()?)
    }

    async fn get_by_name(&self, tenant_id: Uuid, name: &str) -> KeelResult<Profile> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM profile \
                 WHERE tenant_id = $tenant_id AND name = $name LIMIT 1",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("name", name.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProfileRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "profile".into(),
            id: format!("name={name}"),
        })?;

        Ok(row.try_into_profile()?)
    }

    async fn list(&self, tenant_id: Uuid) -> KeelResult<Vec<Profile>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM profile \
                 WHERE tenant_id = $tenant_id ORDER BY name ASC",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProfileRow> = result.take(0).map_err(DbError::from)?;
        let profiles = rows
            .into_iter()
            .map(|row| row.try_into_profile())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(profiles)
    }

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> KeelResult<()> {
        ensure_in_tenant(&self.db, "profile", tenant_id, id).await?;

        self.db
            .query(
                "DELETE object_permission WHERE tenant_id = $tenant_id \
                 AND holder_kind = 'Profile' AND holder_id = $id; \
                 DELETE field_permission WHERE tenant_id = $tenant_id \
                 AND holder_kind = 'Profile' AND holder_id = $id; \
                 DELETE system_permission WHERE tenant_id = $tenant_id \
                 AND holder_kind = 'Profile' AND holder_id = $id; \
                 DELETE type::record('profile', $id) WHERE tenant_id = $tenant_id;",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| statement_error("profile", e))?;

        Ok(())
    }
}
