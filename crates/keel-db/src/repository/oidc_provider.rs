//! SurrealDB implementation of [`OidcProviderRepository`].

use chrono::{DateTime, Utc};
use keel_core::error::KeelResult;
use keel_core::models::oidc_provider::{CreateOidcProvider, OidcProvider};
use keel_core::repository::OidcProviderRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::{DbError, parse_uuid, statement_error};

#[derive(Debug, SurrealValue)]
struct OidcProviderRow {
    record_id: String,
    tenant_id: String,
    name: String,
    issuer: String,
    roles_claim: Option<String>,
    roles_mapping: Option<String>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OidcProviderRow {
    fn try_into_provider(self) -> Result<OidcProvider, DbError> {
        Ok(OidcProvider {
            id: parse_uuid(&self.record_id, "oidc_provider")?,
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            name: self.name,
            issuer: self.issuer,
            roles_claim: self.roles_claim,
            roles_mapping: self.roles_mapping,
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the OIDC provider repository.
#[derive(Clone)]
pub struct SurrealOidcProviderRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealOidcProviderRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> OidcProviderRepository for SurrealOidcProviderRepository<C> {
    async fn create(&self, input: CreateOidcProvider) -> KeelResult<OidcProvider> {
        let id_str = Uuid::new_v4().to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('oidc_provider', $id) SET \
                 tenant_id = $tenant_id, name = $name, issuer = $issuer, \
                 roles_claim = $roles_claim, roles_mapping = $roles_mapping, \
                 active = true; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('oidc_provider', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("name", input.name))
            .bind(("issuer", input.issuer))
            .bind(("roles_claim", input.roles_claim))
            .bind(("roles_mapping", input.roles_mapping))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| statement_error("oidc_provider", e))?;

        let rows: Vec<OidcProviderRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "oidc_provider".into(),
            id: id_str,
        })?;

        Ok(row.try_into_provider()?)
    }

    async fn get_by_issuer(&self, issuer: &str) -> KeelResult<OidcProvider> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM oidc_provider \
                 WHERE issuer = $issuer LIMIT 1",
            )
            .bind(("issuer", issuer.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OidcProviderRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "oidc_provider".into(),
            id: format!("issuer={issuer}"),
        })?;

        Ok(row.try_into_provider()?)
    }

    async fn list_active(&self, tenant_id: Uuid) -> KeelResult<Vec<OidcProvider>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM oidc_provider \
                 WHERE tenant_id = $tenant_id AND active = true \
                 ORDER BY name ASC",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OidcProviderRow> = result.take(0).map_err(DbError::from)?;
        let providers = rows
            .into_iter()
            .map(|row| row.try_into_provider())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(providers)
    }
}
