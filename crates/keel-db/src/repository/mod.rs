//! SurrealDB repository implementations.

mod collection;
mod grant;
mod group;
mod oidc_provider;
mod permission_set;
mod profile;
mod sharing;
mod tenant;
mod user;

pub use collection::SurrealCollectionRepository;
pub use grant::SurrealGrantRepository;
pub use group::SurrealGroupRepository;
pub use oidc_provider::SurrealOidcProviderRepository;
pub use permission_set::SurrealPermissionSetRepository;
pub use profile::SurrealProfileRepository;
pub use sharing::SurrealSharingRepository;
pub use tenant::SurrealTenantRepository;
pub use user::SurrealUserRepository;

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::{DbError, parse_uuid};

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
pub(crate) struct CountRow {
    pub(crate) total: u64,
}

/// Row struct for queries projecting a single record ID.
#[derive(Debug, SurrealValue)]
pub(crate) struct IdRow {
    pub(crate) record_id: String,
}

pub(crate) fn parse_id_rows(rows: Vec<IdRow>, column: &str) -> Result<Vec<Uuid>, DbError> {
    rows.iter()
        .map(|row| parse_uuid(&row.record_id, column))
        .collect()
}

/// Fail with `NotFound` unless `table:id` exists in the tenant.
pub(crate) async fn ensure_in_tenant<C: Connection>(
    db: &Surreal<C>,
    table: &'static str,
    tenant_id: Uuid,
    id: Uuid,
) -> Result<(), DbError> {
    let id_str = id.to_string();
    let mut result = db
        .query(
            "SELECT count() AS total FROM type::table($table) \
             WHERE id = type::record($table, $id) \
             AND tenant_id = $tenant_id GROUP ALL",
        )
        .bind(("table", table))
        .bind(("id", id_str.clone()))
        .bind(("tenant_id", tenant_id.to_string()))
        .await?;

    let rows: Vec<CountRow> = result.take(0)?;
    if rows.first().map(|r| r.total).unwrap_or(0) == 0 {
        return Err(DbError::NotFound {
            entity: table.into(),
            id: id_str,
        });
    }
    Ok(())
}
