//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as strings with
//! ASSERT constraints for validation.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial_schema",
        sql: SCHEMA_V1,
    },
    Migration {
        version: 2,
        name: "record_sharing",
        sql: SCHEMA_V2,
    },
    Migration {
        version: 3,
        name: "sharing_rules",
        sql: SCHEMA_V3,
    },
];

// -----------------------------------------------------------------------
// Schema v1 — tenancy, identity and permission grants
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Tenants (global scope)
-- =======================================================================
DEFINE TABLE tenant SCHEMAFULL;
DEFINE FIELD name ON TABLE tenant TYPE string;
DEFINE FIELD slug ON TABLE tenant TYPE string;
DEFINE FIELD metadata ON TABLE tenant TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD created_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_tenant_slug ON TABLE tenant COLUMNS slug UNIQUE;

-- =======================================================================
-- Profiles (tenant scope)
-- =======================================================================
DEFINE TABLE profile SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE profile TYPE string;
DEFINE FIELD name ON TABLE profile TYPE string;
DEFINE FIELD description ON TABLE profile TYPE string;
DEFINE FIELD is_system ON TABLE profile TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE profile TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE profile TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_profile_tenant_name ON TABLE profile \
    COLUMNS tenant_id, name UNIQUE;

-- =======================================================================
-- Users (tenant scope)
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE user TYPE string;
DEFINE FIELD username ON TABLE user TYPE string;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD status ON TABLE user TYPE string \
    ASSERT $value IN ['Active', 'Inactive', 'Locked', \
    'PendingVerification'];
DEFINE FIELD profile_id ON TABLE user TYPE string;
DEFINE FIELD manager_id ON TABLE user TYPE option<string>;
DEFINE FIELD metadata ON TABLE user TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_tenant_username ON TABLE user \
    COLUMNS tenant_id, username UNIQUE;
DEFINE INDEX idx_user_tenant_email ON TABLE user \
    COLUMNS tenant_id, email UNIQUE;
DEFINE INDEX idx_user_manager ON TABLE user \
    COLUMNS tenant_id, manager_id;

-- =======================================================================
-- Groups (tenant scope)
-- =======================================================================
DEFINE TABLE group SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE group TYPE string;
DEFINE FIELD name ON TABLE group TYPE string;
DEFINE FIELD description ON TABLE group TYPE string;
DEFINE FIELD metadata ON TABLE group TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD created_at ON TABLE group TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE group TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_group_tenant_name ON TABLE group \
    COLUMNS tenant_id, name UNIQUE;

-- =======================================================================
-- Collections and their fields (tenant scope)
-- =======================================================================
DEFINE TABLE collection SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE collection TYPE string;
DEFINE FIELD name ON TABLE collection TYPE string;
DEFINE FIELD display_name ON TABLE collection TYPE string;
DEFINE FIELD active ON TABLE collection TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE collection TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE collection TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_collection_tenant_name ON TABLE collection \
    COLUMNS tenant_id, name UNIQUE;

DEFINE TABLE collection_field SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE collection_field TYPE string;
DEFINE FIELD collection_id ON TABLE collection_field TYPE string;
DEFINE FIELD name ON TABLE collection_field TYPE string;
DEFINE FIELD created_at ON TABLE collection_field TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_collection_field_name ON TABLE collection_field \
    COLUMNS tenant_id, collection_id, name UNIQUE;

-- =======================================================================
-- Permission sets (tenant scope)
-- =======================================================================
DEFINE TABLE permission_set SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE permission_set TYPE string;
DEFINE FIELD name ON TABLE permission_set TYPE string;
DEFINE FIELD description ON TABLE permission_set TYPE string;
DEFINE FIELD is_system ON TABLE permission_set TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE permission_set TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE permission_set TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_permission_set_tenant_name ON TABLE permission_set \
    COLUMNS tenant_id, name UNIQUE;

-- =======================================================================
-- Grant rows held by a profile or a permission set (tenant scope)
-- =======================================================================
DEFINE TABLE object_permission SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE object_permission TYPE string;
DEFINE FIELD holder_kind ON TABLE object_permission TYPE string \
    ASSERT $value IN ['Profile', 'PermissionSet'];
DEFINE FIELD holder_id ON TABLE object_permission TYPE string;
DEFINE FIELD collection_id ON TABLE object_permission TYPE string;
DEFINE FIELD can_create ON TABLE object_permission TYPE bool DEFAULT false;
DEFINE FIELD can_read ON TABLE object_permission TYPE bool DEFAULT false;
DEFINE FIELD can_edit ON TABLE object_permission TYPE bool DEFAULT false;
DEFINE FIELD can_delete ON TABLE object_permission TYPE bool DEFAULT false;
DEFINE FIELD can_view_all ON TABLE object_permission TYPE bool \
    DEFAULT false;
DEFINE FIELD can_modify_all ON TABLE object_permission TYPE bool \
    DEFAULT false;
DEFINE INDEX idx_object_permission_scope ON TABLE object_permission \
    COLUMNS tenant_id, holder_kind, holder_id, collection_id UNIQUE;

DEFINE TABLE field_permission SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE field_permission TYPE string;
DEFINE FIELD holder_kind ON TABLE field_permission TYPE string \
    ASSERT $value IN ['Profile', 'PermissionSet'];
DEFINE FIELD holder_id ON TABLE field_permission TYPE string;
DEFINE FIELD collection_id ON TABLE field_permission TYPE string;
DEFINE FIELD field_id ON TABLE field_permission TYPE string;
DEFINE FIELD visibility ON TABLE field_permission TYPE string \
    ASSERT $value IN ['VISIBLE', 'READ_ONLY', 'HIDDEN'];
DEFINE INDEX idx_field_permission_scope ON TABLE field_permission \
    COLUMNS tenant_id, holder_kind, holder_id, field_id UNIQUE;

DEFINE TABLE system_permission SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE system_permission TYPE string;
DEFINE FIELD holder_kind ON TABLE system_permission TYPE string \
    ASSERT $value IN ['Profile', 'PermissionSet'];
DEFINE FIELD holder_id ON TABLE system_permission TYPE string;
DEFINE FIELD permission_name ON TABLE system_permission TYPE string;
DEFINE FIELD granted ON TABLE system_permission TYPE bool DEFAULT false;
DEFINE INDEX idx_system_permission_scope ON TABLE system_permission \
    COLUMNS tenant_id, holder_kind, holder_id, permission_name UNIQUE;

-- =======================================================================
-- OIDC providers (tenant scope, issuer globally unique)
-- =======================================================================
DEFINE TABLE oidc_provider SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE oidc_provider TYPE string;
DEFINE FIELD name ON TABLE oidc_provider TYPE string;
DEFINE FIELD issuer ON TABLE oidc_provider TYPE string;
DEFINE FIELD roles_claim ON TABLE oidc_provider TYPE option<string>;
DEFINE FIELD roles_mapping ON TABLE oidc_provider TYPE option<string>;
DEFINE FIELD active ON TABLE oidc_provider TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE oidc_provider TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE oidc_provider TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_oidc_provider_issuer ON TABLE oidc_provider \
    COLUMNS issuer UNIQUE;

-- =======================================================================
-- Graph Edge Tables (relations)
-- =======================================================================

-- User -> Group membership
DEFINE TABLE member_of TYPE RELATION SCHEMAFULL;

-- Group -> Group membership (child -> parent)
DEFINE TABLE nested_in TYPE RELATION SCHEMAFULL;

-- User/Group -> PermissionSet assignment
DEFINE TABLE has_permission_set TYPE RELATION SCHEMAFULL;
";

// -----------------------------------------------------------------------
// Schema v2 — org-wide defaults and record shares
// -----------------------------------------------------------------------

const SCHEMA_V2: &str = "\
DEFINE TABLE org_wide_default SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE org_wide_default TYPE string;
DEFINE FIELD collection_id ON TABLE org_wide_default TYPE string;
DEFINE FIELD internal_access ON TABLE org_wide_default TYPE string \
    ASSERT $value IN ['PRIVATE', 'PUBLIC_READ', 'PUBLIC_READ_WRITE'];
DEFINE FIELD updated_at ON TABLE org_wide_default TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_owd_collection ON TABLE org_wide_default \
    COLUMNS tenant_id, collection_id UNIQUE;

DEFINE TABLE record_share SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE record_share TYPE string;
DEFINE FIELD collection_id ON TABLE record_share TYPE string;
DEFINE FIELD record_key ON TABLE record_share TYPE string;
DEFINE FIELD shared_with_type ON TABLE record_share TYPE string \
    ASSERT $value IN ['USER', 'GROUP'];
DEFINE FIELD shared_with_id ON TABLE record_share TYPE string;
DEFINE FIELD access_level ON TABLE record_share TYPE string \
    ASSERT $value IN ['READ', 'READ_WRITE'];
DEFINE FIELD reason ON TABLE record_share TYPE option<string>;
DEFINE FIELD created_by ON TABLE record_share TYPE string;
DEFINE FIELD created_at ON TABLE record_share TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_record_share_record ON TABLE record_share \
    COLUMNS tenant_id, collection_id, record_key;
";

// -----------------------------------------------------------------------
// Schema v3 — sharing rules
// -----------------------------------------------------------------------

const SCHEMA_V3: &str = "\
DEFINE TABLE sharing_rule SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE sharing_rule TYPE string;
DEFINE FIELD collection_id ON TABLE sharing_rule TYPE string;
DEFINE FIELD name ON TABLE sharing_rule TYPE string;
DEFINE FIELD rule_type ON TABLE sharing_rule TYPE string \
    ASSERT $value IN ['OWNER_BASED', 'CRITERIA_BASED'];
DEFINE FIELD shared_from ON TABLE sharing_rule TYPE option<string>;
DEFINE FIELD shared_to_type ON TABLE sharing_rule TYPE string \
    ASSERT $value IN ['ROLE', 'GROUP', 'QUEUE'];
DEFINE FIELD shared_to ON TABLE sharing_rule TYPE string;
DEFINE FIELD access_level ON TABLE sharing_rule TYPE string \
    ASSERT $value IN ['READ', 'READ_WRITE'];
DEFINE FIELD criteria ON TABLE sharing_rule TYPE option<string>;
DEFINE FIELD active ON TABLE sharing_rule TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE sharing_rule TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE sharing_rule TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_sharing_rule_name ON TABLE sharing_rule \
    COLUMNS tenant_id, collection_id, name UNIQUE;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT version FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in pending(current_version) {
        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        db.query(migration.sql).await?.check().map_err(|e| {
            DbError::Migration(format!(
                "Migration v{} '{}' failed: {}",
                migration.version, migration.name, e,
            ))
        })?;

        db.query("CREATE _migration SET version = $version, name = $name")
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

        info!(version = migration.version, "Migration applied");
    }

    Ok(())
}

fn pending(current_version: u32) -> impl Iterator<Item = &'static Migration> {
    MIGRATIONS
        .iter()
        .filter(move |m| m.version > current_version)
}

/// Returns the raw schema DDL for version 1.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
