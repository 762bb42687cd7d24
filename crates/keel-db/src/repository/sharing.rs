//! SurrealDB implementation of [`SharingRepository`].

use chrono::{DateTime, Utc};
use keel_core::error::KeelResult;
use keel_core::models::sharing::{
    CreateRecordShare, CreateSharingRule, InternalAccess, OrgWideDefault, RecordShare,
    ShareAccessLevel, ShareTarget, SharingRule, SharingRuleTarget, SharingRuleType,
};
use keel_core::repository::SharingRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::ensure_in_tenant;
use crate::error::{DbError, parse_uuid, statement_error};

#[derive(Debug, SurrealValue)]
struct OrgWideDefaultRow {
    internal_access: String,
    updated_at: DateTime<Utc>,
}

impl OrgWideDefaultRow {
    fn try_into_default(
        self,
        tenant_id: Uuid,
        collection_id: Uuid,
    ) -> Result<OrgWideDefault, DbError> {
        let internal_access: InternalAccess = self
            .internal_access
            .parse()
            .map_err(|e| DbError::CorruptRow(format!("{e}")))?;
        Ok(OrgWideDefault {
            tenant_id,
            collection_id,
            internal_access,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct RecordShareRow {
    record_id: String,
    tenant_id: String,
    collection_id: String,
    record_key: String,
    shared_with_type: String,
    shared_with_id: String,
    access_level: String,
    reason: Option<String>,
    created_by: String,
    created_at: DateTime<Utc>,
}

impl RecordShareRow {
    fn try_into_share(self) -> Result<RecordShare, DbError> {
        let target_id = parse_uuid(&self.shared_with_id, "share target")?;
        let shared_with = ShareTarget::from_parts(&self.shared_with_type, target_id)
            .ok_or_else(|| {
                DbError::CorruptRow(format!("unknown share target: {}", self.shared_with_type))
            })?;
        let access_level: ShareAccessLevel = self
            .access_level
            .parse()
            .map_err(|e| DbError::CorruptRow(format!("{e}")))?;

        Ok(RecordShare {
            id: parse_uuid(&self.record_id, "record_share")?,
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            collection_id: parse_uuid(&self.collection_id, "collection")?,
            record_id: self.record_key,
            shared_with,
            access_level,
            reason: self.reason,
            created_by: parse_uuid(&self.created_by, "created_by")?,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct SharingRuleRow {
    record_id: String,
    tenant_id: String,
    collection_id: String,
    name: String,
    rule_type: String,
    shared_from: Option<String>,
    shared_to_type: String,
    shared_to: String,
    access_level: String,
    criteria: Option<String>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SharingRuleRow {
    fn try_into_rule(self) -> Result<SharingRule, DbError> {
        let shared_to = SharingRuleTarget::from_parts(&self.shared_to_type, &self.shared_to)
            .ok_or_else(|| {
                DbError::CorruptRow(format!(
                    "invalid sharing rule target: {} {}",
                    self.shared_to_type, self.shared_to
                ))
            })?;
        let rule_type: SharingRuleType = self
            .rule_type
            .parse()
            .map_err(|e| DbError::CorruptRow(format!("{e}")))?;
        let access_level: ShareAccessLevel = self
            .access_level
            .parse()
            .map_err(|e| DbError::CorruptRow(format!("{e}")))?;

        Ok(SharingRule {
            id: parse_uuid(&self.record_id, "sharing_rule")?,
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            collection_id: parse_uuid(&self.collection_id, "collection")?,
            name: self.name,
            rule_type,
            shared_from: self.shared_from,
            shared_to,
            access_level,
            criteria: self.criteria,
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

// `record_id` is the row's own ID. A share keeps the shared record's
// key in `record_key`.
const ROW_PROJECTION: &str = "meta::id(id) AS record_id, *";

fn single_rule(rows: Vec<SharingRuleRow>, id: &str) -> Result<SharingRule, DbError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| DbError::NotFound {
            entity: "sharing_rule".into(),
            id: id.to_string(),
        })?
        .try_into_rule()
}

/// SurrealDB implementation of the Sharing repository.
#[derive(Clone)]
pub struct SurrealSharingRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealSharingRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> SharingRepository for SurrealSharingRepository<C> {
    async fn set_org_wide_default(
        &self,
        tenant_id: Uuid,
        collection_id: Uuid,
        internal_access: InternalAccess,
    ) -> KeelResult<OrgWideDefault> {
        ensure_in_tenant(&self.db, "collection", tenant_id, collection_id).await?;

        let result = self
            .db
            .query(
                "DELETE org_wide_default WHERE tenant_id = $tenant_id \
                 AND collection_id = $collection_id; \
                 CREATE org_wide_default SET tenant_id = $tenant_id, \
                 collection_id = $collection_id, \
                 internal_access = $internal_access;",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("collection_id", collection_id.to_string()))
            .bind(("internal_access", internal_access.as_str()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| statement_error("org_wide_default", e))?;

        let rows: Vec<OrgWideDefaultRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "org_wide_default".into(),
            id: collection_id.to_string(),
        })?;

        Ok(row.try_into_default(tenant_id, collection_id)?)
    }

    async fn get_org_wide_default(
        &self,
        tenant_id: Uuid,
        collection_id: Uuid,
    ) -> KeelResult<Option<OrgWideDefault>> {
        let mut result = self
            .db
            .query(
                "SELECT * FROM org_wide_default WHERE tenant_id = $tenant_id \
                 AND collection_id = $collection_id LIMIT 1",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("collection_id", collection_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OrgWideDefaultRow> = result.take(0).map_err(DbError::from)?;
        let owd = rows
            .into_iter()
            .next()
            .map(|row| row.try_into_default(tenant_id, collection_id))
            .transpose()?;

        Ok(owd)
    }

    async fn create_record_share(&self, input: CreateRecordShare) -> KeelResult<RecordShare> {
        ensure_in_tenant(&self.db, "collection", input.tenant_id, input.collection_id).await?;
        let id_str = Uuid::new_v4().to_string();

        let query = format!(
            "CREATE type::record('record_share', $id) SET \
             tenant_id = $tenant_id, collection_id = $collection_id, \
             record_key = $record_key, \
             shared_with_type = $shared_with_type, \
             shared_with_id = $shared_with_id, \
             access_level = $access_level, reason = $reason, \
             created_by = $created_by; \
             SELECT {ROW_PROJECTION} FROM type::record('record_share', $id);"
        );

        let result = self
            .db
            .query(query)
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("collection_id", input.collection_id.to_string()))
            .bind(("record_key", input.record_id))
            .bind(("shared_with_type", input.shared_with.kind()))
            .bind(("shared_with_id", input.shared_with.id().to_string()))
            .bind(("access_level", input.access_level.as_str()))
            .bind(("reason", input.reason))
            .bind(("created_by", input.created_by.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| statement_error("record_share", e))?;

        let rows: Vec<RecordShareRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "record_share".into(),
            id: id_str,
        })?;

        Ok(row.try_into_share()?)
    }

    async fn delete_record_share(&self, tenant_id: Uuid, id: Uuid) -> KeelResult<()> {
        ensure_in_tenant(&self.db, "record_share", tenant_id, id).await?;

        self.db
            .query("DELETE type::record('record_share', $id) WHERE tenant_id = $tenant_id")
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn list_record_shares(
        &self,
        tenant_id: Uuid,
        collection_id: Uuid,
        record_id: &str,
    ) -> KeelResult<Vec<RecordShare>> {
        let query = format!(
            "SELECT {ROW_PROJECTION} FROM record_share \
             WHERE tenant_id = $tenant_id AND collection_id = $collection_id \
             AND record_key = $record_key \
             ORDER BY created_at ASC"
        );

        let mut result = self
            .db
            .query(query)
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("collection_id", collection_id.to_string()))
            .bind(("record_key", record_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RecordShareRow> = result.take(0).map_err(DbError::from)?;
        let shares = rows
            .into_iter()
            .map(|row| row.try_into_share())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(shares)
    }

    async fn create_sharing_rule(&self, input: CreateSharingRule) -> KeelResult<SharingRule> {
        ensure_in_tenant(&self.db, "collection", input.tenant_id, input.collection_id).await?;
        if let SharingRuleTarget::Group(group_id) | SharingRuleTarget::Queue(group_id) =
            input.shared_to
        {
            ensure_in_tenant(&self.db, "group", input.tenant_id, group_id).await?;
        }
        let id_str = Uuid::new_v4().to_string();

        let query = format!(
            "CREATE type::record('sharing_rule', $id) SET \
             tenant_id = $tenant_id, collection_id = $collection_id, \
             name = $name, rule_type = $rule_type, \
             shared_from = $shared_from, \
             shared_to_type = $shared_to_type, shared_to = $shared_to, \
             access_level = $access_level, criteria = $criteria; \
             SELECT {ROW_PROJECTION} FROM type::record('sharing_rule', $id);"
        );

        let result = self
            .db
            .query(query)
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("collection_id", input.collection_id.to_string()))
            .bind(("name", input.name))
            .bind(("rule_type", input.rule_type.as_str()))
            .bind(("shared_from", input.shared_from))
            .bind(("shared_to_type", input.shared_to.kind()))
            .bind(("shared_to", input.shared_to.value()))
            .bind(("access_level", input.access_level.as_str()))
            .bind(("criteria", input.criteria))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| statement_error("sharing_rule", e))?;

        let rows: Vec<SharingRuleRow> = result.take(1).map_err(DbError::from)?;
        Ok(single_rule(rows, &id_str)?)
    }

    async fn set_sharing_rule_active(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        active: bool,
    ) -> KeelResult<SharingRule> {
        ensure_in_tenant(&self.db, "sharing_rule", tenant_id, id).await?;
        let id_str = id.to_string();

        let query = format!(
            "UPDATE type::record('sharing_rule', $id) SET \
             active = $active, updated_at = time::now() \
             WHERE tenant_id = $tenant_id; \
             SELECT {ROW_PROJECTION} FROM type::record('sharing_rule', $id);"
        );

        let result = self
            .db
            .query(query)
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("active", active))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| statement_error("sharing_rule", e))?;

        let rows: Vec<SharingRuleRow> = result.take(1).map_err(DbError::from)?;
        Ok(single_rule(rows, &id_str)?)
    }

    async fn delete_sharing_rule(&self, tenant_id: Uuid, id: Uuid) -> KeelResult<()> {
        ensure_in_tenant(&self.db, "sharing_rule", tenant_id, id).await?;

        self.db
            .query("DELETE type::record('sharing_rule', $id) WHERE tenant_id = $tenant_id")
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn list_active_sharing_rules(
        &self,
        tenant_id: Uuid,
        collection_id: Uuid,
    ) -> KeelResult<Vec<SharingRule>> {
        let query = format!(
            "SELECT {ROW_PROJECTION} FROM sharing_rule \
             WHERE tenant_id = $tenant_id AND collection_id = $collection_id \
             AND active = true \
             ORDER BY created_at ASC"
        );

        let mut result = self
            .db
            .query(query)
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("collection_id", collection_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SharingRuleRow> = result.take(0).map_err(DbError::from)?;
        let rules = rows
            .into_iter()
            .map(|row| row.try_into_rule())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(rules)
    }
}
