//! Role extraction from validated JWT claims.
//!
//! Token validation itself happens upstream; this module only turns an
//! already-trusted claim set into authority strings (`ROLE_*` and
//! `SCOPE_*`), applying the identity provider's explicit role mapping.

use std::collections::{BTreeMap, HashMap};

use keel_core::models::oidc_provider::OidcProvider;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::AuthzConfig;

/// Provider role name -> platform role name.
///
/// Lookups try the exact provider role first, then a case-insensitive
/// match. When several entries fold to the same key, the first one
/// wins. Unmapped roles pass through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleMapping {
    exact: HashMap<String, String>,
    folded: HashMap<String, String>,
}

impl RoleMapping {
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut mapping = Self::default();
        for (from, to) in entries {
            let (from, to) = (from.into(), to.into());
            mapping
                .folded
                .entry(from.to_lowercase())
                .or_insert_with(|| to.clone());
            mapping.exact.insert(from, to);
        }
        mapping
    }

    /// Parse a provider's `roles_mapping` JSON object. A missing, blank
    /// or malformed mapping yields an empty mapping. Keys are taken in
    /// sorted order.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
            return Self::default();
        };

        match serde_json::from_str::<BTreeMap<String, String>>(raw) {
            Ok(entries) => Self::from_entries(entries),
            Err(e) => {
                warn!(error = %e, "Ignoring malformed role mapping");
                Self::default()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }

    /// The platform role for a provider role.
    pub fn map<'a>(&'a self, role: &'a str) -> &'a str {
        self.exact
            .get(role)
            .or_else(|| self.folded.get(&role.to_lowercase()))
            .map(String::as_str)
            .unwrap_or(role)
    }
}

/// Turns claims into authorities for one identity provider.
#[derive(Debug, Clone)]
pub struct RoleExtractor {
    roles_claim: Option<String>,
    mapping: RoleMapping,
    admin_role: String,
}

impl RoleExtractor {
    pub fn new(roles_claim: Option<String>, mapping: RoleMapping, admin_role: impl Into<String>) -> Self {
        Self {
            roles_claim: roles_claim.filter(|c| !c.trim().is_empty()),
            mapping,
            admin_role: admin_role.into(),
        }
    }

    /// Extractor configured from a stored provider.
    pub fn for_provider(provider: &OidcProvider, config: &AuthzConfig) -> Self {
        Self::new(
            provider.roles_claim.clone(),
            RoleMapping::parse(provider.roles_mapping.as_deref()),
            config.admin_role.clone(),
        )
    }

    /// Raw provider roles, in claim order and without duplicates.
    ///
    /// With a configured roles claim only that (dotted) path is read.
    /// Otherwise the conventional locations are merged: `roles`,
    /// `realm_access.roles`, every `resource_access.*.roles` and
    /// `groups`.
    pub fn extract_roles(&self, claims: &Value) -> Vec<String> {
        let mut roles = Vec::new();

        match &self.roles_claim {
            Some(path) => collect_roles(claim_at(claims, path), &mut roles),
            None => {
                collect_roles(claims.get("roles"), &mut roles);
                collect_roles(claim_at(claims, "realm_access.roles"), &mut roles);
                if let Some(Value::Object(clients)) = claims.get("resource_access") {
                    for client in clients.values() {
                        collect_roles(client.get("roles"), &mut roles);
                    }
                }
                collect_roles(claims.get("groups"), &mut roles);
            }
        }

        roles
    }

    /// Authorities granted by the claims: `ROLE_<MAPPED ROLE>` per role,
    /// `SCOPE_<scope>` per OAuth scope, and the platform-admin authority
    /// when any raw or mapped role names the admin role.
    pub fn authorities(&self, claims: &Value) -> Vec<String> {
        let admin_authority = format!("ROLE_{}", self.admin_role.to_uppercase());
        let mut authorities = Vec::new();
        let mut admin = false;

        for role in self.extract_roles(claims) {
            let mapped = self.mapping.map(&role);
            admin |= role.eq_ignore_ascii_case(&self.admin_role)
                || mapped.eq_ignore_ascii_case(&self.admin_role);
            push_unique(&mut authorities, format!("ROLE_{}", mapped.to_uppercase()));
        }

        if admin {
            push_unique(&mut authorities, admin_authority);
        }

        for scope in scopes(claims) {
            push_unique(&mut authorities, format!("SCOPE_{scope}"));
        }

        debug!(authorities = authorities.len(), admin, "Extracted authorities");
        authorities
    }
}

/// Follow a dotted claim path such as `realm_access.roles`.
fn claim_at<'a>(claims: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(claims, |value, segment| value.get(segment))
}

/// Accepts a string array or a comma-separated string.
fn collect_roles(value: Option<&Value>, out: &mut Vec<String>) {
    let push = |role: &str, out: &mut Vec<String>| {
        let role = role.trim();
        if !role.is_empty() {
            push_unique(out, role.to_string());
        }
    };

    match value {
        Some(Value::Array(items)) => {
            for item in items {
                if let Some(role) = item.as_str() {
                    push(role, out);
                }
            }
        }
        Some(Value::String(joined)) => {
            for role in joined.split(',') {
                push(role, out);
            }
        }
        _ => {}
    }
}

/// OAuth scopes from `scope` (space-separated) or `scp` (array).
fn scopes(claims: &Value) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(scope) = claims.get("scope").and_then(Value::as_str) {
        out.extend(scope.split_whitespace().map(str::to_string));
    }
    if let Some(Value::Array(items)) = claims.get("scp") {
        out.extend(items.iter().filter_map(Value::as_str).map(str::to_string));
    }
    out
}

fn push_unique(out: &mut Vec<String>, value: String) {
    if !out.contains(&value) {
        out.push(value);
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    use super::*;

    fn extractor(claim: Option<&str>, mapping: RoleMapping) -> RoleExtractor {
        RoleExtractor::new(claim.map(str::to_string), mapping, "PLATFORM_ADMIN")
    }

    #[test]
    fn malformed_mapping_is_empty() {
        assert!(RoleMapping::parse(Some("{not json")).is_empty());
        assert!(RoleMapping::parse(Some(r#"["admin"]"#)).is_empty());
        assert!(RoleMapping::parse(Some("   ")).is_empty());
        assert!(RoleMapping::parse(None).is_empty());
    }

    #[test]
    fn mapping_prefers_exact_then_case_insensitive() {
        let mapping = RoleMapping::from_entries([("Admin", "PLATFORM_ADMIN"), ("admin", "TENANT_ADMIN")]);
        assert_eq!(mapping.map("Admin"), "PLATFORM_ADMIN");
        assert_eq!(mapping.map("admin"), "TENANT_ADMIN");
        assert_eq!(mapping.map("ADMIN"), "PLATFORM_ADMIN");

        let mapping = RoleMapping::parse(Some(r#"{"Sales-Reps":"SALES"}"#));
        assert_eq!(mapping.map("sales-reps"), "SALES");
        assert_eq!(mapping.map("support"), "support");
    }

    #[test]
    fn parsed_case_collisions_resolve_the_same_way_every_time() {
        let raw = r#"{"admin":"TENANT_ADMIN","Admin":"PLATFORM_ADMIN","ADMIN":"AUDITOR"}"#;
        for _ in 0..16 {
            let mapping = RoleMapping::parse(Some(raw));
            assert_eq!(mapping.map("aDmIn"), "AUDITOR");
            assert_eq!(mapping.map("admin"), "TENANT_ADMIN");
            assert_eq!(mapping, RoleMapping::parse(Some(raw)));
        }
    }

    #[test]
    fn provider_claim_path_is_used_without_a_valid_mapping() {
        let provider = OidcProvider {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            name: "Corporate SSO".into(),
            issuer: "https://sso.acme.test".into(),
            roles_claim: Some("app.authz.roles".into()),
            roles_mapping: Some("{not json".into()),
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let extractor = RoleExtractor::for_provider(&provider, &AuthzConfig::default());
        assert!(extractor.mapping.is_empty());

        let claims = json!({
            "roles": ["ignored"],
            "app": {"authz": {"roles": ["analyst", "platform_admin"]}}
        });
        assert_eq!(extractor.extract_roles(&claims), vec!["analyst", "platform_admin"]);
        assert_eq!(
            extractor.authorities(&claims),
            vec!["ROLE_ANALYST", "ROLE_PLATFORM_ADMIN"]
        );
    }

    #[test]
    fn default_sources_are_merged() {
        let claims = json!({
            "roles": ["admin", "user"],
            "realm_access": {"roles": ["manager"]},
            "resource_access": {"crm": {"roles": ["crm-editor"]}},
            "groups": ["developers"]
        });
        let authorities = extractor(None, RoleMapping::default()).authorities(&claims);
        for expected in [
            "ROLE_ADMIN",
            "ROLE_USER",
            "ROLE_MANAGER",
            "ROLE_CRM-EDITOR",
            "ROLE_DEVELOPERS",
        ] {
            assert!(authorities.contains(&expected.to_string()), "missing {expected}");
        }
    }

    #[test]
    fn comma_separated_roles_and_scopes() {
        let claims = json!({"roles": "admin, user,,manager", "scope": "read write"});
        let authorities = extractor(None, RoleMapping::default()).authorities(&claims);
        assert_eq!(
            authorities,
            vec!["ROLE_ADMIN", "ROLE_USER", "ROLE_MANAGER", "SCOPE_read", "SCOPE_write"]
        );
    }

    #[test]
    fn configured_claim_path_is_the_only_source() {
        let claims = json!({
            "roles": ["ignored"],
            "app": {"authz": {"roles": ["editor"]}}
        });
        let roles = extractor(Some("app.authz.roles"), RoleMapping::default()).extract_roles(&claims);
        assert_eq!(roles, vec!["editor"]);
    }

    #[test]
    fn mapped_role_grants_platform_admin() {
        let mapping = RoleMapping::parse(Some(r#"{"idp-superusers":"platform_admin"}"#));
        let claims = json!({"groups": ["idp-superusers"]});
        let authorities = extractor(None, mapping).authorities(&claims);
        assert_eq!(authorities, vec!["ROLE_PLATFORM_ADMIN"]);
    }

    #[test]
    fn raw_admin_role_survives_remapping() {
        let mapping = RoleMapping::from_entries([("platform_admin", "OPS")]);
        let claims = json!({"roles": ["platform_admin"]});
        let authorities = extractor(None, mapping).authorities(&claims);
        assert!(authorities.contains(&"ROLE_OPS".to_string()));
        assert!(authorities.contains(&"ROLE_PLATFORM_ADMIN".to_string()));
    }
}
