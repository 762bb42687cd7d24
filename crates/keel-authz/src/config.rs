//! Permission resolution configuration.

/// Configuration for the permission resolution services.
#[derive(Debug, Clone)]
pub struct AuthzConfig {
    /// When `false`, every caller resolves to the all-permissive result.
    pub permissions_enabled: bool,
    /// Maximum number of GROUP -> GROUP hops followed during group
    /// traversal (default: 10).
    pub max_group_depth: usize,
    /// Role name that marks a platform administrator (default:
    /// `PLATFORM_ADMIN`). Compared case-insensitively.
    pub admin_role: String,
}

impl AuthzConfig {
    /// The authority string carried by platform administrators.
    pub fn admin_authority(&self) -> String {
        format!("ROLE_{}", self.admin_role.to_uppercase())
    }
}

impl Default for AuthzConfig {
    fn default() -> Self {
        Self {
            permissions_enabled: true,
            max_group_depth: 10,
            admin_role: "PLATFORM_ADMIN".into(),
        }
    }
}
