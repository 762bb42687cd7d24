//! Process configuration loaded from the environment.

use std::env;
use std::str::FromStr;

use keel_authz::AuthzConfig;
use keel_db::DbConfig;

use crate::error::ServerError;

/// Everything the server needs at startup.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub db: DbConfig,
    pub authz: AuthzConfig,
}

impl ServerConfig {
    /// Read `KEEL_DB_*`, `KEEL_PERMISSIONS_ENABLED`,
    /// `KEEL_MAX_GROUP_DEPTH` and `KEEL_ADMIN_ROLE`. Unset variables keep
    /// their defaults; malformed ones are an error.
    pub fn from_env() -> Result<Self, ServerError> {
        let defaults = AuthzConfig::default();
        let authz = AuthzConfig {
            permissions_enabled: parse_var("KEEL_PERMISSIONS_ENABLED")?
                .unwrap_or(defaults.permissions_enabled),
            max_group_depth: parse_var("KEEL_MAX_GROUP_DEPTH")?
                .unwrap_or(defaults.max_group_depth),
            admin_role: env::var("KEEL_ADMIN_ROLE")
                .ok()
                .filter(|r| !r.trim().is_empty())
                .unwrap_or(defaults.admin_role),
        };

        Ok(Self {
            db: DbConfig::from_env(),
            authz,
        })
    }
}

fn parse_var<T: FromStr>(name: &'static str) -> Result<Option<T>, ServerError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ServerError::InvalidVar { name, value: raw }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_var_rejects_garbage() {
        // Variable names unique to this test keep it independent of the
        // process environment.
        unsafe {
            env::set_var("KEEL_TEST_DEPTH_OK", " 4 ");
            env::set_var("KEEL_TEST_DEPTH_BAD", "deep");
        }
        assert_eq!(parse_var::<usize>("KEEL_TEST_DEPTH_OK").unwrap(), Some(4));
        assert!(parse_var::<usize>("KEEL_TEST_DEPTH_BAD").is_err());
        assert_eq!(parse_var::<bool>("KEEL_TEST_UNSET").unwrap(), None);
    }
}
