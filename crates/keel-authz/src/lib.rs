//! Keel Authz — permission resolution for profiles, permission sets and
//! nested groups, record-level access and role extraction.

pub mod collector;
pub mod config;
pub mod error;
pub mod groups;
pub mod merge;
pub mod my_permissions;
pub mod record_access;
pub mod roles;
pub mod seeder;
pub mod service;

pub use collector::{CollectedGrants, GrantCollector};
pub use config::AuthzConfig;
pub use error::AuthzError;
pub use groups::GroupMembershipResolver;
pub use my_permissions::{AuthenticatedCaller, EffectivePermissions, MyPermissionsService};
pub use record_access::{AccessType, RecordAccessService, RecordRef};
pub use roles::{RoleExtractor, RoleMapping};
pub use seeder::DefaultProfileSeeder;
pub use service::{PermissionResolutionService, Principal, ResolvedPermissions};
