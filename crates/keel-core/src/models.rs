//! Domain models for Keel.
//!
//! These are the core types shared across all crates.

pub mod collection;
pub mod group;
pub mod oidc_provider;
pub mod permission;
pub mod permission_set;
pub mod profile;
pub mod sharing;
pub mod tenant;
pub mod user;
