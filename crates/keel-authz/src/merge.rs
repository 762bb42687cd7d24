//! Pure merge rules for grants coming from several sources.
//!
//! Capability flags and system permissions are additive: a flag is set
//! when any source sets it. Field visibility is restrictive: the most
//! restrictive visibility of any source wins.

use std::collections::{BTreeMap, HashMap};

use keel_core::models::permission::{
    FieldPermissionGrant, FieldVisibility, ObjectPermissionGrant, ObjectPermissions,
    SystemPermission, SystemPermissionGrant,
};
use uuid::Uuid;

/// System permission key -> granted.
pub type SystemPermissions = BTreeMap<SystemPermission, bool>;

/// Field ID -> merged visibility.
pub type FieldVisibilities = HashMap<Uuid, FieldVisibility>;

/// OR of every flag over all grants. No grants yields all-false.
pub fn merge_object_permissions<I>(grants: I) -> ObjectPermissions
where
    I: IntoIterator<Item = ObjectPermissions>,
{
    grants
        .into_iter()
        .fold(ObjectPermissions::NONE, ObjectPermissions::merge)
}

/// HIDDEN beats READ_ONLY beats VISIBLE. No grants yields VISIBLE.
pub fn merge_field_visibility<I>(grants: I) -> FieldVisibility
where
    I: IntoIterator<Item = FieldVisibility>,
{
    grants.into_iter().max().unwrap_or_default()
}

/// Every catalogue key, initialised to `value`.
pub fn uniform_system_permissions(value: bool) -> SystemPermissions {
    SystemPermission::ALL.iter().map(|p| (*p, value)).collect()
}

/// Every catalogue key starts false; a key is true when any grant
/// grants it.
pub fn merge_system_permissions(grants: &[SystemPermissionGrant]) -> SystemPermissions {
    let mut merged = uniform_system_permissions(false);
    for grant in grants.iter().filter(|g| g.granted) {
        merged.insert(grant.permission, true);
    }
    merged
}

/// Merge object grants per collection.
pub fn object_permissions_by_collection(
    grants: &[ObjectPermissionGrant],
) -> HashMap<Uuid, ObjectPermissions> {
    let mut merged: HashMap<Uuid, ObjectPermissions> = HashMap::new();
    for grant in grants {
        let entry = merged.entry(grant.collection_id).or_default();
        *entry = entry.merge(grant.permissions);
    }
    merged
}

/// Merge field grants per collection and field.
pub fn field_visibility_by_collection(
    grants: &[FieldPermissionGrant],
) -> HashMap<Uuid, FieldVisibilities> {
    let mut merged: HashMap<Uuid, FieldVisibilities> = HashMap::new();
    for grant in grants {
        let entry = merged
            .entry(grant.collection_id)
            .or_default()
            .entry(grant.field_id)
            .or_default();
        *entry = (*entry).max(grant.visibility);
    }
    merged
}
