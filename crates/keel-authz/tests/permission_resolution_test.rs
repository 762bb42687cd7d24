//! Integration tests for permission resolution, caller views, record
//! access and profile seeding using in-memory SurrealDB.

use std::collections::HashSet;

use keel_authz::{
    AccessType, AuthenticatedCaller, AuthzConfig, DefaultProfileSeeder, GrantCollector,
    GroupMembershipResolver, MyPermissionsService, PermissionResolutionService, Principal,
    RecordAccessService, RecordRef,
};
use keel_core::error::KeelError;
use keel_core::models::collection::{CreateCollection, CreateField};
use keel_core::models::group::CreateGroup;
use keel_core::models::permission::{
    FieldPermissionGrant, FieldVisibility, GrantHolder, ObjectPermissionGrant, ObjectPermissions,
    SystemPermission, SystemPermissionGrant,
};
use keel_core::models::permission_set::CreatePermissionSet;
use keel_core::models::profile::CreateProfile;
use keel_core::models::sharing::{
    CreateRecordShare, CreateSharingRule, InternalAccess, ShareAccessLevel, ShareTarget,
    SharingRuleTarget, SharingRuleType,
};
use keel_core::models::tenant::CreateTenant;
use keel_core::models::user::CreateUser;
use keel_core::repository::{
    CollectionRepository, GrantRepository, GroupRepository, PermissionSetRepository,
    ProfileRepository, SharingRepository, TenantRepository, UserRepository,
};
use keel_db::repository::{
    SurrealCollectionRepository, SurrealGrantRepository, SurrealGroupRepository,
    SurrealPermissionSetRepository, SurrealProfileRepository, SurrealSharingRepository,
    SurrealTenantRepository, SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

type Resolver = PermissionResolutionService<
    SurrealUserRepository<Db>,
    SurrealGroupRepository<Db>,
    SurrealPermissionSetRepository<Db>,
    SurrealGrantRepository<Db>,
>;

/// Tenant with one collection, two fields and a baseline profile.
struct Fixture {
    db: Surreal<Db>,
    tenant_id: Uuid,
    profile_id: Uuid,
    accounts: Uuid,
    revenue: Uuid,
    notes: Uuid,
}

async fn setup() -> Fixture {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    keel_db::run_migrations(&db).await.unwrap();

    let tenant_id = SurrealTenantRepository::new(db.clone())
        .create(CreateTenant {
            name: "Acme".into(),
            slug: "acme".into(),
            metadata: None,
        })
        .await
        .unwrap()
        .id;

    let profile_id = SurrealProfileRepository::new(db.clone())
        .create(CreateProfile {
            tenant_id,
            name: "Standard User".into(),
            description: String::new(),
            is_system: false,
        })
        .await
        .unwrap()
        .id;

    let collections = SurrealCollectionRepository::new(db.clone());
    let accounts = collections
        .create(CreateCollection {
            tenant_id,
            name: "accounts".into(),
            display_name: "Accounts".into(),
        })
        .await
        .unwrap()
        .id;
    let mut field_ids = Vec::new();
    for name in ["revenue", "notes"] {
        let field = collections
            .add_field(CreateField {
                tenant_id,
                collection_id: accounts,
                name: name.into(),
            })
            .await
            .unwrap();
        field_ids.push(field.id);
    }

    Fixture {
        db,
        tenant_id,
        profile_id,
        accounts,
        revenue: field_ids[0],
        notes: field_ids[1],
    }
}

impl Fixture {
    fn resolver(&self, config: AuthzConfig) -> Resolver {
        let groups = GroupMembershipResolver::new(
            SurrealGroupRepository::new(self.db.clone()),
            config.max_group_depth,
        );
        let collector = GrantCollector::new(
            SurrealUserRepository::new(self.db.clone()),
            groups,
            SurrealPermissionSetRepository::new(self.db.clone()),
            SurrealGrantRepository::new(self.db.clone()),
        );
        PermissionResolutionService::new(collector, config)
    }

    fn grants(&self) -> SurrealGrantRepository<Db> {
        SurrealGrantRepository::new(self.db.clone())
    }

    fn groups(&self) -> SurrealGroupRepository<Db> {
        SurrealGroupRepository::new(self.db.clone())
    }

    fn permission_sets(&self) -> SurrealPermissionSetRepository<Db> {
        SurrealPermissionSetRepository::new(self.db.clone())
    }

    async fn user(&self, email: &str, manager_id: Option<Uuid>) -> Uuid {
        SurrealUserRepository::new(self.db.clone())
            .create(CreateUser {
                tenant_id: self.tenant_id,
                username: email.split('@').next().unwrap_or(email).into(),
                email: email.into(),
                profile_id: self.profile_id,
                manager_id,
                metadata: None,
            })
            .await
            .unwrap()
            .id
    }

    async fn group(&self, name: &str) -> Uuid {
        self.groups()
            .create(CreateGroup {
                tenant_id: self.tenant_id,
                name: name.into(),
                description: String::new(),
                metadata: None,
            })
            .await
            .unwrap()
            .id
    }

    async fn permission_set(&self, name: &str) -> Uuid {
        self.permission_sets()
            .create(CreatePermissionSet {
                tenant_id: self.tenant_id,
                name: name.into(),
                description: String::new(),
                is_system: false,
            })
            .await
            .unwrap()
            .id
    }

    async fn grant_object(&self, holder: GrantHolder, permissions: ObjectPermissions) {
        self.grants()
            .set_object_permission(
                self.tenant_id,
                ObjectPermissionGrant {
                    holder,
                    collection_id: self.accounts,
                    permissions,
                },
            )
            .await
            .unwrap();
    }

    async fn grant_field(&self, holder: GrantHolder, field_id: Uuid, visibility: FieldVisibility) {
        self.grants()
            .set_field_permission(
                self.tenant_id,
                FieldPermissionGrant {
                    holder,
                    collection_id: self.accounts,
                    field_id,
                    visibility,
                },
            )
            .await
            .unwrap();
    }

    async fn grant_system(&self, holder: GrantHolder, permission: SystemPermission) {
        self.grants()
            .set_system_permission(
                self.tenant_id,
                SystemPermissionGrant {
                    holder,
                    permission,
                    granted: true,
                },
            )
            .await
            .unwrap();
    }

    async fn share(&self, record_id: &str, shared_with: ShareTarget, access_level: ShareAccessLevel) {
        SurrealSharingRepository::new(self.db.clone())
            .create_record_share(CreateRecordShare {
                tenant_id: self.tenant_id,
                collection_id: self.accounts,
                record_id: record_id.into(),
                shared_with,
                access_level,
                reason: None,
                created_by: Uuid::new_v4(),
            })
            .await
            .unwrap();
    }

    async fn sharing_rule(
        &self,
        name: &str,
        rule_type: SharingRuleType,
        shared_from: Option<Uuid>,
        shared_to: SharingRuleTarget,
        access_level: ShareAccessLevel,
    ) -> Uuid {
        SurrealSharingRepository::new(self.db.clone())
            .create_sharing_rule(CreateSharingRule {
                tenant_id: self.tenant_id,
                collection_id: self.accounts,
                name: name.into(),
                rule_type,
                shared_from: shared_from.map(|g| g.to_string()),
                shared_to,
                access_level,
                criteria: None,
            })
            .await
            .unwrap()
            .id
    }

    fn caller(&self, email: &str, authorities: &[&str]) -> AuthenticatedCaller {
        AuthenticatedCaller::new(
            Some(self.tenant_id),
            email,
            authorities.iter().map(|a| a.to_string()).collect(),
        )
    }
}

fn flags(read: bool, edit: bool) -> ObjectPermissions {
    ObjectPermissions {
        can_read: read,
        can_edit: edit,
        ..ObjectPermissions::NONE
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

#[tokio::test]
async fn profile_and_nested_group_permission_set_are_merged() {
    let fx = setup().await;
    let alice = fx.user("alice@acme.test", None).await;

    // alice -> sales -> emea, with the permission set on emea.
    let sales = fx.group("sales").await;
    let emea = fx.group("emea").await;
    fx.groups().add_member(fx.tenant_id, alice, sales).await.unwrap();
    fx.groups().add_nested_group(fx.tenant_id, emea, sales).await.unwrap();
    let editors = fx.permission_set("Account Editors").await;
    fx.permission_sets()
        .assign_to_group(fx.tenant_id, emea, editors)
        .await
        .unwrap();

    let profile = GrantHolder::Profile(fx.profile_id);
    let set = GrantHolder::PermissionSet(editors);
    fx.grant_object(profile, flags(true, false)).await;
    fx.grant_object(set, flags(false, true)).await;
    fx.grant_field(profile, fx.revenue, FieldVisibility::Visible).await;
    fx.grant_field(set, fx.revenue, FieldVisibility::Hidden).await;
    fx.grant_field(set, fx.notes, FieldVisibility::ReadOnly).await;
    fx.grant_system(profile, SystemPermission::ApiAccess).await;
    fx.grant_system(set, SystemPermission::ManageUsers).await;

    let resolver = fx.resolver(AuthzConfig::default());
    let principal = Principal::user(fx.tenant_id, alice);

    let objects = resolver.get_object_permissions(&principal, fx.accounts).await.unwrap();
    assert!(objects.can_read && objects.can_edit);
    assert!(!objects.can_create && !objects.can_delete);

    let fields = resolver.get_field_permissions(&principal, fx.accounts).await.unwrap();
    assert_eq!(fields[&fx.revenue], FieldVisibility::Hidden);
    assert_eq!(fields[&fx.notes], FieldVisibility::ReadOnly);

    let resolved = resolver.resolve_for_user(&principal).await.unwrap();
    assert_eq!(resolved.system_permissions.len(), SystemPermission::ALL.len());
    assert!(resolved.has_system_permission(SystemPermission::ApiAccess));
    assert!(resolved.has_system_permission(SystemPermission::ManageUsers));
    assert!(!resolved.has_system_permission(SystemPermission::ViewAllData));
    assert_eq!(resolved.object_permissions_for(fx.accounts), objects);

    assert!(
        resolver
            .has_system_permission(&principal, SystemPermission::ManageUsers)
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn permission_set_reached_twice_contributes_once() {
    let fx = setup().await;
    let bob = fx.user("bob@acme.test", None).await;
    let team = fx.group("team").await;
    fx.groups().add_member(fx.tenant_id, bob, team).await.unwrap();

    let set = fx.permission_set("Shared").await;
    fx.permission_sets().assign_to_user(fx.tenant_id, bob, set).await.unwrap();
    fx.permission_sets().assign_to_group(fx.tenant_id, team, set).await.unwrap();
    fx.grant_object(GrantHolder::PermissionSet(set), flags(true, false)).await;

    let resolver = fx.resolver(AuthzConfig::default());
    let grants = resolver
        .collector()
        .collect_grants(fx.tenant_id, bob)
        .await
        .unwrap();
    assert_eq!(grants.object_grants.len(), 1);
}

#[tokio::test]
async fn platform_admin_and_disabled_enforcement_are_all_permissive() {
    let fx = setup().await;
    let resolver = fx.resolver(AuthzConfig::default());

    // The admin is not even a stored user.
    let admin = Principal::platform_admin(fx.tenant_id, Uuid::new_v4());
    let resolved = resolver.resolve_for_user(&admin).await.unwrap();
    assert!(resolved.all_permissive);
    assert!(resolved.system_permissions.values().all(|granted| *granted));
    assert_eq!(
        resolver.get_object_permissions(&admin, fx.accounts).await.unwrap(),
        ObjectPermissions::ALL
    );
    assert!(resolver.get_field_permissions(&admin, fx.accounts).await.unwrap().is_empty());

    let disabled = fx.resolver(AuthzConfig {
        permissions_enabled: false,
        ..AuthzConfig::default()
    });
    let carol = fx.user("carol@acme.test", None).await;
    let principal = Principal::user(fx.tenant_id, carol);
    assert_eq!(
        disabled.get_object_permissions(&principal, fx.accounts).await.unwrap(),
        ObjectPermissions::ALL
    );
}

#[tokio::test]
async fn unknown_user_resolves_to_nothing() {
    let fx = setup().await;
    let resolver = fx.resolver(AuthzConfig::default());
    let ghost = Principal::user(fx.tenant_id, Uuid::new_v4());

    let resolved = resolver.resolve_for_user(&ghost).await.unwrap();
    assert!(!resolved.all_permissive);
    assert_eq!(resolved.system_permissions.len(), SystemPermission::ALL.len());
    assert!(resolved.system_permissions.values().all(|granted| !granted));
    assert_eq!(
        resolver.get_object_permissions(&ghost, fx.accounts).await.unwrap(),
        ObjectPermissions::NONE
    );
}

#[tokio::test]
async fn nesting_through_resolver_rejects_cycles() {
    let fx = setup().await;
    let resolver = GroupMembershipResolver::new(fx.groups(), 10);
    let (a, b, c) = (fx.group("a").await, fx.group("b").await, fx.group("c").await);

    resolver.nest_group(fx.tenant_id, a, b).await.unwrap();
    resolver.nest_group(fx.tenant_id, b, c).await.unwrap();

    let err = resolver.nest_group(fx.tenant_id, c, a).await.unwrap_err();
    assert!(matches!(err, KeelError::Validation { .. }));

    let user = fx.user("dave@acme.test", None).await;
    fx.groups().add_member(fx.tenant_id, user, c).await.unwrap();
    let groups = resolver.effective_group_ids(fx.tenant_id, user).await.unwrap();
    assert_eq!(groups, [a, b, c].into_iter().collect::<HashSet<_>>());
    let members = resolver.effective_user_ids(fx.tenant_id, a).await.unwrap();
    assert!(members.contains(&user));
}

// ---------------------------------------------------------------------------
// Caller views
// ---------------------------------------------------------------------------

#[tokio::test]
async fn caller_views_resolve_by_email_and_collection_name_or_id() {
    let fx = setup().await;
    fx.user("erin@acme.test", None).await;
    let profile = GrantHolder::Profile(fx.profile_id);
    fx.grant_object(profile, flags(true, true)).await;
    fx.grant_field(profile, fx.revenue, FieldVisibility::ReadOnly).await;
    fx.grant_system(profile, SystemPermission::ApiAccess).await;

    let view = MyPermissionsService::new(
        fx.resolver(AuthzConfig::default()),
        SurrealCollectionRepository::new(fx.db.clone()),
    );
    let erin = fx.caller("erin@acme.test", &["ROLE_USER"]);

    let by_name = view.objects(&erin, "accounts").await;
    let by_id = view.objects(&erin, &fx.accounts.to_string()).await;
    assert!(by_name.can_read && by_name.can_edit && !by_name.can_delete);
    assert_eq!(by_name, by_id);

    let fields = view.fields(&erin, "accounts").await;
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[&fx.revenue.to_string()], FieldVisibility::ReadOnly);
    let json = serde_json::to_value(&fields).unwrap();
    assert_eq!(json[fx.revenue.to_string()], "READ_ONLY");

    let effective = view.effective(&erin).await;
    assert!(!effective.is_platform_admin);
    assert!(effective.system_permissions[&SystemPermission::ApiAccess]);
}

#[tokio::test]
async fn caller_views_fall_back_silently() {
    let fx = setup().await;
    fx.user("frank@acme.test", None).await;
    let view = MyPermissionsService::new(
        fx.resolver(AuthzConfig::default()),
        SurrealCollectionRepository::new(fx.db.clone()),
    );

    let stranger = fx.caller("nobody@acme.test", &[]);
    assert!(view.system(&stranger).await.is_empty());
    assert_eq!(view.objects(&stranger, "accounts").await, ObjectPermissions::NONE);
    assert!(view.fields(&stranger, "accounts").await.is_empty());

    let frank = fx.caller("frank@acme.test", &[]);
    assert_eq!(view.objects(&frank, "no_such_collection").await, ObjectPermissions::NONE);
    assert!(view.fields(&frank, &Uuid::new_v4().to_string()).await.is_empty());

    let tenantless = AuthenticatedCaller::new(None, "frank@acme.test", Vec::new());
    let effective = view.effective(&tenantless).await;
    assert!(effective.system_permissions.is_empty());
    assert!(!effective.is_platform_admin);
}

#[tokio::test]
async fn platform_admin_caller_skips_lookups() {
    let fx = setup().await;
    let view = MyPermissionsService::new(
        fx.resolver(AuthzConfig::default()),
        SurrealCollectionRepository::new(fx.db.clone()),
    );
    let admin = fx.caller("root@platform.test", &["ROLE_PLATFORM_ADMIN"]);

    assert_eq!(view.objects(&admin, "anything").await, ObjectPermissions::ALL);
    assert!(view.fields(&admin, "accounts").await.is_empty());
    let effective = view.effective(&admin).await;
    assert!(effective.is_platform_admin);
    assert_eq!(effective.system_permissions.len(), SystemPermission::ALL.len());
    assert!(effective.system_permissions.values().all(|granted| *granted));
}

// ---------------------------------------------------------------------------
// Record access
// ---------------------------------------------------------------------------

async fn record_access(
    fx: &Fixture,
) -> RecordAccessService<
    SurrealUserRepository<Db>,
    SurrealGroupRepository<Db>,
    SurrealPermissionSetRepository<Db>,
    SurrealGrantRepository<Db>,
    SurrealSharingRepository<Db>,
> {
    SurrealSharingRepository::new(fx.db.clone())
        .set_org_wide_default(fx.tenant_id, fx.accounts, InternalAccess::Private)
        .await
        .unwrap();
    RecordAccessService::new(
        fx.resolver(AuthzConfig::default()),
        SurrealSharingRepository::new(fx.db.clone()),
    )
}

#[tokio::test]
async fn private_records_are_reachable_by_owner_and_managers() {
    let fx = setup().await;
    fx.grant_object(
        GrantHolder::Profile(fx.profile_id),
        ObjectPermissions {
            can_delete: true,
            ..flags(true, true)
        },
    )
    .await;
    let access = record_access(&fx).await;

    let director = fx.user("director@acme.test", None).await;
    let lead = fx.user("lead@acme.test", Some(director)).await;
    let rep = fx.user("rep@acme.test", Some(lead)).await;
    let peer = fx.user("peer@acme.test", Some(lead)).await;

    let record = RecordRef {
        collection_id: fx.accounts,
        record_id: "acc-1",
        owner_id: Some(rep),
    };
    let check = |user| Principal::user(fx.tenant_id, user);

    assert!(access.can_access(&check(rep), record, AccessType::Delete).await.unwrap());
    assert!(access.can_access(&check(lead), record, AccessType::Edit).await.unwrap());
    assert!(access.can_access(&check(director), record, AccessType::Read).await.unwrap());
    assert!(!access.can_access(&check(peer), record, AccessType::Read).await.unwrap());

    let err = access
        .require_access(&check(peer), record, AccessType::Edit)
        .await
        .unwrap_err();
    assert!(matches!(err, KeelError::AuthorizationDenied { .. }));
}

#[tokio::test]
async fn shares_grant_read_or_read_write() {
    let fx = setup().await;
    fx.grant_object(GrantHolder::Profile(fx.profile_id), flags(true, true)).await;
    let access = record_access(&fx).await;

    let owner = fx.user("owner@acme.test", None).await;
    let reader = fx.user("reader@acme.test", None).await;
    let member = fx.user("member@acme.test", None).await;

    // member -> support -> services; the share targets services.
    let support = fx.group("support").await;
    let services = fx.group("services").await;
    fx.groups().add_member(fx.tenant_id, member, support).await.unwrap();
    fx.groups().add_nested_group(fx.tenant_id, services, support).await.unwrap();

    fx.share("acc-7", ShareTarget::User(reader), ShareAccessLevel::Read).await;
    fx.share("acc-7", ShareTarget::Group(services), ShareAccessLevel::ReadWrite).await;

    let record = RecordRef {
        collection_id: fx.accounts,
        record_id: "acc-7",
        owner_id: Some(owner),
    };
    let reader = Principal::user(fx.tenant_id, reader);
    let member = Principal::user(fx.tenant_id, member);

    assert!(access.can_access(&reader, record, AccessType::Read).await.unwrap());
    assert!(!access.can_access(&reader, record, AccessType::Edit).await.unwrap());
    assert!(access.can_access(&member, record, AccessType::Edit).await.unwrap());

    // Shares do not lift the object permission gate.
    assert!(!access.can_access(&member, record, AccessType::Delete).await.unwrap());

    let other = RecordRef {
        record_id: "acc-8",
        ..record
    };
    assert!(!access.can_access(&reader, other, AccessType::Read).await.unwrap());
}

#[tokio::test]
async fn sharing_rules_open_records_to_targeted_groups() {
    let fx = setup().await;
    fx.grant_object(GrantHolder::Profile(fx.profile_id), flags(true, true)).await;
    let access = record_access(&fx).await;

    let owner = fx.user("seller@acme.test", None).await;
    let member = fx.user("agent@acme.test", None).await;
    let outsider = fx.user("outsider@acme.test", None).await;

    // agent -> tier-1 -> support; rules target support.
    let tier_one = fx.group("tier-1").await;
    let support = fx.group("support").await;
    let sales = fx.group("sales").await;
    fx.groups().add_member(fx.tenant_id, member, tier_one).await.unwrap();
    fx.groups().add_nested_group(fx.tenant_id, support, tier_one).await.unwrap();
    fx.groups().add_member(fx.tenant_id, owner, sales).await.unwrap();

    let record = RecordRef {
        collection_id: fx.accounts,
        record_id: "acc-11",
        owner_id: Some(owner),
    };
    let member = Principal::user(fx.tenant_id, member);
    let outsider = Principal::user(fx.tenant_id, outsider);
    assert!(!access.can_access(&member, record, AccessType::Read).await.unwrap());

    let read_rule = fx
        .sharing_rule(
            "Sales accounts to support",
            SharingRuleType::OwnerBased,
            Some(sales),
            SharingRuleTarget::Group(support),
            ShareAccessLevel::Read,
        )
        .await;
    assert!(access.can_access(&member, record, AccessType::Read).await.unwrap());
    assert!(!access.can_access(&member, record, AccessType::Edit).await.unwrap());
    assert!(!access.can_access(&outsider, record, AccessType::Read).await.unwrap());

    // Owner outside the source group.
    let foreign = RecordRef {
        owner_id: Some(fx.user("partner@acme.test", None).await),
        ..record
    };
    assert!(!access.can_access(&member, foreign, AccessType::Read).await.unwrap());

    let sharing = SurrealSharingRepository::new(fx.db.clone());
    sharing
        .set_sharing_rule_active(fx.tenant_id, read_rule, false)
        .await
        .unwrap();
    assert!(!access.can_access(&member, record, AccessType::Read).await.unwrap());

    // Role targets reach every user of the tenant.
    fx.sharing_rule(
        "Everyone edits accounts",
        SharingRuleType::CriteriaBased,
        None,
        SharingRuleTarget::Role("Standard User".into()),
        ShareAccessLevel::ReadWrite,
    )
    .await;
    assert!(access.can_access(&outsider, record, AccessType::Edit).await.unwrap());
    assert!(!access.can_access(&outsider, record, AccessType::Delete).await.unwrap());
}

#[tokio::test]
async fn view_all_and_org_wide_defaults_open_records() {
    let fx = setup().await;
    let viewer_set = fx.permission_set("View All Accounts").await;
    fx.grant_object(GrantHolder::Profile(fx.profile_id), flags(true, true)).await;
    fx.grant_object(
        GrantHolder::PermissionSet(viewer_set),
        ObjectPermissions {
            can_view_all: true,
            ..ObjectPermissions::NONE
        },
    )
    .await;
    let access = record_access(&fx).await;

    let auditor = fx.user("auditor@acme.test", None).await;
    fx.permission_sets()
        .assign_to_user(fx.tenant_id, auditor, viewer_set)
        .await
        .unwrap();
    let auditor = Principal::user(fx.tenant_id, auditor);
    let record = RecordRef {
        collection_id: fx.accounts,
        record_id: "acc-9",
        owner_id: Some(Uuid::new_v4()),
    };

    assert!(access.can_access(&auditor, record, AccessType::Read).await.unwrap());
    assert!(!access.can_access(&auditor, record, AccessType::Edit).await.unwrap());

    SurrealSharingRepository::new(fx.db.clone())
        .set_org_wide_default(fx.tenant_id, fx.accounts, InternalAccess::PublicRead)
        .await
        .unwrap();
    let anyone = Principal::user(fx.tenant_id, fx.user("anyone@acme.test", None).await);
    assert!(access.can_access(&anyone, record, AccessType::Read).await.unwrap());
    assert!(!access.can_access(&anyone, record, AccessType::Edit).await.unwrap());

    SurrealSharingRepository::new(fx.db.clone())
        .set_org_wide_default(fx.tenant_id, fx.accounts, InternalAccess::PublicReadWrite)
        .await
        .unwrap();
    assert!(access.can_access(&anyone, record, AccessType::Edit).await.unwrap());
}

// ---------------------------------------------------------------------------
// Seeding
// ---------------------------------------------------------------------------

#[tokio::test]
async fn seeder_creates_default_profiles_with_complete_grants() {
    let fx = setup().await;
    let seeder = DefaultProfileSeeder::new(
        SurrealProfileRepository::new(fx.db.clone()),
        fx.grants(),
        SurrealCollectionRepository::new(fx.db.clone()),
    );

    // A fresh tenant: the fixture's "Standard User" would collide.
    let tenant_id = SurrealTenantRepository::new(fx.db.clone())
        .create(CreateTenant {
            name: "Globex".into(),
            slug: "globex".into(),
            metadata: None,
        })
        .await
        .unwrap()
        .id;
    let collections = SurrealCollectionRepository::new(fx.db.clone());
    let invoices = collections
        .create(CreateCollection {
            tenant_id,
            name: "invoices".into(),
            display_name: "Invoices".into(),
        })
        .await
        .unwrap()
        .id;

    let profiles = seeder.seed_default_profiles(tenant_id).await.unwrap();
    assert_eq!(profiles.len(), 7);
    assert!(profiles.iter().all(|p| p.is_system));

    for profile in &profiles {
        let grants = fx
            .grants()
            .get_holder_grants(tenant_id, GrantHolder::Profile(profile.id))
            .await
            .unwrap();
        assert_eq!(grants.system.len(), SystemPermission::ALL.len(), "{}", profile.name);

        let expected_objects = usize::from(profile.name != "Minimum Access");
        assert_eq!(grants.object.len(), expected_objects, "{}", profile.name);
        if profile.name == "Read Only" {
            let view_all = grants
                .system
                .iter()
                .find(|g| g.permission == SystemPermission::ViewAllData)
                .unwrap();
            assert!(view_all.granted);
            assert!(!grants.object[0].permissions.can_edit);
            assert_eq!(grants.object[0].collection_id, invoices);
        }
    }

    let quotes = collections
        .create(CreateCollection {
            tenant_id,
            name: "quotes".into(),
            display_name: "Quotes".into(),
        })
        .await
        .unwrap()
        .id;
    let written = seeder
        .seed_object_permissions_for_collection(tenant_id, quotes)
        .await
        .unwrap();
    assert_eq!(written, 6);

    let admin = SurrealProfileRepository::new(fx.db.clone())
        .get_by_name(tenant_id, "System Administrator")
        .await
        .unwrap();
    let admin_grants = fx
        .grants()
        .get_holder_grants(tenant_id, GrantHolder::Profile(admin.id))
        .await
        .unwrap();
    assert!(admin_grants.system.iter().all(|g| g.granted));
    assert!(
        admin_grants
            .object
            .iter()
            .any(|g| g.collection_id == quotes && g.permissions == ObjectPermissions::ALL)
    );
}
