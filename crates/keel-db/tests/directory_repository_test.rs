//! Integration tests for tenants, users, collections, OIDC providers and
//! sharing rows using in-memory SurrealDB.

use keel_core::models::collection::{CreateCollection, CreateField};
use keel_core::models::oidc_provider::CreateOidcProvider;
use keel_core::models::profile::CreateProfile;
use keel_core::models::group::CreateGroup;
use keel_core::models::sharing::{
    CreateRecordShare, CreateSharingRule, InternalAccess, ShareAccessLevel, ShareTarget,
    SharingRuleTarget, SharingRuleType,
};
use keel_core::models::tenant::{CreateTenant, UpdateTenant};
use keel_core::models::user::{CreateUser, UpdateUser, UserStatus};
use keel_core::repository::{
    CollectionRepository, GroupRepository, OidcProviderRepository, Pagination, ProfileRepository,
    SharingRepository, TenantRepository, UserRepository,
};
use keel_db::repository::{
    SurrealCollectionRepository, SurrealGroupRepository, SurrealOidcProviderRepository,
    SurrealProfileRepository,
    SurrealSharingRepository, SurrealTenantRepository, SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> (Surreal<Db>, Uuid, Uuid) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    keel_db::run_migrations(&db).await.unwrap();

    let tenant = SurrealTenantRepository::new(db.clone())
        .create(CreateTenant {
            name: "Test Tenant".into(),
            slug: "test-tenant".into(),
            metadata: None,
        })
        .await
        .unwrap();

    let profile = SurrealProfileRepository::new(db.clone())
        .create(CreateProfile {
            tenant_id: tenant.id,
            name: "Standard User".into(),
            description: String::new(),
            is_system: true,
        })
        .await
        .unwrap();

    (db, tenant.id, profile.id)
}

#[tokio::test]
async fn tenant_lookup_by_slug_and_update() {
    let (db, tenant_id, _) = setup().await;
    let repo = SurrealTenantRepository::new(db);

    let by_slug = repo.get_by_slug("test-tenant").await.unwrap();
    assert_eq!(by_slug.id, tenant_id);

    let updated = repo
        .update(
            tenant_id,
            UpdateTenant {
                name: Some("Renamed".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Renamed");
    assert_eq!(updated.slug, "test-tenant");

    let page = repo.list(Pagination::default()).await.unwrap();
    assert_eq!(page.total, 1);
    assert!(repo.get_by_slug("missing").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn users_carry_profile_and_manager() {
    let (db, tenant_id, profile_id) = setup().await;
    let repo = SurrealUserRepository::new(db);

    let manager = repo
        .create(CreateUser {
            tenant_id,
            username: "maria".into(),
            email: "maria@example.com".into(),
            profile_id,
            manager_id: None,
            metadata: None,
        })
        .await
        .unwrap();
    assert_eq!(manager.status, UserStatus::Active);
    assert_eq!(manager.manager_id, None);

    let report = repo
        .create(CreateUser {
            tenant_id,
            username: "rob".into(),
            email: "rob@example.com".into(),
            profile_id,
            manager_id: Some(manager.id),
            metadata: None,
        })
        .await
        .unwrap();

    let fetched = repo
        .get_by_email(tenant_id, "rob@example.com")
        .await
        .unwrap();
    assert_eq!(fetched.id, report.id);
    assert_eq!(fetched.manager_id, Some(manager.id));
    assert_eq!(fetched.profile_id, profile_id);

    let cleared = repo
        .update(
            tenant_id,
            report.id,
            UpdateUser {
                manager_id: Some(None),
                status: Some(UserStatus::Locked),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(cleared.manager_id, None);
    assert_eq!(cleared.status, UserStatus::Locked);

    let err = repo
        .get_by_email(Uuid::new_v4(), "rob@example.com")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn collections_resolve_by_name_and_list_fields() {
    let (db, tenant_id, _) = setup().await;
    let repo = SurrealCollectionRepository::new(db);

    let accounts = repo
        .create(CreateCollection {
            tenant_id,
            name: "accounts".into(),
            display_name: "Accounts".into(),
        })
        .await
        .unwrap();
    assert!(accounts.active);

    for name in ["revenue", "name"] {
        repo.add_field(CreateField {
            tenant_id,
            collection_id: accounts.id,
            name: name.into(),
        })
        .await
        .unwrap();
    }

    let by_name = repo.get_by_name(tenant_id, "accounts").await.unwrap();
    assert_eq!(by_name.id, accounts.id);

    let fields: Vec<String> = repo
        .list_fields(tenant_id, accounts.id)
        .await
        .unwrap()
        .into_iter()
        .map(|f| f.name)
        .collect();
    assert_eq!(fields, vec!["name", "revenue"]);

    assert_eq!(repo.list_active(tenant_id).await.unwrap().len(), 1);
    assert!(
        repo.get_by_name(tenant_id, "contacts")
            .await
            .unwrap_err()
            .is_not_found()
    );
}

#[tokio::test]
async fn oidc_provider_lookup_by_issuer() {
    let (db, tenant_id, _) = setup().await;
    let repo = SurrealOidcProviderRepository::new(db);

    let created = repo
        .create(CreateOidcProvider {
            tenant_id,
            name: "Corporate SSO".into(),
            issuer: "https://sso.example.com/realms/acme".into(),
            roles_claim: Some("realm_access.roles".into()),
            roles_mapping: Some(r#"{"admin":"PLATFORM_ADMIN"}"#.into()),
        })
        .await
        .unwrap();
    assert!(created.active);

    let fetched = repo
        .get_by_issuer("https://sso.example.com/realms/acme")
        .await
        .unwrap();
    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.roles_claim.as_deref(), Some("realm_access.roles"));

    assert_eq!(repo.list_active(tenant_id).await.unwrap().len(), 1);
    assert!(
        repo.get_by_issuer("https://other.example.com")
            .await
            .unwrap_err()
            .is_not_found()
    );
}

#[tokio::test]
async fn org_wide_default_is_replaced() {
    let (db, tenant_id, _) = setup().await;
    let collection = SurrealCollectionRepository::new(db.clone())
        .create(CreateCollection {
            tenant_id,
            name: "accounts".into(),
            display_name: "Accounts".into(),
        })
        .await
        .unwrap();
    let repo = SurrealSharingRepository::new(db);

    assert!(
        repo.get_org_wide_default(tenant_id, collection.id)
            .await
            .unwrap()
            .is_none()
    );

    repo.set_org_wide_default(tenant_id, collection.id, InternalAccess::PublicRead)
        .await
        .unwrap();
    let owd = repo
        .set_org_wide_default(tenant_id, collection.id, InternalAccess::Private)
        .await
        .unwrap();
    assert_eq!(owd.internal_access, InternalAccess::Private);

    let fetched = repo
        .get_org_wide_default(tenant_id, collection.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fetched.internal_access, InternalAccess::Private);
}

#[tokio::test]
async fn record_shares_are_listed_per_record() {
    let (db, tenant_id, _) = setup().await;
    let collection = SurrealCollectionRepository::new(db.clone())
        .create(CreateCollection {
            tenant_id,
            name: "accounts".into(),
            display_name: "Accounts".into(),
        })
        .await
        .unwrap();
    let repo = SurrealSharingRepository::new(db);
    let owner = Uuid::new_v4();
    let target = Uuid::new_v4();

    let share = repo
        .create_record_share(CreateRecordShare {
            tenant_id,
            collection_id: collection.id,
            record_id: "acc-1".into(),
            shared_with: ShareTarget::User(target),
            access_level: ShareAccessLevel::ReadWrite,
            reason: Some("account team".into()),
            created_by: owner,
        })
        .await
        .unwrap();
    assert_eq!(share.record_id, "acc-1");
    assert_eq!(share.shared_with, ShareTarget::User(target));

    repo.create_record_share(CreateRecordShare {
        tenant_id,
        collection_id: collection.id,
        record_id: "acc-2".into(),
        shared_with: ShareTarget::Group(Uuid::new_v4()),
        access_level: ShareAccessLevel::Read,
        reason: None,
        created_by: owner,
    })
    .await
    .unwrap();

    let shares = repo
        .list_record_shares(tenant_id, collection.id, "acc-1")
        .await
        .unwrap();
    assert_eq!(shares.len(), 1);
    assert_eq!(shares[0].access_level, ShareAccessLevel::ReadWrite);
    assert_eq!(shares[0].reason.as_deref(), Some("account team"));

    repo.delete_record_share(tenant_id, share.id).await.unwrap();
    assert!(
        repo.list_record_shares(tenant_id, collection.id, "acc-1")
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn sharing_rules_are_listed_while_active() {
    let (db, tenant_id, _) = setup().await;
    let collection = SurrealCollectionRepository::new(db.clone())
        .create(CreateCollection {
            tenant_id,
            name: "accounts".into(),
            display_name: "Accounts".into(),
        })
        .await
        .unwrap();
    let group = SurrealGroupRepository::new(db.clone())
        .create(CreateGroup {
            tenant_id,
            name: "support".into(),
            description: String::new(),
            metadata: None,
        })
        .await
        .unwrap();
    let repo = SurrealSharingRepository::new(db);

    let rule = |name: &str, shared_to: SharingRuleTarget| CreateSharingRule {
        tenant_id,
        collection_id: collection.id,
        name: name.into(),
        rule_type: SharingRuleType::OwnerBased,
        shared_from: None,
        shared_to,
        access_level: ShareAccessLevel::Read,
        criteria: None,
    };

    let support = repo
        .create_sharing_rule(rule("support reads", SharingRuleTarget::Group(group.id)))
        .await
        .unwrap();
    assert!(support.active);
    assert_eq!(support.shared_to, SharingRuleTarget::Group(group.id));
    let everyone = repo
        .create_sharing_rule(rule("everyone", SharingRuleTarget::Role("employee".into())))
        .await
        .unwrap();

    // Targets must be groups of the same tenant.
    let err = repo
        .create_sharing_rule(rule("ghost", SharingRuleTarget::Queue(Uuid::new_v4())))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let dup = repo
        .create_sharing_rule(rule("everyone", SharingRuleTarget::Role("employee".into())))
        .await;
    assert!(dup.is_err(), "rule names are unique per collection");

    let paused = repo
        .set_sharing_rule_active(tenant_id, everyone.id, false)
        .await
        .unwrap();
    assert!(!paused.active);

    let active = repo
        .list_active_sharing_rules(tenant_id, collection.id)
        .await
        .unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, support.id);

    repo.delete_sharing_rule(tenant_id, support.id).await.unwrap();
    assert!(
        repo.list_active_sharing_rules(tenant_id, collection.id)
            .await
            .unwrap()
            .is_empty()
    );
}
