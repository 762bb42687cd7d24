//! Integration tests for Group repository using in-memory SurrealDB.

use keel_core::models::group::{CreateGroup, UpdateGroup};
use keel_core::models::profile::CreateProfile;
use keel_core::models::tenant::CreateTenant;
use keel_core::models::user::CreateUser;
use keel_core::repository::{
    GroupRepository, Pagination, ProfileRepository, TenantRepository, UserRepository,
};
use keel_db::repository::{
    SurrealGroupRepository, SurrealProfileRepository, SurrealTenantRepository,
    SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

/// Helper: spin up in-memory DB, run migrations, create tenant + 2 users.
async fn setup() -> (
    Surreal<Db>,
    Uuid, // tenant_id
    Uuid, // user_a_id
    Uuid, // user_b_id
) {
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

    let user_repo = SurrealUserRepository::new(db.clone());
    let mut user_ids = Vec::new();
    for name in ["alice", "bob"] {
        let user = user_repo
            .create(CreateUser {
                tenant_id: tenant.id,
                username: name.into(),
                email: format!("{name}@example.com"),
                profile_id: profile.id,
                manager_id: None,
                metadata: None,
            })
            .await
            .unwrap();
        user_ids.push(user.id);
    }

    (db, tenant.id, user_ids[0], user_ids[1])
}

async fn group(repo: &SurrealGroupRepository<Db>, tenant_id: Uuid, name: &str) -> Uuid {
    repo.create(CreateGroup {
        tenant_id,
        name: name.into(),
        description: format!("{name} group"),
        metadata: None,
    })
    .await
    .unwrap()
    .id
}

#[tokio::test]
async fn create_get_and_update_group() {
    let (db, tenant_id, _, _) = setup().await;
    let repo = SurrealGroupRepository::new(db);

    let id = group(&repo, tenant_id, "engineering").await;
    let fetched = repo.get_by_id(tenant_id, id).await.unwrap();
    assert_eq!(fetched.name, "engineering");
    assert_eq!(fetched.tenant_id, tenant_id);

    let updated = repo
        .update(
            tenant_id,
            id,
            UpdateGroup {
                description: Some("builds things".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "engineering");
    assert_eq!(updated.description, "builds things");
}

#[tokio::test]
async fn get_group_from_other_tenant_is_not_found() {
    let (db, tenant_id, _, _) = setup().await;
    let repo = SurrealGroupRepository::new(db);

    let id = group(&repo, tenant_id, "engineering").await;
    let err = repo.get_by_id(Uuid::new_v4(), id).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn list_groups_is_paginated() {
    let (db, tenant_id, _, _) = setup().await;
    let repo = SurrealGroupRepository::new(db);

    for name in ["a", "b", "c"] {
        group(&repo, tenant_id, name).await;
    }

    let page = repo
        .list(
            tenant_id,
            Pagination {
                offset: 0,
                limit: 2,
            },
        )
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 2);
}

#[tokio::test]
async fn membership_edges_are_idempotent() {
    let (db, tenant_id, alice, bob) = setup().await;
    let repo = SurrealGroupRepository::new(db);
    let eng = group(&repo, tenant_id, "engineering").await;

    repo.add_member(tenant_id, alice, eng).await.unwrap();
    repo.add_member(tenant_id, alice, eng).await.unwrap();
    repo.add_member(tenant_id, bob, eng).await.unwrap();

    let mut members = repo.get_member_user_ids(tenant_id, eng).await.unwrap();
    members.sort();
    let mut expected = vec![alice, bob];
    expected.sort();
    assert_eq!(members, expected);

    assert_eq!(
        repo.get_user_group_ids(tenant_id, alice).await.unwrap(),
        vec![eng]
    );

    repo.remove_member(tenant_id, alice, eng).await.unwrap();
    assert!(
        repo.get_user_group_ids(tenant_id, alice)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn add_member_rejects_unknown_user() {
    let (db, tenant_id, _, _) = setup().await;
    let repo = SurrealGroupRepository::new(db);
    let eng = group(&repo, tenant_id, "engineering").await;

    let err = repo
        .add_member(tenant_id, Uuid::new_v4(), eng)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn nested_group_edges_point_child_to_parent() {
    let (db, tenant_id, _, _) = setup().await;
    let repo = SurrealGroupRepository::new(db);
    let parent = group(&repo, tenant_id, "all-staff").await;
    let child = group(&repo, tenant_id, "engineering").await;

    repo.add_nested_group(tenant_id, parent, child).await.unwrap();

    assert_eq!(
        repo.get_parent_group_ids(tenant_id, child).await.unwrap(),
        vec![parent]
    );
    assert_eq!(
        repo.get_child_group_ids(tenant_id, parent).await.unwrap(),
        vec![child]
    );
    assert!(
        repo.get_parent_group_ids(tenant_id, parent)
            .await
            .unwrap()
            .is_empty()
    );

    repo.remove_nested_group(tenant_id, parent, child)
        .await
        .unwrap();
    assert!(
        repo.get_child_group_ids(tenant_id, parent)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn delete_group_drops_its_edges() {
    let (db, tenant_id, alice, _) = setup().await;
    let repo = SurrealGroupRepository::new(db);
    let parent = group(&repo, tenant_id, "all-staff").await;
    let child = group(&repo, tenant_id, "engineering").await;

    repo.add_member(tenant_id, alice, child).await.unwrap();
    repo.add_nested_group(tenant_id, parent, child).await.unwrap();

    repo.delete(tenant_id, child).await.unwrap();

    assert!(repo.get_by_id(tenant_id, child).await.unwrap_err().is_not_found());
    assert!(
        repo.get_user_group_ids(tenant_id, alice)
            .await
            .unwrap()
            .is_empty()
    );
    assert!(
        repo.get_child_group_ids(tenant_id, parent)
            .await
            .unwrap()
            .is_empty()
    );
}
