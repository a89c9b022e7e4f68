//! User service against a real store: hashing, staged updates and login.

mod support;

use common::{AppError, PageRequest};
use domain::{CredentialGuard, UpdateUser, User};
use store_service_lib::repository::{EntityRepository, UserRepository};
use store_service_lib::config::StoreServiceConfig;
use store_service_lib::service::UserService;

use crate::support::{fast_guard, open_store};

fn user(username: &str, credential: &str) -> User {
    User::new("Test User", username, credential, format!("{}@example.com", username))
}

#[tokio::test]
async fn test_create_stores_hashed_credential() {
    let store = open_store().await;
    let users = store.users(fast_guard());

    let created = users.create_user(user("alice", "secret1")).await.unwrap();
    assert!(created.id.is_some());
    assert_ne!(created.credential, "secret1");
    assert!(CredentialGuard::is_hashed(&created.credential));

    let stored = users.get_user(created.id.as_deref().unwrap()).await.unwrap();
    assert_eq!(stored.credential, created.credential);
    assert!(fast_guard().verify("secret1", &stored.credential).unwrap());

    let logged_in = users.login("alice", "secret1").await.unwrap();
    assert_eq!(logged_in.id, created.id);
}

#[tokio::test]
async fn test_login_rejects_wrong_credential() {
    let store = open_store().await;
    let users = store.users(fast_guard());
    users.create_user(user("alice", "secret1")).await.unwrap();

    let result = users.login("alice", "secret2").await;
    assert!(matches!(result, Err(AppError::InvalidCredentials)));

    let result = users.login("bob", "secret1").await;
    assert!(matches!(result, Err(AppError::InvalidCredentials)));
}

#[tokio::test]
async fn test_update_with_credential_rehashes() {
    let store = open_store().await;
    let users = store.users(fast_guard());
    let created = users.create_user(user("alice", "secret1")).await.unwrap();
    let id = created.id.clone().unwrap();

    let updated = users
        .update_user(
            &id,
            UpdateUser {
                credential: Some("secret2".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(CredentialGuard::is_hashed(&updated.credential));
    assert_ne!(updated.credential, created.credential);
    assert!(users.login("alice", "secret2").await.is_ok());
    assert!(matches!(
        users.login("alice", "secret1").await,
        Err(AppError::InvalidCredentials)
    ));
}

#[tokio::test]
async fn test_update_without_credential_keeps_hash() {
    let store = open_store().await;
    let users = store.users(fast_guard());
    let created = users.create_user(user("alice", "secret1")).await.unwrap();
    let id = created.id.clone().unwrap();

    let updated = users
        .update_user(
            &id,
            UpdateUser {
                city: Some("Lisbon".to_string()),
                age: Some(41),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.credential, created.credential);
    assert_eq!(updated.city.as_deref(), Some("Lisbon"));
    assert_eq!(updated.age, 41);
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.created_date, created.created_date);
    assert!(users.login("alice", "secret1").await.is_ok());
}

#[tokio::test]
async fn test_update_missing_user_writes_nothing() {
    let store = open_store().await;
    let users = store.users(fast_guard());

    let result = users
        .update_user(
            "missing-id",
            UpdateUser {
                name: Some("Ghost".to_string()),
                ..Default::default()
            },
        )
        .await;

    assert!(matches!(result, Err(AppError::NotFound(ref id)) if id == "missing-id"));
    let repo: EntityRepository<User> = store.repository();
    assert!(UserRepository::find_by_id(&repo, "missing-id").await.unwrap().is_none());
}

#[tokio::test]
async fn test_update_rejects_unknown_status() {
    let store = open_store().await;
    let users = store.users(fast_guard());
    let created = users.create_user(user("alice", "secret1")).await.unwrap();
    let id = created.id.clone().unwrap();

    let result = users
        .update_user(
            &id,
            UpdateUser {
                status: Some("ASLEEP".to_string()),
                name: Some("Renamed".to_string()),
                ..Default::default()
            },
        )
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(users.get_user(&id).await.unwrap().name, "Test User");
}

#[tokio::test]
async fn test_delete_user() {
    let store = open_store().await;
    let users = store.users(fast_guard());
    let created = users.create_user(user("alice", "secret1")).await.unwrap();
    let id = created.id.clone().unwrap();

    users.delete_user(&id).await.unwrap();
    assert!(matches!(users.get_user(&id).await, Err(AppError::NotFound(_))));

    let again = users.delete_user(&id).await;
    assert!(matches!(again, Err(AppError::NotFound(ref missing)) if *missing == id));
}

#[tokio::test]
async fn test_create_with_preset_id_never_overwrites() {
    let store = open_store().await;
    let users = store.users(fast_guard());

    let mut first = user("alice", "secret1");
    first.id = Some("fixed-id".to_string());
    let created = users.create_user(first).await.unwrap();
    assert_eq!(created.id.as_deref(), Some("fixed-id"));

    let mut second = user("bob", "secret2");
    second.id = Some("fixed-id".to_string());
    let result = users.create_user(second).await;
    assert!(matches!(result, Err(AppError::Database(_))));

    let stored = users.get_user("fixed-id").await.unwrap();
    assert_eq!(stored.username, "alice");
}

#[tokio::test]
async fn test_create_rejects_taken_username() {
    let store = open_store().await;
    let users = store.users(fast_guard());
    users.create_user(user("alice", "secret1")).await.unwrap();

    let result = users.create_user(user("alice", "secret2")).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(users.user_ids().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_requires_credential() {
    let store = open_store().await;
    let users = store.users(fast_guard());

    let result = users.create_user(user("alice", "")).await;
    assert!(matches!(result, Err(AppError::Validation(ref m)) if m == "credential required"));
    assert!(users.list_users(PageRequest::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_and_ids_follow_creation_order() {
    let store = open_store().await;
    let users = store.users(fast_guard());
    let a = users.create_user(user("alice", "secret1")).await.unwrap();
    let b = users.create_user(user("bob", "secret2")).await.unwrap();

    let ids = users.user_ids().await.unwrap();
    assert_eq!(ids, vec![a.id.clone().unwrap(), b.id.clone().unwrap()]);

    let page = users.list_users(PageRequest::new(1, 1)).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, b.id);
}

#[tokio::test]
async fn test_configured_hash_cost_reaches_store() {
    let store = open_store().await;
    let config = StoreServiceConfig {
        profile: "mock".to_string(),
        hash_memory_kib: Some(2048),
        hash_iterations: Some(1),
        hash_parallelism: Some(1),
    };
    let users = store.users(config.credential_guard().unwrap());

    let created = users.create_user(user("alice", "secret1")).await.unwrap();
    let stored = users.get_user(created.id.as_deref().unwrap()).await.unwrap();

    assert!(stored.credential.contains("m=2048,t=1,p=1"));
    assert!(users.login("alice", "secret1").await.is_ok());
}
