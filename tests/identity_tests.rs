//! Identity store and authenticator tests

use roleguard::auth::{Authenticator, IdentityAuthenticator};
use roleguard::error::{AuthError, IdentityError};
use roleguard::identity::{IdentityStore, InMemoryIdentityStore, Partition};
use roleguard::util::SecretString;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

fn store_with_manager() -> Arc<InMemoryIdentityStore> {
    let store = Arc::new(InMemoryIdentityStore::new(Partition::default()));
    store.create_role("Manager").unwrap();
    store
        .add_user("picketlink", SecretString::new("picketlink"))
        .unwrap();
    store.grant_role("picketlink", "Manager").unwrap();
    store
}

#[test]
fn test_create_role() {
    let store = InMemoryIdentityStore::new(Partition::default());
    let before = SystemTime::now();

    let role = store.create_role("Manager").unwrap();

    assert!(!role.id.is_empty());
    assert_eq!(role.name, "Manager");
    assert_eq!(role.partition.name, "default");
    assert!(role.enabled);
    assert!(role.expiration_date.is_none());
    assert!(role.created_date >= before);
    assert!(role.created_date <= SystemTime::now());
    assert_eq!(store.get_role("Manager"), Some(role));
}

#[test]
fn test_duplicate_role_rejected() {
    let store = InMemoryIdentityStore::new(Partition::default());
    store.create_role("Manager").unwrap();

    assert!(matches!(
        store.create_role("Manager"),
        Err(IdentityError::DuplicateRole(_))
    ));
}

#[test]
fn test_remove_role() {
    let store = store_with_manager();
    let role = store.get_role("Manager").unwrap();

    store.remove_role(&role).unwrap();

    assert!(store.get_role("Manager").is_none());
    assert!(!store.has_role("picketlink", "Manager"));
}

#[test]
fn test_disabled_role_grants_nothing() {
    let store = store_with_manager();
    let mut role = store.get_role("Manager").unwrap();

    role.enabled = false;
    store.update_role(&role).unwrap();

    assert!(!store.get_role("Manager").unwrap().enabled);
    assert!(store.effective_roles("picketlink").is_empty());
}

#[test]
fn test_expired_role_grants_nothing() {
    let store = store_with_manager();
    let mut role = store.get_role("Manager").unwrap();

    role.expiration_date = Some(SystemTime::now() - Duration::from_secs(60));
    store.update_role(&role).unwrap();

    assert!(!store.has_role("picketlink", "Manager"));
}

#[tokio::test]
async fn test_authenticator_fills_roles() {
    let authenticator = IdentityAuthenticator::new(store_with_manager());

    let principal = authenticator
        .authenticate("picketlink", "picketlink")
        .await
        .unwrap();

    assert!(principal.authenticated);
    assert_eq!(principal.id, "picketlink");
    assert!(principal.has_role("Manager"));
}

#[tokio::test]
async fn test_authenticator_rejects_bad_password() {
    let authenticator = IdentityAuthenticator::new(store_with_manager());

    let result = authenticator.authenticate("picketlink", "nope").await;
    assert_eq!(result.unwrap_err(), AuthError::InvalidCredentials);
}

#[tokio::test]
async fn test_authenticator_rejects_disabled_user() {
    let store = store_with_manager();
    store.set_user_enabled("picketlink", false).unwrap();
    let authenticator = IdentityAuthenticator::new(store);

    let result = authenticator.authenticate("picketlink", "picketlink").await;
    assert!(matches!(result, Err(AuthError::AccountDisabled(_))));
}
