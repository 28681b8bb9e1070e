//! OAuth connect flow through the public API

use std::sync::Arc;

use libpostline::config::Config;
use libpostline::credentials::CredentialStore;
use libpostline::network::mock::MockNetwork;
use libpostline::network::SocialNetwork;
use libpostline::Database;
use tempfile::TempDir;

async fn store_with(network: MockNetwork) -> (TempDir, CredentialStore) {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("test.db");
    let db = Arc::new(Database::new(db_path.to_str().unwrap()).await.unwrap());
    let shared: Arc<dyn SocialNetwork> = Arc::new(network);
    let store = CredentialStore::new(db, shared, Config::default_config().network);
    (tmp, store)
}

fn state_of(url: &str) -> String {
    url.split("state=").nth(1).unwrap().to_string()
}

#[tokio::test]
async fn connect_disconnect_reconnect_cycle() {
    let (_tmp, store) = store_with(MockNetwork::healthy()).await;

    // Connect
    let url = store.begin_authorization("user-1").await.unwrap();
    let cred = store
        .complete_authorization("user-1", "code", &state_of(&url))
        .await
        .unwrap();
    assert!(cred.is_active);
    assert_eq!(cred.external_id, "member-1");
    assert_eq!(cred.display_name.as_deref(), Some("Test Member"));

    // Disconnect
    store.disconnect("user-1").await.unwrap();
    assert!(store.get_active_credential("user-1").await.unwrap().is_none());

    // Reconnect rotates the token into a fresh active row
    let url = store.begin_authorization("user-1").await.unwrap();
    let renewed = store
        .complete_authorization("user-1", "code", &state_of(&url))
        .await
        .unwrap();
    assert!(renewed.is_active);
    assert_ne!(renewed.id, cred.id);
}

#[tokio::test]
async fn profile_fetch_failure_leaves_no_credential() {
    let (_tmp, store) = store_with(MockNetwork::profile_failure("upstream 500")).await;

    let url = store.begin_authorization("user-1").await.unwrap();
    let result = store
        .complete_authorization("user-1", "code", &state_of(&url))
        .await;

    assert!(result.is_err());
    assert!(
        store.get_active_credential("user-1").await.unwrap().is_none(),
        "exchange succeeded but profile failed: nothing may be persisted"
    );
}

#[tokio::test]
async fn users_are_isolated() {
    let (_tmp, store) = store_with(MockNetwork::healthy()).await;

    let url = store.begin_authorization("user-1").await.unwrap();
    store
        .complete_authorization("user-1", "code", &state_of(&url))
        .await
        .unwrap();

    assert!(store.get_active_credential("user-2").await.unwrap().is_none());

    // user-2 cannot complete with user-1's state
    let url = store.begin_authorization("user-1").await.unwrap();
    let foreign = store
        .complete_authorization("user-2", "code", &state_of(&url))
        .await;
    assert!(foreign.is_err());
}
