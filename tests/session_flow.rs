use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as Span, Utc};

use tickly::api::{Backends, MockBackend};
use tickly::auth::{AuthService, Route};
use tickly::jwt;
use tickly::model::{Address, JwtPayload, LoginCredentials, StructureDraft};
use tickly::notification::MemoryNotifier;
use tickly::search::PageLimits;
use tickly::storage::{FileStorage, MemoryStorage, SessionStore, Storage, TOKEN_KEY};

fn store_at(path: &Path) -> Arc<SessionStore> {
    Arc::new(SessionStore::new(
        Box::new(FileStorage::open(path).unwrap()),
        Box::new(MemoryStorage::new()),
    ))
}

fn client(store: Arc<SessionStore>) -> (AuthService, Backends) {
    let mock = Arc::new(
        MockBackend::with_fixtures(Duration::ZERO, PageLimits::default()).with_session(store.clone()),
    );
    let backends = Backends::all(mock);
    let auth = AuthService::new(backends.auth.clone(), store, Arc::new(MemoryNotifier::new()));
    (auth, backends)
}

fn credentials(email: &str, password: &str) -> LoginCredentials {
    LoginCredentials {
        email: email.into(),
        password: password.into(),
    }
}

#[tokio::test]
async fn kept_session_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("persistent.json");

    let (auth, _) = client(store_at(&path));
    let route = auth
        .login(&credentials("admin@example.com", "rootroot"), true)
        .await
        .unwrap();
    assert_eq!(route, Route::Admin);
    auth.clear_session_if_not_kept().unwrap();

    let (restarted, _) = client(store_at(&path));
    let user = restarted.restore(Utc::now()).unwrap().unwrap();
    assert_eq!(user.sub(), "admin@example.com");
    assert_eq!(restarted.structure_id(), Some(1));
}

#[tokio::test]
async fn unkept_session_ends_with_the_process() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("persistent.json");

    let (auth, _) = client(store_at(&path));
    auth.login(&credentials("lucie.moreau@example.com", "password123"), false)
        .await
        .unwrap();
    assert!(auth.token().unwrap().is_some());
    auth.clear_session_if_not_kept().unwrap();
    assert!(!auth.is_logged_in());

    let (restarted, _) = client(store_at(&path));
    assert!(restarted.restore(Utc::now()).unwrap().is_none());
}

#[tokio::test]
async fn expired_token_wipes_storage() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("persistent.json");
    let store = store_at(&path);

    let claims = JwtPayload::new("lucie.moreau@example.com", 3, "SPECTATOR");
    let stale = jwt::issue_mock_token(claims, Utc::now() - Span::days(2)).unwrap();
    store.set_keep_logged_in(true).unwrap();
    store.persistent().set(TOKEN_KEY, &stale).unwrap();

    let (auth, _) = client(store);
    assert!(auth.restore(Utc::now()).unwrap().is_none());

    let reopened = FileStorage::open(&path).unwrap();
    assert_eq!(reopened.get(TOKEN_KEY).unwrap(), None);
    assert!(auth.ensure_fresh(Utc::now()).is_err());
}

#[tokio::test]
async fn logout_keeps_the_preference() {
    let store = Arc::new(SessionStore::in_memory());
    let (auth, _) = client(store.clone());
    auth.login(&credentials("admin@example.com", "rootroot"), true)
        .await
        .unwrap();

    assert_eq!(auth.logout().unwrap(), Route::Home);
    assert!(store.token().unwrap().is_none());
    assert!(store.keep_logged_in().unwrap());
}

#[tokio::test]
async fn new_administrator_sets_up_a_structure() {
    let store = Arc::new(SessionStore::in_memory());
    let (auth, backends) = client(store);

    let route = auth
        .login(&credentials("nina.roux@example.com", "password123"), false)
        .await
        .unwrap();
    assert_eq!(route, Route::CreateStructure);
    assert_eq!(auth.structure_id(), None);

    let draft = StructureDraft {
        name: "La Cigale".into(),
        type_ids: vec![1],
        description: None,
        address: Address {
            country: "France".into(),
            city: "Paris".into(),
            street: "Boulevard de Rochechouart".into(),
            number: Some("120".into()),
            zip_code: Some("75018".into()),
        },
        phone: None,
        email: None,
        website_url: None,
        socials_url: vec![],
    };
    let created = backends.structures.create_structure(&draft).await.unwrap();
    let route = auth.update_token(&created.new_token).unwrap();

    assert_eq!(route, Route::Admin);
    assert_eq!(auth.structure_id(), Some(5));
    assert!(!auth.current_user().unwrap().needs_setup());
}

#[tokio::test]
async fn structure_creation_requires_a_session() {
    let (_, backends) = client(Arc::new(SessionStore::in_memory()));
    let draft = StructureDraft {
        name: "Sans compte".into(),
        type_ids: vec![],
        description: None,
        address: Address {
            city: "Lyon".into(),
            ..Address::default()
        },
        phone: None,
        email: None,
        website_url: None,
        socials_url: vec![],
    };
    let err = backends.structures.create_structure(&draft).await.unwrap_err();
    assert!(err.is_status(401));
}
