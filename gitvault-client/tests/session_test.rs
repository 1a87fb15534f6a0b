//! Session manager: renewal, retry and sign-out behaviour against a scripted
//! transport.

mod common;

use common::{bearer, fail, ok, principal, signed_in_store, MockTransport, FRESH_TOKEN, STALE_TOKEN};
use gitvault_client::gitvault_core::VaultError;
use gitvault_client::services::session::{LOGIN_PATH, LOGOUT_PATH, REFRESH_PATH};
use gitvault_client::services::{
    ApiRequest, CredentialStore, MemoryCredentialStore, SessionEvent, SessionManager,
    SignOutReason,
};
use http::StatusCode;
use secrecy::ExposeSecret;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;

const REPOS: &str = "/repos/my";

/// Accepts only the fresh credential on `/repos/my`; refresh hands it out.
fn renewing_server(request: &ApiRequest) -> Result<gitvault_client::services::ApiResponse, VaultError> {
    match request.path.as_str() {
        REFRESH_PATH => ok(json!({"accessToken": FRESH_TOKEN})),
        REPOS if bearer(request).as_deref() == Some(FRESH_TOKEN) => ok(json!([])),
        REPOS => fail(401, "jwt expired"),
        LOGOUT_PATH => ok(json!({})),
        _ => fail(404, "not found"),
    }
}

#[tokio::test]
async fn concurrent_401s_share_one_renewal() {
    let transport = Arc::new(
        MockTransport::new(renewing_server).with_delay(REFRESH_PATH, Duration::from_millis(50)),
    );
    let store = signed_in_store("u1", STALE_TOKEN);
    let session = SessionManager::new(transport.clone(), store.clone());

    let requests = (0..5).map(|_| session.send(ApiRequest::get(REPOS)));
    let responses = futures::future::join_all(requests).await;

    for response in responses {
        assert_eq!(response.unwrap().status, StatusCode::OK);
    }
    assert_eq!(transport.calls_to(REFRESH_PATH), 1);
    assert_eq!(transport.calls_to(REPOS), 10);
    assert_eq!(store.access_token().unwrap().expose_secret(), FRESH_TOKEN);

    // Each logical request keeps its id across the retry.
    let mut per_request: HashMap<String, usize> = HashMap::new();
    for call in transport.calls().iter().filter(|c| c.path == REPOS) {
        *per_request.entry(call.request_id.clone()).or_default() += 1;
    }
    assert_eq!(per_request.len(), 5);
    assert!(per_request.values().all(|count| *count == 2));
}

#[tokio::test]
async fn request_is_retried_at_most_once() {
    let transport = Arc::new(MockTransport::new(|request| match request.path.as_str() {
        REFRESH_PATH => ok(json!({"accessToken": FRESH_TOKEN})),
        _ => fail(401, "still unauthorized"),
    }));
    let session = SessionManager::new(transport.clone(), signed_in_store("u1", STALE_TOKEN));

    let response = session.send(ApiRequest::get(REPOS)).await.unwrap();

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.into_data::<serde_json::Value>().unwrap_err(),
        VaultError::Unauthorized("still unauthorized".to_string())
    );
    assert_eq!(transport.calls_to(REPOS), 2);
    assert_eq!(transport.calls_to(REFRESH_PATH), 1);
    let retry = transport.calls().into_iter().filter(|c| c.path == REPOS).last().unwrap();
    assert_eq!(bearer(&retry).as_deref(), Some(FRESH_TOKEN));
    assert!(session.is_authenticated());
}

#[tokio::test]
async fn refresh_carries_no_bearer() {
    let transport = Arc::new(MockTransport::new(renewing_server));
    let session = SessionManager::new(transport.clone(), signed_in_store("u1", STALE_TOKEN));

    session.send(ApiRequest::get(REPOS)).await.unwrap();

    let refresh = transport
        .calls()
        .into_iter()
        .find(|c| c.path == REFRESH_PATH)
        .unwrap();
    assert!(refresh.bearer.is_none());
    assert!(!refresh.renewable);
}

#[tokio::test]
async fn failed_renewal_is_shared_and_forces_sign_out() {
    let transport = Arc::new(
        MockTransport::new(|request| match request.path.as_str() {
            REFRESH_PATH => fail(401, "refresh token expired"),
            _ => fail(401, "jwt expired"),
        })
        .with_delay(REFRESH_PATH, Duration::from_millis(30)),
    );
    let store = signed_in_store("u1", STALE_TOKEN);
    let session = SessionManager::new(transport.clone(), store.clone());
    let mut events = session.subscribe();

    let requests = (0..3).map(|_| session.send(ApiRequest::get(REPOS)));
    let results = futures::future::join_all(requests).await;

    for result in results {
        assert_eq!(result.unwrap_err(), VaultError::SessionExpired);
    }
    assert_eq!(transport.calls_to(REFRESH_PATH), 1);
    assert!(store.session().is_none());
    assert!(session.principal().is_none());
    assert_eq!(
        events.try_recv().unwrap(),
        SessionEvent::SignedOut {
            reason: SignOutReason::Expired
        }
    );
    assert_eq!(events.try_recv().unwrap_err(), TryRecvError::Empty);
}

#[tokio::test]
async fn network_failure_during_renewal_signs_out() {
    let transport = Arc::new(MockTransport::new(|request| match request.path.as_str() {
        REFRESH_PATH => Err(VaultError::Network("connection reset".to_string())),
        _ => fail(401, "jwt expired"),
    }));
    let session = SessionManager::new(transport.clone(), signed_in_store("u1", STALE_TOKEN));

    let err = session.send(ApiRequest::get(REPOS)).await.unwrap_err();

    assert_eq!(err, VaultError::SessionExpired);
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn renewal_failure_is_idempotent() {
    let transport = Arc::new(MockTransport::new(|_| fail(401, "refresh token expired")));
    let session = SessionManager::new(transport.clone(), signed_in_store("u1", STALE_TOKEN));
    let mut events = session.subscribe();

    assert_eq!(session.renew().await.unwrap_err(), VaultError::SessionExpired);
    assert_eq!(session.renew().await.unwrap_err(), VaultError::SessionExpired);

    assert_eq!(transport.calls_to(REFRESH_PATH), 1);
    assert!(!session.is_authenticated());
    assert!(events.try_recv().is_ok());
    assert_eq!(events.try_recv().unwrap_err(), TryRecvError::Empty);
}

#[tokio::test]
async fn sign_out_clears_state_when_server_errors() {
    let transport = Arc::new(MockTransport::new(|_| fail(500, "logout exploded")));
    let store = signed_in_store("u1", STALE_TOKEN);
    let session = SessionManager::new(transport.clone(), store.clone());
    let mut events = session.subscribe();

    session.sign_out().await;

    assert!(store.session().is_none());
    assert_eq!(transport.calls_to(LOGOUT_PATH), 1);
    let logout = transport.calls().pop().unwrap();
    assert_eq!(bearer(&logout).as_deref(), Some(STALE_TOKEN));
    assert_eq!(
        events.try_recv().unwrap(),
        SessionEvent::SignedOut {
            reason: SignOutReason::UserInitiated
        }
    );
}

#[tokio::test]
async fn sign_out_clears_state_when_network_fails() {
    let transport = Arc::new(MockTransport::new(|_| {
        Err(VaultError::Network("unreachable".to_string()))
    }));
    let session = SessionManager::new(transport.clone(), signed_in_store("u1", STALE_TOKEN));
    let mut events = session.subscribe();

    session.sign_out().await;
    session.sign_out().await;

    assert!(!session.is_authenticated());
    // Only the first sign-out had a session to end.
    assert!(events.try_recv().is_ok());
    assert_eq!(events.try_recv().unwrap_err(), TryRecvError::Empty);
}

#[tokio::test]
async fn sign_out_discards_in_flight_renewal() {
    let transport = Arc::new(
        MockTransport::new(renewing_server).with_delay(REFRESH_PATH, Duration::from_millis(100)),
    );
    let store = signed_in_store("u1", STALE_TOKEN);
    let session = SessionManager::new(transport.clone(), store.clone());
    let mut events = session.subscribe();

    let pending = {
        let session = session.clone();
        tokio::spawn(async move { session.send(ApiRequest::get(REPOS)).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(transport.calls_to(REFRESH_PATH), 1);

    session.sign_out().await;
    let result = pending.await.unwrap();

    assert_eq!(result.unwrap_err(), VaultError::SessionExpired);
    assert!(store.session().is_none());
    assert_eq!(
        events.try_recv().unwrap(),
        SessionEvent::SignedOut {
            reason: SignOutReason::UserInitiated
        }
    );
    assert_eq!(events.try_recv().unwrap_err(), TryRecvError::Empty);
}

#[tokio::test]
async fn auth_endpoints_never_trigger_renewal() {
    let transport = Arc::new(MockTransport::new(|request| match request.path.as_str() {
        LOGIN_PATH => fail(401, "Invalid credentials"),
        _ => ok(json!({"accessToken": FRESH_TOKEN})),
    }));
    let session = SessionManager::new(transport.clone(), signed_in_store("u1", STALE_TOKEN));

    let err = session.login("ada@example.com", "wrong-password").await.unwrap_err();

    assert_eq!(err, VaultError::Unauthorized("Invalid credentials".to_string()));
    assert_eq!(transport.calls_to(REFRESH_PATH), 0);
    // A failed login leaves the existing session alone.
    assert!(session.is_authenticated());
}

#[tokio::test]
async fn anonymous_401_is_passed_through() {
    let transport = Arc::new(MockTransport::new(|_| fail(401, "Unauthorized request")));
    let session = SessionManager::new(transport.clone(), Arc::new(MemoryCredentialStore::new()));

    let response = session.send(ApiRequest::get(REPOS)).await.unwrap();

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(transport.calls()[0].bearer.is_none());
    assert_eq!(transport.calls_to(REFRESH_PATH), 0);
}

#[tokio::test]
async fn forbidden_is_not_renewed() {
    let transport = Arc::new(MockTransport::new(|_| fail(403, "Not a collaborator")));
    let session = SessionManager::new(transport.clone(), signed_in_store("u1", STALE_TOKEN));

    let response = session.send(ApiRequest::get(REPOS)).await.unwrap();

    assert_eq!(
        response.into_unit().unwrap_err(),
        VaultError::Forbidden("Not a collaborator".to_string())
    );
    assert_eq!(transport.calls_to(REFRESH_PATH), 0);
    assert!(session.is_authenticated());
}

#[tokio::test]
async fn login_replaces_principal_and_emits_event() {
    let transport = Arc::new(MockTransport::new(|request| {
        assert_eq!(request.path, LOGIN_PATH);
        assert!(!request.renewable);
        ok(json!({
            "user": {"_id": "u2", "username": "bea", "email": "bea@example.com"},
            "accessToken": "login-access"
        }))
    }));
    let store = signed_in_store("u1", STALE_TOKEN);
    let session = SessionManager::new(transport.clone(), store.clone());
    let mut events = session.subscribe();

    let signed_in = session.login(" bea@example.com ", "hunter22").await.unwrap();

    assert_eq!(signed_in.id, "u2");
    assert_eq!(session.principal().unwrap().id, "u2");
    assert_eq!(store.access_token().unwrap().expose_secret(), "login-access");
    assert_eq!(events.try_recv().unwrap(), SessionEvent::SignedIn(signed_in));
    let sent = transport.calls()[0].body.clone().unwrap();
    assert_eq!(sent["email"], "bea@example.com");
}

#[tokio::test]
async fn login_and_register_validate_before_any_call() {
    let transport = Arc::new(MockTransport::new(|_| ok(json!({}))));
    let session = SessionManager::new(transport.clone(), Arc::new(MemoryCredentialStore::new()));

    let bad_email = session.login("not-an-email", "hunter22").await.unwrap_err();
    let short_password = session.login("ada@example.com", "12345").await.unwrap_err();
    let no_username = session.register("", "ada@example.com", "hunter22").await.unwrap_err();

    assert!(matches!(bad_email, VaultError::Validation(_)));
    assert!(matches!(short_password, VaultError::Validation(_)));
    assert!(matches!(no_username, VaultError::Validation(_)));
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn register_does_not_sign_in() {
    let transport = Arc::new(MockTransport::new(|_| {
        ok(json!({"_id": "u9", "username": "ada", "email": "ada@example.com"}))
    }));
    let session = SessionManager::new(transport.clone(), Arc::new(MemoryCredentialStore::new()));

    let registered = session.register("ada", "ada@example.com", "hunter22").await.unwrap();

    assert_eq!(registered, principal_with_id("u9"));
    assert!(!session.is_authenticated());
}

fn principal_with_id(id: &str) -> gitvault_client::gitvault_core::models::Principal {
    let mut p = principal("ada");
    p.id = id.to_string();
    p
}

#[tokio::test]
async fn late_401_reuses_completed_renewal() {
    let transport = Arc::new(
        MockTransport::new(|request| match request.path.as_str() {
            REFRESH_PATH => ok(json!({"accessToken": FRESH_TOKEN})),
            "/repos/fast" | "/repos/slow" if bearer(request).as_deref() == Some(FRESH_TOKEN) => {
                ok(json!([]))
            }
            _ => fail(401, "jwt expired"),
        })
        .with_delay(REFRESH_PATH, Duration::from_millis(20))
        .with_delay("/repos/slow", Duration::from_millis(80)),
    );
    let store = signed_in_store("u1", STALE_TOKEN);
    let session = SessionManager::new(transport.clone(), store.clone());

    let (fast, slow) = tokio::join!(
        session.send(ApiRequest::get("/repos/fast")),
        session.send(ApiRequest::get("/repos/slow")),
    );

    assert_eq!(fast.unwrap().status, StatusCode::OK);
    assert_eq!(slow.unwrap().status, StatusCode::OK);
    assert_eq!(transport.calls_to(REFRESH_PATH), 1);
    assert_eq!(transport.calls_to("/repos/slow"), 2);
    assert_eq!(store.access_token().unwrap().expose_secret(), FRESH_TOKEN);
}
