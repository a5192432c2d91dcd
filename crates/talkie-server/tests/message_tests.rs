mod common;

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use chrono::{DateTime, Utc};
use common::{FailingSuggester, TestApp, SECRET};
use talkie_server::{
    auth::{create_session_token, verify_session_token},
    db::UserStore,
};

async fn message_count(app: &TestApp, token: &str) -> usize {
    let response = app.messages(token).await;
    assert_eq!(response.status, StatusCode::OK);
    response.body["messages"].as_array().unwrap().len()
}

#[tokio::test]
async fn test_full_scenario() {
    let app = TestApp::new();

    let response = app.sign_up("alice", "a@x.com", "secret1").await;
    assert_eq!(response.status, StatusCode::CREATED);
    let code = app.mailer.last_code_for("a@x.com").unwrap();

    let wrong = common::other_code(&code);
    assert_eq!(app.verify("alice", &wrong).await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.verify("alice", &code).await.status, StatusCode::OK);

    let response = app.sign_in("a@x.com", "secret1").await;
    assert_eq!(response.status, StatusCode::OK);
    let token = response.body["token"].as_str().unwrap().to_string();

    let response = app.send_message("alice", "hello").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["success"], true);
    assert_eq!(message_count(&app, &token).await, 1);

    let response = app.set_accepting(&token, false).await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app.send_message("alice", "hi").await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.body["success"], false);
    assert_eq!(message_count(&app, &token).await, 1);
}

#[tokio::test]
async fn test_toggle_round_trip() {
    let app = TestApp::new();
    let token = app.registered_user("alice", "a@x.com", "secret1").await;

    let response = app.set_accepting(&token, false).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["is_accepting_messages"], false);

    let response = app
        .call(Method::GET, "/api/accept-messages", None, Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["is_accepting_messages"], false);

    // Setting the same value again is not a toggle.
    let response = app.set_accepting(&token, false).await;
    assert_eq!(response.body["is_accepting_messages"], false);

    let response = app.set_accepting(&token, true).await;
    assert_eq!(response.body["is_accepting_messages"], true);
    assert_eq!(app.send_message("alice", "back").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_toggle_reissues_session_cookie() {
    let app = TestApp::new();
    let token = app.registered_user("alice", "a@x.com", "secret1").await;

    let response = app.set_accepting(&token, false).await;
    let cookie = response.set_cookie().unwrap();
    let new_token = cookie
        .strip_prefix("talkie_session=")
        .and_then(|rest| rest.split(';').next())
        .unwrap();

    let claims = verify_session_token(new_token, SECRET).unwrap();
    assert!(!claims.is_accepting_messages);
    assert_eq!(claims.username, "alice");
}

#[tokio::test]
async fn test_toggle_for_missing_user_is_not_found() {
    let app = TestApp::new();
    let ghost = talkie_shared::SessionUser {
        id: uuid::Uuid::new_v4(),
        username: "ghost".to_string(),
        is_verified: true,
        is_accepting_messages: true,
    };
    let token = create_session_token(&ghost, SECRET, 3600).unwrap();

    let response = app.set_accepting(&token, false).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app
        .call(Method::GET, "/api/accept-messages", None, Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_protected_routes_require_session() {
    let app = TestApp::new();

    for (method, uri) in [
        (Method::GET, "/api/get-messages"),
        (Method::GET, "/api/accept-messages"),
        (Method::POST, "/api/accept-messages"),
        (
            Method::DELETE,
            "/api/delete-message/6a1f6a5e-8c6d-4a53-9d57-3f8a2b1e0c11",
        ),
    ] {
        let response = app.call(method, uri, None, None).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(response.body["success"], false);
    }

    let response = app
        .call(Method::GET, "/api/get-messages", None, Some("forged.token.value"))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_messages_are_listed_newest_first() {
    let app = TestApp::new();
    let token = app.registered_user("alice", "a@x.com", "secret1").await;

    let response = app.messages(&token).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["success"], true);
    assert!(response.body["messages"].as_array().unwrap().is_empty());

    for content in ["one", "two", "three"] {
        assert_eq!(app.send_message("alice", content).await.status, StatusCode::OK);
    }

    let response = app.messages(&token).await;
    let messages = response.body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 3);

    let times: Vec<DateTime<Utc>> = messages
        .iter()
        .map(|m| m["created_at"].as_str().unwrap().parse().unwrap())
        .collect();
    assert!(times.windows(2).all(|w| w[0] >= w[1]));

    let mut contents: Vec<&str> = messages
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    contents.sort_unstable();
    assert_eq!(contents, vec!["one", "three", "two"]);
}

#[tokio::test]
async fn test_message_intake_failures() {
    let app = TestApp::new();
    app.registered_user("alice", "a@x.com", "secret1").await;

    let response = app.send_message("nobody", "hello").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app.send_message("alice", "   ").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app.send_message("alice", &"x".repeat(301)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stored_message_has_no_sender_data() {
    let app = TestApp::new();
    let token = app.registered_user("alice", "a@x.com", "secret1").await;

    app.send_message("alice", "hello").await;

    let response = app.messages(&token).await;
    let message = response.body["messages"][0].as_object().unwrap();
    let mut keys: Vec<&str> = message.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["content", "created_at", "id"]);
}

#[tokio::test]
async fn test_message_content_is_stored_as_sent() {
    let app = TestApp::new();
    let token = app.registered_user("alice", "a@x.com", "secret1").await;

    let response = app.send_message("alice", "  hello there \n").await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app.messages(&token).await;
    assert_eq!(response.body["messages"][0]["content"], "  hello there \n");
}

#[tokio::test]
async fn test_delete_message_once() {
    let app = TestApp::new();
    let token = app.registered_user("alice", "a@x.com", "secret1").await;

    app.send_message("alice", "hello").await;
    let response = app.messages(&token).await;
    let id = response.body["messages"][0]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/delete-message/{id}");

    let response = app.call(Method::DELETE, &uri, None, Some(&token)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["success"], true);

    let response = app.call(Method::DELETE, &uri, None, Some(&token)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(message_count(&app, &token).await, 0);
}

#[tokio::test]
async fn test_delete_is_scoped_to_owner() {
    let app = TestApp::new();
    let alice = app.registered_user("alice", "a@x.com", "secret1").await;
    let bob = app.registered_user("bob", "b@x.com", "secret1").await;

    app.send_message("alice", "for alice").await;
    let response = app.messages(&alice).await;
    let id = response.body["messages"][0]["id"].as_str().unwrap().to_string();

    let response = app
        .call(
            Method::DELETE,
            &format!("/api/delete-message/{id}"),
            None,
            Some(&bob),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(message_count(&app, &alice).await, 1);

    let response = app
        .call(Method::DELETE, "/api/delete-message/not-a-uuid", None, Some(&alice))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_intake_respects_flag_set_directly_in_store() {
    let app = TestApp::new();
    let token = app.registered_user("alice", "a@x.com", "secret1").await;
    let user = app.store.find_by_email("a@x.com").await.unwrap().unwrap();

    app.store.set_accepting_messages(user.id, false).await.unwrap();

    // The token still says accepting; intake reads the store.
    assert!(verify_session_token(&token, SECRET).unwrap().is_accepting_messages);
    assert_eq!(
        app.send_message("alice", "hi").await.status,
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn test_suggest_messages() {
    let app = TestApp::new();

    let response = app
        .call(Method::POST, "/api/suggest-messages", None, None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["suggestions"].as_array().unwrap().len(), 3);

    let app = TestApp::with_suggester(Arc::new(FailingSuggester));
    let response = app
        .call(Method::POST, "/api/suggest-messages", None, None)
        .await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["success"], false);
}
