//! End-to-end checks for login, profile, password, and admin routes.

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use rstest::rstest;
use serde_json::json;
use socialgraph::domain::TRACE_ID_HEADER;
use socialgraph::domain::ports::GraphStore;
use socialgraph::outbound::InMemoryStore;

// Each suite uses a different subset of the shared helpers.
#[allow(dead_code)]
mod support;

use support::{PASSWORD, init_app, login, login_with, seed_admin, seed_user, send};

#[actix_web::test]
async fn failed_login_is_unauthorised_and_traced() {
    let store = Arc::new(InMemoryStore::default());
    seed_user(&store, "ada_l");
    let app = init_app(store).await;

    let response = test::call_service(
        &app,
        TestRequest::post()
            .uri("/api/v1/login")
            .set_json(json!({ "username": "ada_l", "password": "wrong password" }))
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().contains_key(TRACE_ID_HEADER));
}

#[actix_web::test]
async fn listing_is_ordered_by_user_name_and_paged() {
    let store = Arc::new(InMemoryStore::default());
    for name in ["grace", "ada_l", "babbage"] {
        seed_user(&store, name);
    }
    let app = init_app(store).await;
    let cookie = login(&app, "ada_l").await;

    let (status, page) = send(
        &app,
        TestRequest::get()
            .uri("/api/v1/users?limit=2&offset=1")
            .cookie(cookie),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["limit"], 2);
    assert_eq!(page["offset"], 1);
    let names: Vec<&str> = page["users"]
        .as_array()
        .expect("users")
        .iter()
        .map(|user| user["userName"].as_str().expect("user name"))
        .collect();
    assert_eq!(names, ["babbage", "grace"]);
}

#[rstest]
#[case::admin_flag(json!({ "isAdmin": true }))]
#[case::password(json!({ "password": "new password!" }))]
#[case::relationship_set(json!({ "followers": [] }))]
#[actix_web::test]
async fn self_service_updates_reject_fields_outside_the_allow_list(
    #[case] payload: serde_json::Value,
) {
    let store = Arc::new(InMemoryStore::default());
    let ada = seed_user(&store, "ada_l");
    let app = init_app(store.clone()).await;
    let cookie = login(&app, "ada_l").await;

    let (status, body) = send(
        &app,
        TestRequest::put()
            .uri("/api/v1/users/me")
            .cookie(cookie)
            .set_json(payload),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_request");

    let stored = store.find_user(&ada).await.expect("read").expect("user");
    assert!(!stored.is_admin());
}

#[actix_web::test]
async fn profile_updates_are_returned_and_stored() {
    let store = Arc::new(InMemoryStore::default());
    let ada = seed_user(&store, "ada_l");
    let app = init_app(store.clone()).await;
    let cookie = login(&app, "ada_l").await;

    let (status, body) = send(
        &app,
        TestRequest::put()
            .uri("/api/v1/users/me")
            .cookie(cookie)
            .set_json(json!({ "name": "Ada Lovelace", "bio": "First programmer" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Ada Lovelace");

    let stored = store.find_user(&ada).await.expect("read").expect("user");
    assert_eq!(stored.bio(), Some("First programmer"));
}

#[actix_web::test]
async fn admin_routes_are_forbidden_to_regular_users() {
    let store = Arc::new(InMemoryStore::default());
    seed_user(&store, "ada_l");
    let grace = seed_user(&store, "grace");
    let app = init_app(store).await;
    let cookie = login(&app, "ada_l").await;

    let (status, body) = send(
        &app,
        TestRequest::delete()
            .uri(&format!("/api/v1/users/{grace}"))
            .cookie(cookie),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "forbidden");
}

#[actix_web::test]
async fn admins_can_grant_the_admin_flag() {
    let store = Arc::new(InMemoryStore::default());
    seed_admin(&store, "root_admin");
    let grace = seed_user(&store, "grace");
    let app = init_app(store.clone()).await;
    let cookie = login(&app, "root_admin").await;

    let (status, body) = send(
        &app,
        TestRequest::put()
            .uri(&format!("/api/v1/users/{grace}"))
            .cookie(cookie)
            .set_json(json!({ "isAdmin": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isAdmin"], true);
    let stored = store.find_user(&grace).await.expect("read").expect("user");
    assert!(stored.is_admin());
}

#[actix_web::test]
async fn changed_passwords_replace_the_old_ones() {
    let store = Arc::new(InMemoryStore::default());
    seed_user(&store, "ada_l");
    let app = init_app(store).await;
    let cookie = login(&app, "ada_l").await;

    let (status, body) = send(
        &app,
        TestRequest::put()
            .uri("/api/v1/users/me/password")
            .cookie(cookie)
            .set_json(json!({ "password": "a brand new secret" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("password").is_none());

    assert!(login_with(&app, "ada_l", PASSWORD).await.is_none());
    assert!(login_with(&app, "ada_l", "a brand new secret").await.is_some());
}

#[actix_web::test]
async fn unknown_users_are_not_found() {
    let store = Arc::new(InMemoryStore::default());
    seed_user(&store, "ada_l");
    let app = init_app(store).await;
    let cookie = login(&app, "ada_l").await;

    let (status, body) = send(
        &app,
        TestRequest::get()
            .uri(&format!("/api/v1/users/{}", uuid::Uuid::new_v4()))
            .cookie(cookie),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[actix_web::test]
async fn deleted_sessions_cannot_reach_the_api() {
    let store = Arc::new(InMemoryStore::default());
    seed_user(&store, "ada_l");
    let app = init_app(store).await;
    let cookie = login(&app, "ada_l").await;

    let (status, _) = send(
        &app,
        TestRequest::delete().uri("/api/v1/users/me").cookie(cookie.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        TestRequest::get().uri("/api/v1/users/me").cookie(cookie),
    )
    .await;
    assert!(
        matches!(status, StatusCode::UNAUTHORIZED | StatusCode::NOT_FOUND),
        "stale cookie must not resolve a deleted account, got {status}"
    );
}
