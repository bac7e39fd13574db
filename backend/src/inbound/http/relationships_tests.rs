//! Handler tests for the relationship API.

use super::*;
use crate::domain::{GroupId, UserId, UserName};
use crate::inbound::http::json_config;
use crate::inbound::http::test_utils::{
    MockPorts, TEST_LOGIN_PATH, session_cookie, test_login, test_session_middleware,
};
use actix_web::http::StatusCode;
use actix_web::{App, test as actix_test, web};
use rstest::rstest;
use serde_json::{Value, json};

fn test_app(
    state: web::Data<HttpState>,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(state)
        .app_data(json_config())
        .wrap(test_session_middleware())
        .route(TEST_LOGIN_PATH, web::get().to(test_login))
        .service(
            web::scope("/api/v1")
                .service(follow)
                .service(unfollow)
                .service(join_group)
                .service(leave_group),
        )
}

fn user(name: &str) -> User {
    User::new(UserId::random(), UserName::new(name).expect("user name"), name)
}

#[actix_web::test]
async fn follow_passes_session_user_as_actor() {
    let target = UserId::random();
    let me = user("ada_l").with_followings([target]);
    let my_id = *me.id();
    let mut ports = MockPorts::default();
    ports
        .relationships
        .expect_follow()
        .withf(move |actor, followed| *actor == my_id && *followed == target)
        .times(1)
        .return_once(move |_, _| Ok(me));
    let app = actix_test::init_service(test_app(ports.into_state())).await;
    let cookie = session_cookie(&app, &my_id).await;

    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/users/me/followings")
            .cookie(cookie)
            .set_json(json!({ "userId": target.to_string() }))
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["followings"], json!([target.to_string()]));
}

#[actix_web::test]
async fn follow_requires_session() {
    let mut ports = MockPorts::default();
    ports.relationships.expect_follow().never();
    let app = actix_test::init_service(test_app(ports.into_state())).await;

    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/users/me/followings")
            .set_json(json!({ "userId": UserId::random().to_string() }))
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[rstest]
#[case("/api/v1/users/me/followings", json!({ "userId": "nope" }), "userId")]
#[case("/api/v1/users/me/groups", json!({ "groupId": "nope" }), "groupId")]
#[actix_web::test]
async fn malformed_body_ids_are_invalid_requests(
    #[case] uri: &str,
    #[case] payload: Value,
    #[case] field: &str,
) {
    let mut ports = MockPorts::default();
    ports.relationships.expect_follow().never();
    ports.relationships.expect_join_group().never();
    let app = actix_test::init_service(test_app(ports.into_state())).await;
    let cookie = session_cookie(&app, &UserId::random()).await;

    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri(uri)
            .cookie(cookie)
            .set_json(payload)
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(
        body["details"],
        json!({ "field": field, "value": "nope", "code": "invalid_uuid" })
    );
}

#[actix_web::test]
async fn self_follow_surfaces_invalid_operation() {
    let my_id = UserId::random();
    let mut ports = MockPorts::default();
    ports.relationships.expect_follow().return_once(|_, _| {
        Err(Error::invalid_request("a user cannot follow themselves")
            .with_details(json!({ "code": "invalid_operation" })))
    });
    let app = actix_test::init_service(test_app(ports.into_state())).await;
    let cookie = session_cookie(&app, &my_id).await;

    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/users/me/followings")
            .cookie(cookie)
            .set_json(json!({ "userId": my_id.to_string() }))
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["details"]["code"], "invalid_operation");
}

#[actix_web::test]
async fn unfollow_reads_target_from_path() {
    let target = UserId::random();
    let me = user("ada_l");
    let my_id = *me.id();
    let mut ports = MockPorts::default();
    ports
        .relationships
        .expect_unfollow()
        .withf(move |actor, followed| *actor == my_id && *followed == target)
        .return_once(move |_, _| Ok(me));
    let app = actix_test::init_service(test_app(ports.into_state())).await;
    let cookie = session_cookie(&app, &my_id).await;

    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::delete()
            .uri(&format!("/api/v1/users/me/followings/{target}"))
            .cookie(cookie)
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[actix_web::test]
async fn join_group_for_unknown_group_is_not_found() {
    let group = GroupId::random();
    let mut ports = MockPorts::default();
    ports
        .relationships
        .expect_join_group()
        .withf(move |_, joined| *joined == group)
        .return_once(move |_, joined| {
            Err(Error::not_found(format!("group {joined} does not exist")))
        });
    let app = actix_test::init_service(test_app(ports.into_state())).await;
    let cookie = session_cookie(&app, &UserId::random()).await;

    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/users/me/groups")
            .cookie(cookie)
            .set_json(json!({ "groupId": group.to_string() }))
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn leave_group_timeout_maps_to_gateway_timeout() {
    let group = GroupId::random();
    let mut ports = MockPorts::default();
    ports
        .relationships
        .expect_leave_group()
        .return_once(|_, _| Err(Error::timeout("store did not answer within 5000 ms")));
    let app = actix_test::init_service(test_app(ports.into_state())).await;
    let cookie = session_cookie(&app, &UserId::random()).await;

    let response = actix_test::call_service(
        &app,
        actix_test::TestRequest::delete()
            .uri(&format!("/api/v1/users/me/groups/{group}"))
            .cookie(cookie)
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
}
