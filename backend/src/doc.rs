//! OpenAPI documentation configuration.
//!
//! This module defines the [`ApiDoc`] struct which generates the OpenAPI
//! document for the REST API. It registers:
//!
//! - **Paths**: every HTTP endpoint from the inbound layer (users,
//!   relationships, admin, health)
//! - **Schemas**: domain documents, populated views, request bodies, and the
//!   shared error envelope
//! - **Security**: Session cookie authentication scheme
//!
//! The generated document backs Swagger UI in debug builds.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::{Error, ErrorCode, GroupSummary, User, UserPage, UserProfile, UserSummary};
use crate::inbound::http::relationships::{FollowRequest, JoinGroupRequest};
use crate::inbound::http::users::{
    AdminUserUpdate, LoginRequest, PasswordChangeRequest, ProfileUpdate,
};

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie issued by POST /api/v1/login.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
/// Swagger UI is enabled in debug builds only.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Social graph API",
        description = "Session-authenticated access to users, follow relationships, and group memberships."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::users::login,
        crate::inbound::http::users::list_users,
        crate::inbound::http::users::current_user,
        crate::inbound::http::users::update_me,
        crate::inbound::http::users::change_my_password,
        crate::inbound::http::users::delete_me,
        crate::inbound::http::users::get_user,
        crate::inbound::http::users::update_user,
        crate::inbound::http::users::set_user_password,
        crate::inbound::http::users::delete_user,
        crate::inbound::http::relationships::follow,
        crate::inbound::http::relationships::unfollow,
        crate::inbound::http::relationships::join_group,
        crate::inbound::http::relationships::leave_group,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        User,
        UserProfile,
        UserSummary,
        GroupSummary,
        UserPage,
        Error,
        ErrorCode,
        LoginRequest,
        ProfileUpdate,
        AdminUserUpdate,
        PasswordChangeRequest,
        FollowRequest,
        JoinGroupRequest,
    )),
    tags(
        (name = "users", description = "Accounts and profiles"),
        (name = "relationships", description = "Follow edges and group memberships"),
        (name = "admin", description = "Administrator-only account management"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
