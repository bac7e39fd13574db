//! Users API handlers.
//!
//! ```text
//! POST /api/v1/login {"username":"ada_l","password":"correct horse"}
//! GET /api/v1/users?limit=20&offset=0
//! GET|PUT|DELETE /api/v1/users/me
//! PUT /api/v1/users/me/password
//! GET|PUT|DELETE /api/v1/users/{id}
//! PUT /api/v1/users/{id}/password
//! ```
//!
//! Update bodies are allow-lists: any field outside the request type is
//! rejected during deserialisation.

use actix_web::{HttpResponse, delete, get, post, put, web};
use serde::{Deserialize, Serialize};

use crate::domain::{
    Error, ErrorCode, LoginCredentials, LoginValidationError, PageRequest, Password,
    ProfileChanges, ProfileValidationError, User, UserId, UserPage, UserProfile,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::{SignedIn, UserSession};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, map_login_validation_error, map_page_validation_error,
    map_password_validation_error, map_profile_validation_error, parse_user_id,
};

/// Login request body for `POST /api/v1/login`.
///
/// Example JSON:
/// `{"username":"ada_l","password":"correct horse"}`
#[derive(Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl TryFrom<LoginRequest> for LoginCredentials {
    type Error = LoginValidationError;

    fn try_from(value: LoginRequest) -> Result<Self, Self::Error> {
        Self::try_from_parts(&value.username, &value.password)
    }
}

/// Pagination window for `GET /api/v1/users`.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListUsersQuery {
    /// Page size, at most 100. Defaults to 20.
    pub limit: Option<u32>,
    /// Number of users to skip. Defaults to 0.
    pub offset: Option<u64>,
}

/// Self-service profile update for `PUT /api/v1/users/me`.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub user_name: Option<String>,
    pub bio: Option<String>,
    pub profile_pic: Option<String>,
    pub cover_pic: Option<String>,
}

/// Administrative update for `PUT /api/v1/users/{id}`; the profile fields
/// plus `isAdmin`.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AdminUserUpdate {
    pub name: Option<String>,
    pub user_name: Option<String>,
    pub bio: Option<String>,
    pub profile_pic: Option<String>,
    pub cover_pic: Option<String>,
    pub is_admin: Option<bool>,
}

/// New password for `PUT /api/v1/users/me/password` and the admin variant.
#[derive(Deserialize, Serialize, utoipa::ToSchema)]
#[serde(deny_unknown_fields)]
pub struct PasswordChangeRequest {
    pub password: String,
}

fn apply_optional<T>(
    changes: ProfileChanges,
    value: Option<T>,
    set: impl FnOnce(ProfileChanges, T) -> Result<ProfileChanges, ProfileValidationError>,
) -> Result<ProfileChanges, ProfileValidationError> {
    match value {
        Some(value) => set(changes, value),
        None => Ok(changes),
    }
}

fn profile_changes(update: ProfileUpdate) -> Result<ProfileChanges, ProfileValidationError> {
    let ProfileUpdate {
        name,
        user_name,
        bio,
        profile_pic,
        cover_pic,
    } = update;
    let changes = apply_optional(ProfileChanges::default(), name, ProfileChanges::with_name)?;
    let changes = apply_optional(changes, user_name, ProfileChanges::with_user_name)?;
    let changes = apply_optional(changes, bio, ProfileChanges::with_bio)?;
    let changes = apply_optional(changes, profile_pic, ProfileChanges::with_profile_pic)?;
    apply_optional(changes, cover_pic, ProfileChanges::with_cover_pic)
}

impl TryFrom<ProfileUpdate> for ProfileChanges {
    type Error = Error;

    fn try_from(value: ProfileUpdate) -> Result<Self, Self::Error> {
        profile_changes(value)
            .and_then(ProfileChanges::ensure_not_empty)
            .map_err(map_profile_validation_error)
    }
}

impl TryFrom<AdminUserUpdate> for ProfileChanges {
    type Error = Error;

    fn try_from(value: AdminUserUpdate) -> Result<Self, Self::Error> {
        let AdminUserUpdate {
            name,
            user_name,
            bio,
            profile_pic,
            cover_pic,
            is_admin,
        } = value;
        let profile = ProfileUpdate {
            name,
            user_name,
            bio,
            profile_pic,
            cover_pic,
        };
        profile_changes(profile)
            .map(|changes| match is_admin {
                Some(flag) => changes.with_admin(flag),
                None => changes,
            })
            .and_then(ProfileChanges::ensure_not_empty)
            .map_err(map_profile_validation_error)
    }
}

fn parse_password(request: PasswordChangeRequest) -> Result<Password, Error> {
    Password::new(request.password).map_err(map_password_validation_error)
}

/// Resolve the session user and insist they hold the admin flag.
async fn require_admin(state: &HttpState, id: &UserId) -> ApiResult<()> {
    let actor = state.users.find_account(id).await.map_err(|err| {
        if err.code() == ErrorCode::NotFound {
            Error::unauthorized("login required")
        } else {
            err
        }
    })?;
    if !actor.is_admin() {
        return Err(Error::forbidden("administrator access required"));
    }
    Ok(())
}

fn parse_path_user_id(raw: &str) -> ApiResult<UserId> {
    parse_user_id(raw, FieldName::new("id"))
}

/// Authenticate user and establish a session.
///
/// Uses the centralised `Error` type so clients get a consistent
/// error schema across all endpoints.
#[utoipa::path(
    post,
    path = "/api/v1/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login success", headers(("Set-Cookie" = String, description = "Session cookie"))),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Invalid credentials", body = Error),
        (status = 500, description = "Internal server error")
    ),
    tags = ["users"],
    operation_id = "login",
    security([])
)]
#[post("/login")]
pub async fn login(
    state: web::Data<HttpState>,
    session: UserSession,
    payload: web::Json<LoginRequest>,
) -> ApiResult<HttpResponse> {
    let credentials =
        LoginCredentials::try_from(payload.into_inner()).map_err(map_login_validation_error)?;
    let user_id = state.login.authenticate(&credentials).await?;
    session.sign_in(&user_id)?;
    Ok(HttpResponse::Ok().finish())
}

/// List users ordered by user name.
///
/// # Examples
/// ```
/// use actix_web::App;
/// use socialgraph::inbound::http::users::list_users;
///
/// let app = App::new().service(list_users);
/// ```
#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "Users", body = UserPage),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["users"],
    operation_id = "listUsers"
)]
#[get("/users")]
pub async fn list_users(
    state: web::Data<HttpState>,
    _caller: SignedIn,
    query: web::Query<ListUsersQuery>,
) -> ApiResult<web::Json<UserPage>> {
    let ListUsersQuery { limit, offset } = query.into_inner();
    let page = PageRequest::new(limit, offset).map_err(map_page_validation_error)?;
    let users = state.users.list_users(page).await?;
    Ok(web::Json(users))
}

/// Return the signed-in user with populated relationships.
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses(
        (status = 200, description = "Current user", body = UserProfile),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "User no longer exists", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["users"],
    operation_id = "currentUser"
)]
#[get("/users/me")]
pub async fn current_user(
    state: web::Data<HttpState>,
    SignedIn(user_id): SignedIn,
) -> ApiResult<web::Json<UserProfile>> {
    let profile = state.users.get_user(&user_id).await?;
    Ok(web::Json(profile))
}

/// Update the signed-in user's own profile.
#[utoipa::path(
    put,
    path = "/api/v1/users/me",
    request_body = ProfileUpdate,
    responses(
        (status = 200, description = "Updated user", body = User),
        (status = 400, description = "Invalid request or unknown field", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 409, description = "User name taken", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["users"],
    operation_id = "updateCurrentUser"
)]
#[put("/users/me")]
pub async fn update_me(
    state: web::Data<HttpState>,
    SignedIn(user_id): SignedIn,
    payload: web::Json<ProfileUpdate>,
) -> ApiResult<web::Json<User>> {
    let changes = ProfileChanges::try_from(payload.into_inner())?;
    let user = state.accounts.update_profile(&user_id, changes).await?;
    Ok(web::Json(user))
}

/// Change the signed-in user's password.
#[utoipa::path(
    put,
    path = "/api/v1/users/me/password",
    request_body = PasswordChangeRequest,
    responses(
        (status = 200, description = "Password changed", body = User),
        (status = 400, description = "Invalid password", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["users"],
    operation_id = "changeCurrentUserPassword"
)]
#[put("/users/me/password")]
pub async fn change_my_password(
    state: web::Data<HttpState>,
    SignedIn(user_id): SignedIn,
    payload: web::Json<PasswordChangeRequest>,
) -> ApiResult<web::Json<User>> {
    let password = parse_password(payload.into_inner())?;
    let user = state.accounts.change_password(&user_id, password).await?;
    Ok(web::Json(user))
}

/// Delete the signed-in user's account and end the session.
///
/// Every relationship edge pointing at the user is removed first; if some
/// cannot be removed the account is kept and the failed edges are reported.
/// An account that keeps gaining edges while being deleted is kept and
/// reported as a conflict.
#[utoipa::path(
    delete,
    path = "/api/v1/users/me",
    responses(
        (status = 204, description = "Account deleted"),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 409, description = "Relationships kept changing during deletion", body = Error),
        (status = 500, description = "Relationship cleanup incomplete", body = Error),
        (status = 504, description = "Store timed out", body = Error)
    ),
    tags = ["users"],
    operation_id = "deleteCurrentUser"
)]
#[delete("/users/me")]
pub async fn delete_me(
    state: web::Data<HttpState>,
    SignedIn(user_id): SignedIn,
    session: UserSession,
) -> ApiResult<HttpResponse> {
    state.accounts.delete_account(&user_id).await?;
    session.sign_out();
    Ok(HttpResponse::NoContent().finish())
}

/// Fetch any user with populated relationships.
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = String, Path, description = "User id (UUID)")),
    responses(
        (status = 200, description = "User", body = UserProfile),
        (status = 400, description = "Malformed id", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Unknown user", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["users"],
    operation_id = "getUser"
)]
#[get("/users/{id}")]
pub async fn get_user(
    state: web::Data<HttpState>,
    _caller: SignedIn,
    path: web::Path<String>,
) -> ApiResult<web::Json<UserProfile>> {
    let user_id = parse_path_user_id(&path)?;
    let profile = state.users.get_user(&user_id).await?;
    Ok(web::Json(profile))
}

/// Update any user's profile, including the admin flag.
#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    params(("id" = String, Path, description = "User id (UUID)")),
    request_body = AdminUserUpdate,
    responses(
        (status = 200, description = "Updated user", body = User),
        (status = 400, description = "Invalid request or unknown field", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Administrator access required", body = Error),
        (status = 404, description = "Unknown user", body = Error),
        (status = 409, description = "User name taken", body = Error)
    ),
    tags = ["admin"],
    operation_id = "updateUser"
)]
#[put("/users/{id}")]
pub async fn update_user(
    state: web::Data<HttpState>,
    SignedIn(actor): SignedIn,
    path: web::Path<String>,
    payload: web::Json<AdminUserUpdate>,
) -> ApiResult<web::Json<User>> {
    require_admin(&state, &actor).await?;
    let user_id = parse_path_user_id(&path)?;
    let changes = ProfileChanges::try_from(payload.into_inner())?;
    let user = state.accounts.update_profile(&user_id, changes).await?;
    Ok(web::Json(user))
}

/// Reset any user's password.
#[utoipa::path(
    put,
    path = "/api/v1/users/{id}/password",
    params(("id" = String, Path, description = "User id (UUID)")),
    request_body = PasswordChangeRequest,
    responses(
        (status = 200, description = "Password changed", body = User),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Administrator access required", body = Error),
        (status = 404, description = "Unknown user", body = Error)
    ),
    tags = ["admin"],
    operation_id = "setUserPassword"
)]
#[put("/users/{id}/password")]
pub async fn set_user_password(
    state: web::Data<HttpState>,
    SignedIn(actor): SignedIn,
    path: web::Path<String>,
    payload: web::Json<PasswordChangeRequest>,
) -> ApiResult<web::Json<User>> {
    require_admin(&state, &actor).await?;
    let user_id = parse_path_user_id(&path)?;
    let password = parse_password(payload.into_inner())?;
    let user = state.accounts.change_password(&user_id, password).await?;
    Ok(web::Json(user))
}

/// Delete any user's account.
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    params(("id" = String, Path, description = "User id (UUID)")),
    responses(
        (status = 204, description = "Account deleted"),
        (status = 400, description = "Malformed id", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Administrator access required", body = Error),
        (status = 404, description = "Unknown user", body = Error),
        (status = 409, description = "Relationships kept changing during deletion", body = Error),
        (status = 500, description = "Relationship cleanup incomplete", body = Error),
        (status = 504, description = "Store timed out", body = Error)
    ),
    tags = ["admin"],
    operation_id = "deleteUser"
)]
#[delete("/users/{id}")]
pub async fn delete_user(
    state: web::Data<HttpState>,
    SignedIn(actor): SignedIn,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    require_admin(&state, &actor).await?;
    let user_id = parse_path_user_id(&path)?;
    state.accounts.delete_account(&user_id).await?;
    Ok(HttpResponse::NoContent().finish())
}
