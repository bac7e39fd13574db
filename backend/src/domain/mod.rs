//! Domain primitives, aggregates, and services.
//!
//! Purpose: define the social graph's strongly typed entities and the
//! services that keep relationship edges consistent. Keep types immutable
//! outside the crate and document invariants and serialisation contracts in
//! each type's Rustdoc.
//!
//! Public surface:
//! - `Error` / `ErrorCode`: transport-agnostic failure payload.
//! - `User` / `Group`: documents embedding relationship id sets.
//! - `RelationshipService`: follow, unfollow, join, leave, cascade delete.
//! - `AccountService`: queries, profile and password updates, deletion, login.

pub mod account;
pub mod account_service;
pub mod auth;
pub mod error;
pub mod group;
pub mod ports;
pub mod relationship_service;
pub mod relationships;
pub mod trace_id;
pub mod user;

pub use self::account::{
    BIO_MAX, DEFAULT_PAGE_LIMIT, GroupSummary, MAX_PAGE_LIMIT, NAME_MAX, PageRequest,
    PageValidationError, ProfileChanges, ProfileValidationError, UserPage, UserProfile,
    UserSummary,
};
pub use self::account_service::AccountService;
pub use self::auth::{
    LoginCredentials, LoginValidationError, PASSWORD_MAX, PASSWORD_MIN, Password, PasswordHash,
    PasswordValidationError,
};
pub use self::error::{Error, ErrorCode};
pub use self::group::{Group, GroupId, GroupValidationError};
pub use self::relationship_service::{DEFAULT_STORE_TIMEOUT, RelationshipService};
pub use self::relationships::{DanglingEdge, RelationshipError};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::user::{USER_NAME_MAX, USER_NAME_MIN, User, UserId, UserName, UserValidationError};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use socialgraph::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<()> {
///     Err(Error::forbidden("nope"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
