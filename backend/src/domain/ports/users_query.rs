//! Driving port for user-facing queries.
//!
//! Inbound adapters (HTTP handlers) use this port to fetch user-visible data
//! without importing outbound persistence concerns.

use async_trait::async_trait;

use crate::domain::{Error, PageRequest, User, UserId, UserPage, UserProfile};

/// Domain use-case port for reading users.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UsersQuery: Send + Sync {
    /// Return one page of users.
    async fn list_users(&self, page: PageRequest) -> Result<UserPage, Error>;

    /// Return a user with populated relationship summaries.
    async fn get_user(&self, id: &UserId) -> Result<UserProfile, Error>;

    /// Return the raw user document, used for authorisation checks.
    async fn find_account(&self, id: &UserId) -> Result<User, Error>;
}
