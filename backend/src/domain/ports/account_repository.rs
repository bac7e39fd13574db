//! Port abstraction for account persistence: listing, summaries, profile and
//! password updates, credential lookup, and deletion.
//!
//! Relationship sets are never written through this port; they belong to
//! [`super::GraphStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    GroupId, GroupSummary, PageRequest, PasswordHash, ProfileChanges, User, UserId, UserSummary,
};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by account repository adapters.
    pub enum AccountRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "account repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "account repository query failed: {message}",
        /// Another account already uses the requested user name.
        DuplicateUserName { user_name: String } => "user name {user_name} is already taken",
    }
}

/// Stored credentials for a single account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCredentials {
    pub user_id: UserId,
    pub password_hash: PasswordHash,
}

/// Result of [`AccountRepository::delete_detached_user`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRemoval {
    Removed,
    Missing,
    /// The document still lists followers, followings or groups, so it was
    /// kept.
    StillLinked,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// List users ordered by user name, then id.
    async fn list_users(&self, page: PageRequest) -> Result<Vec<User>, AccountRepositoryError>;

    /// Summaries for whichever of `ids` still exist.
    async fn user_summaries(
        &self,
        ids: &[UserId],
    ) -> Result<Vec<UserSummary>, AccountRepositoryError>;

    /// Summaries for whichever of `ids` still exist.
    async fn group_summaries(
        &self,
        ids: &[GroupId],
    ) -> Result<Vec<GroupSummary>, AccountRepositoryError>;

    /// Overwrite the fields present in `changes`. Returns `None` when the user
    /// does not exist.
    async fn update_profile(
        &self,
        id: &UserId,
        changes: &ProfileChanges,
    ) -> Result<Option<User>, AccountRepositoryError>;

    /// Store a new password hash and its change timestamp. Returns `None` when
    /// the user does not exist.
    async fn update_password(
        &self,
        id: &UserId,
        hash: &PasswordHash,
        changed_at: DateTime<Utc>,
    ) -> Result<Option<User>, AccountRepositoryError>;

    /// Look up credentials by user name.
    async fn find_credentials(
        &self,
        user_name: &str,
    ) -> Result<Option<StoredCredentials>, AccountRepositoryError>;

    /// Delete the user document, but only while all three of its
    /// relationship sets are empty.
    ///
    /// The emptiness check and the removal are atomic with respect to
    /// [`super::GraphStore::apply`]: a batch either lands before the check and
    /// keeps the document, or finds the document gone and fails.
    async fn delete_detached_user(
        &self,
        id: &UserId,
    ) -> Result<UserRemoval, AccountRepositoryError>;
}
