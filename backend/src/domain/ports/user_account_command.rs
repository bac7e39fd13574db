//! Driving port for account mutations: profile edits, password changes, and
//! account deletion.

use async_trait::async_trait;

use crate::domain::{Error, Password, ProfileChanges, User, UserId};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserAccountCommand: Send + Sync {
    /// Apply allow-listed profile changes and return the updated user.
    async fn update_profile(&self, id: &UserId, changes: ProfileChanges) -> Result<User, Error>;

    /// Hash and store a new password and return the updated user.
    async fn change_password(&self, id: &UserId, password: Password) -> Result<User, Error>;

    /// Detach the user from every relationship, then delete the document.
    ///
    /// When detaching only partly succeeds the document is kept so the call
    /// can be retried.
    async fn delete_account(&self, id: &UserId) -> Result<(), Error>;
}
