//! Driving port for relationship mutations.
//!
//! Inbound adapters call this port to follow and unfollow users, join and
//! leave groups, and strip a user out of every relationship ahead of
//! deletion. Implementations keep both sides of each edge in sync.

use async_trait::async_trait;

use crate::domain::{Error, GroupId, User, UserId};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RelationshipCommand: Send + Sync {
    /// Make `actor` follow `target`. Returns the updated actor.
    async fn follow(&self, actor: &UserId, target: &UserId) -> Result<User, Error>;

    /// Remove the follow edge from `actor` to `target`. Returns the updated
    /// actor.
    async fn unfollow(&self, actor: &UserId, target: &UserId) -> Result<User, Error>;

    /// Add `actor` to `group`. Returns the updated actor.
    async fn join_group(&self, actor: &UserId, group: &GroupId) -> Result<User, Error>;

    /// Remove `actor` from `group`. Returns the updated actor.
    async fn leave_group(&self, actor: &UserId, group: &GroupId) -> Result<User, Error>;

    /// Remove every reference to `user` held by other documents.
    async fn cascade_delete_user(&self, user: &UserId) -> Result<(), Error>;
}
