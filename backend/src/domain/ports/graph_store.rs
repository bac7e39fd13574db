//! Port for the document store holding users, groups, and their embedded
//! relationship sets.
//!
//! Writes are expressed as batches of set mutations. An adapter must apply a
//! batch atomically: either every mutation lands or none does. Adding a member
//! that is already present, or removing one that is absent, is a no-op.

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{Group, GroupId, User, UserId};

use super::define_port_error;

/// Kind of document a relationship set lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    User,
    Group,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => f.write_str("user"),
            Self::Group => f.write_str("group"),
        }
    }
}

/// Name of an embedded relationship field, in wire casing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationField {
    Followers,
    Followings,
    MyGroups,
}

impl fmt::Display for RelationField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Followers => f.write_str("followers"),
            Self::Followings => f.write_str("followings"),
            Self::MyGroups => f.write_str("myGroups"),
        }
    }
}

/// A specific relationship set on a specific document.
///
/// The derived ordering sorts user sets before group sets, then by owner id,
/// which adapters use to take row locks in a stable order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RelationSet {
    Followers(UserId),
    Followings(UserId),
    MyGroups(UserId),
    GroupFollowers(GroupId),
}

impl RelationSet {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Followers(_) | Self::Followings(_) | Self::MyGroups(_) => EntityKind::User,
            Self::GroupFollowers(_) => EntityKind::Group,
        }
    }

    /// Identifier of the document that owns the set.
    pub fn owner(&self) -> Uuid {
        match self {
            Self::Followers(id) | Self::Followings(id) | Self::MyGroups(id) => *id.as_uuid(),
            Self::GroupFollowers(id) => *id.as_uuid(),
        }
    }

    pub fn field(&self) -> RelationField {
        match self {
            Self::Followers(_) | Self::GroupFollowers(_) => RelationField::Followers,
            Self::Followings(_) => RelationField::Followings,
            Self::MyGroups(_) => RelationField::MyGroups,
        }
    }
}

/// Set operation applied to a relationship set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SetOperation {
    Add,
    Remove,
}

/// One `addToSet` or `removeFromSet` mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SetMutation {
    pub target: RelationSet,
    pub operation: SetOperation,
    pub member: Uuid,
}

impl SetMutation {
    /// Add `member` to `target`.
    ///
    /// # Examples
    /// ```
    /// use socialgraph::domain::UserId;
    /// use socialgraph::domain::ports::{RelationSet, SetMutation, SetOperation};
    ///
    /// let (a, b) = (UserId::random(), UserId::random());
    /// let mutation = SetMutation::add(RelationSet::Followers(b), a);
    /// assert_eq!(mutation.operation, SetOperation::Add);
    /// assert_eq!(mutation.member, *a.as_uuid());
    /// ```
    pub fn add(target: RelationSet, member: impl Into<Uuid>) -> Self {
        Self {
            target,
            operation: SetOperation::Add,
            member: member.into(),
        }
    }

    /// Remove `member` from `target`.
    pub fn remove(target: RelationSet, member: impl Into<Uuid>) -> Self {
        Self {
            target,
            operation: SetOperation::Remove,
            member: member.into(),
        }
    }
}

define_port_error! {
    /// Errors raised by graph store adapters.
    pub enum GraphStoreError {
        /// Store connection could not be established.
        Connection { message: String } => "graph store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "graph store query failed: {message}",
        /// A batch referenced a document that does not exist. Nothing in the
        /// batch was applied.
        EntityNotFound { kind: EntityKind, id: Uuid } => "{kind} {id} does not exist",
    }
}

/// Port for reading documents and applying atomic set-mutation batches.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Fetch a user document by identifier.
    async fn find_user(&self, id: &UserId) -> Result<Option<User>, GraphStoreError>;

    /// Fetch a group document by identifier.
    async fn find_group(&self, id: &GroupId) -> Result<Option<Group>, GraphStoreError>;

    /// Apply every mutation in `batch` atomically.
    ///
    /// Fails with [`GraphStoreError::EntityNotFound`] without applying
    /// anything when a targeted document is missing.
    async fn apply(&self, batch: &[SetMutation]) -> Result<(), GraphStoreError>;
}
