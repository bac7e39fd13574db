//! Relationship consistency service.
//!
//! Keeps both sides of every edge in sync. Paired mutations (follow,
//! unfollow, join, leave) go to the store as one atomic batch. Cascade
//! deletion fans out one such batch per edge of the deleted user, runs them
//! concurrently, and aggregates whatever fails into
//! [`RelationshipError::PartialFailure`]. Every store call is bounded by the
//! configured timeout.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use tracing::{debug, info, warn};

use crate::domain::ports::{
    EntityKind, GraphStore, GraphStoreError, RelationSet, RelationshipCommand, SetMutation,
};
use crate::domain::{DanglingEdge, Error, GroupId, RelationshipError, User, UserId};

/// Store timeout applied when none is configured.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Relationship service implementing [`RelationshipCommand`].
#[derive(Clone)]
pub struct RelationshipService<S> {
    store: Arc<S>,
    timeout: Duration,
}

impl<S> RelationshipService<S> {
    /// Create a service over `store` using [`DEFAULT_STORE_TIMEOUT`].
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// Override the per-call store timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn map_store_error(error: GraphStoreError) -> RelationshipError {
    match error {
        GraphStoreError::Connection { message } => RelationshipError::Unavailable { message },
        GraphStoreError::Query { message } => RelationshipError::Store { message },
        GraphStoreError::EntityNotFound { kind, id } => RelationshipError::not_found(kind, id),
    }
}

/// One edge of a user being deleted: the counterpart's side first, then the
/// user's own side.
type EdgeRemoval = [SetMutation; 2];

/// Removals that detach `user` from every document it is linked to.
fn cascade_removals(user: &User) -> Vec<EdgeRemoval> {
    let id = *user.id();
    let followers = user.followers().iter().map(|follower| {
        [
            SetMutation::remove(RelationSet::Followings(*follower), id),
            SetMutation::remove(RelationSet::Followers(id), *follower),
        ]
    });
    let followings = user.followings().iter().map(|followed| {
        [
            SetMutation::remove(RelationSet::Followers(*followed), id),
            SetMutation::remove(RelationSet::Followings(id), *followed),
        ]
    });
    let groups = user.my_groups().iter().map(|group| {
        [
            SetMutation::remove(RelationSet::GroupFollowers(*group), id),
            SetMutation::remove(RelationSet::MyGroups(id), *group),
        ]
    });
    followers.chain(followings).chain(groups).collect()
}

impl<S> RelationshipService<S>
where
    S: GraphStore,
{
    async fn bounded<T, F>(&self, call: F) -> Result<T, RelationshipError>
    where
        F: Future<Output = Result<T, GraphStoreError>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(map_store_error),
            Err(_) => Err(RelationshipError::Timeout {
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }

    async fn reload_user(&self, id: &UserId) -> Result<User, RelationshipError> {
        self.bounded(self.store.find_user(id))
            .await?
            .ok_or_else(|| RelationshipError::not_found(EntityKind::User, *id))
    }

    /// Make `actor` follow `target`.
    ///
    /// Adds `actor` to the target's followers and `target` to the actor's
    /// followings in one atomic batch. Repeating the call changes nothing.
    pub async fn follow(&self, actor: &UserId, target: &UserId) -> Result<User, RelationshipError> {
        if actor == target {
            return Err(RelationshipError::invalid_operation(
                "users cannot follow themselves",
            ));
        }
        let batch = [
            SetMutation::add(RelationSet::Followers(*target), *actor),
            SetMutation::add(RelationSet::Followings(*actor), *target),
        ];
        self.bounded(self.store.apply(&batch)).await?;
        info!(actor = %actor, target = %target, "user followed");
        self.reload_user(actor).await
    }

    /// Inverse of [`Self::follow`]. Removing an edge that does not exist
    /// succeeds.
    pub async fn unfollow(
        &self,
        actor: &UserId,
        target: &UserId,
    ) -> Result<User, RelationshipError> {
        if actor == target {
            return Err(RelationshipError::invalid_operation(
                "users cannot unfollow themselves",
            ));
        }
        let batch = [
            SetMutation::remove(RelationSet::Followers(*target), *actor),
            SetMutation::remove(RelationSet::Followings(*actor), *target),
        ];
        self.bounded(self.store.apply(&batch)).await?;
        info!(actor = %actor, target = %target, "user unfollowed");
        self.reload_user(actor).await
    }

    /// Add `actor` to `group`, recording the group in the actor's `myGroups`.
    pub async fn join_group(
        &self,
        actor: &UserId,
        group: &GroupId,
    ) -> Result<User, RelationshipError> {
        let batch = [
            SetMutation::add(RelationSet::MyGroups(*actor), *group),
            SetMutation::add(RelationSet::GroupFollowers(*group), *actor),
        ];
        self.bounded(self.store.apply(&batch)).await?;
        info!(actor = %actor, group = %group, "group joined");
        self.reload_user(actor).await
    }

    /// Inverse of [`Self::join_group`].
    pub async fn leave_group(
        &self,
        actor: &UserId,
        group: &GroupId,
    ) -> Result<User, RelationshipError> {
        let batch = [
            SetMutation::remove(RelationSet::MyGroups(*actor), *group),
            SetMutation::remove(RelationSet::GroupFollowers(*group), *actor),
        ];
        self.bounded(self.store.apply(&batch)).await?;
        info!(actor = %actor, group = %group, "group left");
        self.reload_user(actor).await
    }

    /// Detach both sides of one edge. When the counterpart is already gone
    /// only the user's own side is left to clear.
    async fn detach(&self, edge: &EdgeRemoval) -> Result<(), RelationshipError> {
        match self.bounded(self.store.apply(edge)).await {
            Err(RelationshipError::NotFound { entity, id }) => {
                debug!(%entity, %id, "cascade counterpart already gone");
                match self.bounded(self.store.apply(&edge[1..])).await {
                    Ok(()) | Err(RelationshipError::NotFound { .. }) => Ok(()),
                    Err(err) => Err(err),
                }
            }
            other => other,
        }
    }

    /// Remove every edge of `user`, on both sides.
    ///
    /// Each edge is its own atomic batch, so an edge that fails to detach
    /// stays intact on both documents and a retry finds it again. All edges
    /// are attempted even when some fail.
    pub async fn cascade_delete_user(&self, user: &UserId) -> Result<(), RelationshipError> {
        let document = self.reload_user(user).await?;
        let removals = cascade_removals(&document);

        let outcomes = join_all(removals.iter().map(|edge| async move {
            let outcome = self.detach(edge).await;
            (edge, outcome)
        }))
        .await;

        let dangling: Vec<DanglingEdge> = outcomes
            .into_iter()
            .filter_map(|(edge, outcome)| {
                outcome
                    .err()
                    .map(|err| DanglingEdge::from_mutation(&edge[0], err.to_string()))
            })
            .collect();

        if dangling.is_empty() {
            info!(user = %user, edges = removals.len(), "user detached from graph");
            Ok(())
        } else {
            warn!(
                user = %user,
                failed = dangling.len(),
                attempted = removals.len(),
                "cascade left edges in place"
            );
            Err(RelationshipError::PartialFailure { dangling })
        }
    }
}

#[async_trait]
impl<S> RelationshipCommand for RelationshipService<S>
where
    S: GraphStore,
{
    async fn follow(&self, actor: &UserId, target: &UserId) -> Result<User, Error> {
        RelationshipService::follow(self, actor, target)
            .await
            .map_err(Error::from)
    }

    async fn unfollow(&self, actor: &UserId, target: &UserId) -> Result<User, Error> {
        RelationshipService::unfollow(self, actor, target)
            .await
            .map_err(Error::from)
    }

    async fn join_group(&self, actor: &UserId, group: &GroupId) -> Result<User, Error> {
        RelationshipService::join_group(self, actor, group)
            .await
            .map_err(Error::from)
    }

    async fn leave_group(&self, actor: &UserId, group: &GroupId) -> Result<User, Error> {
        RelationshipService::leave_group(self, actor, group)
            .await
            .map_err(Error::from)
    }

    async fn cascade_delete_user(&self, user: &UserId) -> Result<(), Error> {
        RelationshipService::cascade_delete_user(self, user)
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
#[path = "relationship_service_tests.rs"]
mod tests;
