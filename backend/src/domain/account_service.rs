//! Account services: user queries, profile and password updates, account
//! deletion, and login.
//!
//! Deletion delegates relationship clean-up to [`RelationshipCommand`] and
//! only removes the user document once every edge is gone. Edges added by
//! concurrent requests after the cascade keep the document alive; the cascade
//! then runs again, a bounded number of times.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::domain::ports::{
    AccountRepository, AccountRepositoryError, GraphStore, GraphStoreError, LoginService,
    PasswordHasher, PasswordHasherError, RelationshipCommand, UserAccountCommand, UserRemoval,
    UsersQuery,
};
use crate::domain::{
    DEFAULT_STORE_TIMEOUT, Error, GroupId, LoginCredentials, PageRequest, Password, PasswordHash,
    ProfileChanges, User, UserId, UserPage, UserProfile,
};

/// Cascade-then-delete rounds before giving up on an account whose
/// relationships keep changing.
const DELETE_ATTEMPTS: u32 = 3;

/// Account service implementing [`UsersQuery`], [`UserAccountCommand`], and
/// [`LoginService`].
#[derive(Clone)]
pub struct AccountService<R, G, H, C> {
    accounts: Arc<R>,
    graph: Arc<G>,
    hasher: Arc<H>,
    relationships: Arc<C>,
    timeout: Duration,
}

impl<R, G, H, C> AccountService<R, G, H, C> {
    /// Create a new service with the given collaborators.
    pub fn new(accounts: Arc<R>, graph: Arc<G>, hasher: Arc<H>, relationships: Arc<C>) -> Self {
        Self {
            accounts,
            graph,
            hasher,
            relationships,
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

fn map_account_error(error: AccountRepositoryError) -> Error {
    match error {
        AccountRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("account repository unavailable: {message}"))
        }
        AccountRepositoryError::Query { message } => {
            Error::internal(format!("account repository error: {message}"))
        }
        AccountRepositoryError::DuplicateUserName { user_name } => {
            Error::conflict(format!("user name {user_name} is already taken")).with_details(
                json!({ "field": "userName", "value": user_name, "code": "user_name_taken" }),
            )
        }
    }
}

fn map_graph_error(error: GraphStoreError) -> Error {
    match error {
        GraphStoreError::Connection { message } => {
            Error::service_unavailable(format!("graph store unavailable: {message}"))
        }
        GraphStoreError::Query { message } => {
            Error::internal(format!("graph store error: {message}"))
        }
        GraphStoreError::EntityNotFound { kind, id } => {
            Error::not_found(format!("{kind} {id} not found"))
        }
    }
}

fn map_hasher_error(error: PasswordHasherError) -> Error {
    Error::internal(error.to_string())
}

fn user_not_found(id: &UserId) -> Error {
    Error::not_found(format!("user {id} not found"))
        .with_details(json!({ "entity": "user", "id": id, "code": "not_found" }))
}

impl<R, G, H, C> AccountService<R, G, H, C>
where
    R: AccountRepository,
    G: GraphStore,
    H: PasswordHasher,
    C: RelationshipCommand,
{
    async fn bounded<T, E, F>(&self, call: F, map: fn(E) -> Error) -> Result<T, Error>
    where
        F: Future<Output = Result<T, E>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(map),
            Err(_) => Err(Error::timeout("store call timed out").with_details(json!({
                "timeoutMs": u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }))),
        }
    }

    /// Argon2 is CPU-bound, so hashing runs on the blocking thread pool.
    async fn hash_password(&self, password: Password) -> Result<PasswordHash, Error> {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|err| Error::internal(format!("password hashing task failed: {err}")))?
            .map_err(map_hasher_error)
    }

    async fn verify_password(&self, candidate: &str, hash: PasswordHash) -> Result<bool, Error> {
        let hasher = Arc::clone(&self.hasher);
        let candidate = Zeroizing::new(candidate.to_owned());
        tokio::task::spawn_blocking(move || hasher.verify(candidate.as_str(), &hash))
            .await
            .map_err(|err| Error::internal(format!("password check task failed: {err}")))?
            .map_err(map_hasher_error)
    }

    async fn load_user(&self, id: &UserId) -> Result<User, Error> {
        self.bounded(self.graph.find_user(id), map_graph_error)
            .await?
            .ok_or_else(|| user_not_found(id))
    }
}

#[async_trait]
impl<R, G, H, C> UsersQuery for AccountService<R, G, H, C>
where
    R: AccountRepository,
    G: GraphStore,
    H: PasswordHasher,
    C: RelationshipCommand,
{
    async fn list_users(&self, page: PageRequest) -> Result<UserPage, Error> {
        let users = self
            .bounded(self.accounts.list_users(page), map_account_error)
            .await?;
        Ok(UserPage {
            users,
            limit: page.limit(),
            offset: page.offset(),
        })
    }

    async fn get_user(&self, id: &UserId) -> Result<UserProfile, Error> {
        let user = self.load_user(id).await?;
        let linked_users: Vec<UserId> = user
            .followers()
            .union(user.followings())
            .copied()
            .collect();
        let linked_groups: Vec<GroupId> = user.my_groups().iter().copied().collect();

        let user_summaries = self
            .bounded(
                self.accounts.user_summaries(&linked_users),
                map_account_error,
            )
            .await?;
        let group_summaries = self
            .bounded(
                self.accounts.group_summaries(&linked_groups),
                map_account_error,
            )
            .await?;
        Ok(UserProfile::populate(&user, user_summaries, group_summaries))
    }

    async fn find_account(&self, id: &UserId) -> Result<User, Error> {
        self.load_user(id).await
    }
}

#[async_trait]
impl<R, G, H, C> UserAccountCommand for AccountService<R, G, H, C>
where
    R: AccountRepository,
    G: GraphStore,
    H: PasswordHasher,
    C: RelationshipCommand,
{
    async fn update_profile(&self, id: &UserId, changes: ProfileChanges) -> Result<User, Error> {
        if changes.is_empty() {
            return Err(Error::invalid_request("update must change at least one field")
                .with_details(json!({ "code": "no_changes" })));
        }
        let updated = self
            .bounded(
                self.accounts.update_profile(id, &changes),
                map_account_error,
            )
            .await?
            .ok_or_else(|| user_not_found(id))?;
        info!(user = %id, "profile updated");
        Ok(updated)
    }

    async fn change_password(&self, id: &UserId, password: Password) -> Result<User, Error> {
        let hash = self.hash_password(password).await?;
        let updated = self
            .bounded(
                self.accounts.update_password(id, &hash, Utc::now()),
                map_account_error,
            )
            .await?
            .ok_or_else(|| user_not_found(id))?;
        info!(user = %id, "password changed");
        Ok(updated)
    }

    async fn delete_account(&self, id: &UserId) -> Result<(), Error> {
        for attempt in 1..=DELETE_ATTEMPTS {
            if let Err(err) = self.relationships.cascade_delete_user(id).await {
                warn!(user = %id, code = ?err.code(), "account kept: relationship clean-up failed");
                return Err(err);
            }
            let removal = self
                .bounded(self.accounts.delete_detached_user(id), map_account_error)
                .await?;
            match removal {
                UserRemoval::Removed => {
                    info!(user = %id, "account deleted");
                    return Ok(());
                }
                UserRemoval::Missing => return Err(user_not_found(id)),
                UserRemoval::StillLinked => {
                    debug!(user = %id, attempt, "relationships changed during deletion");
                }
            }
        }
        warn!(user = %id, attempts = DELETE_ATTEMPTS, "account kept: relationships keep changing");
        Err(
            Error::conflict("account gained relationships while being deleted")
                .with_details(json!({ "code": "relationships_changed" })),
        )
    }
}

#[async_trait]
impl<R, G, H, C> LoginService for AccountService<R, G, H, C>
where
    R: AccountRepository,
    G: GraphStore,
    H: PasswordHasher,
    C: RelationshipCommand,
{
    async fn authenticate(&self, credentials: &LoginCredentials) -> Result<UserId, Error> {
        let stored = self
            .bounded(
                self.accounts.find_credentials(credentials.username()),
                map_account_error,
            )
            .await?
            .ok_or_else(|| Error::unauthorized("invalid credentials"))?;
        let matches = self
            .verify_password(credentials.password(), stored.password_hash)
            .await?;
        if matches {
            Ok(stored.user_id)
        } else {
            Err(Error::unauthorized("invalid credentials"))
        }
    }
}

#[cfg(test)]
#[path = "account_service_tests.rs"]
mod tests;
