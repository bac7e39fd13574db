//! In-process document store used when no database is configured and by the
//! integration tests.
//!
//! All documents sit behind one mutex, so every batch is applied while the
//! lock is held. A batch is validated in full before the first mutation is
//! written; a missing document leaves every set untouched.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::ports::{
    AccountRepository, AccountRepositoryError, EntityKind, GraphStore, GraphStoreError,
    RelationSet, SetMutation, SetOperation, StoredCredentials, UserRemoval,
};
use crate::domain::{
    Group, GroupId, GroupSummary, PageRequest, PasswordHash, ProfileChanges, User, UserId,
    UserSummary,
};

struct StoredUser {
    user: User,
    password_hash: PasswordHash,
}

#[derive(Default)]
struct Documents {
    users: HashMap<UserId, StoredUser>,
    groups: HashMap<GroupId, Group>,
}

impl Documents {
    fn user_name_taken(&self, user_name: &str, except: Option<&UserId>) -> bool {
        self.users.values().any(|stored| {
            stored.user.user_name().as_ref() == user_name && Some(stored.user.id()) != except
        })
    }

    fn contains(&self, target: &RelationSet) -> bool {
        match target {
            RelationSet::Followers(id)
            | RelationSet::Followings(id)
            | RelationSet::MyGroups(id) => self.users.contains_key(id),
            RelationSet::GroupFollowers(id) => self.groups.contains_key(id),
        }
    }

    /// Write one mutation whose target is known to exist.
    fn write(&mut self, mutation: &SetMutation) {
        let SetMutation {
            target,
            operation,
            member,
        } = *mutation;
        match target {
            RelationSet::Followers(id) => {
                if let Some(stored) = self.users.get_mut(&id) {
                    toggle(stored.user.followers_mut(), UserId::from_uuid(member), operation);
                }
            }
            RelationSet::Followings(id) => {
                if let Some(stored) = self.users.get_mut(&id) {
                    toggle(stored.user.followings_mut(), UserId::from_uuid(member), operation);
                }
            }
            RelationSet::MyGroups(id) => {
                if let Some(stored) = self.users.get_mut(&id) {
                    toggle(stored.user.my_groups_mut(), GroupId::from_uuid(member), operation);
                }
            }
            RelationSet::GroupFollowers(id) => {
                if let Some(group) = self.groups.get_mut(&id) {
                    toggle(group.followers_mut(), UserId::from_uuid(member), operation);
                }
            }
        }
    }
}

fn toggle<T: Ord>(set: &mut BTreeSet<T>, member: T, operation: SetOperation) {
    match operation {
        SetOperation::Add => {
            set.insert(member);
        }
        SetOperation::Remove => {
            set.remove(&member);
        }
    }
}

/// Mutex-guarded map of user and group documents.
///
/// # Examples
/// ```
/// use socialgraph::domain::{Group, GroupId, PasswordHash, User, UserId, UserName};
/// use socialgraph::outbound::InMemoryStore;
///
/// let store = InMemoryStore::default();
/// let ada = User::new(UserId::random(), UserName::new("ada_l").unwrap(), "Ada");
/// store.insert_user(ada, PasswordHash::new("$argon2id$...")).unwrap();
/// store.insert_group(Group::new(GroupId::random(), "Rustaceans")).unwrap();
/// ```
#[derive(Default)]
pub struct InMemoryStore {
    documents: Mutex<Documents>,
}

const POISONED: &str = "in-memory store lock poisoned";

impl InMemoryStore {
    fn lock(&self) -> Result<MutexGuard<'_, Documents>, String> {
        self.documents.lock().map_err(|_| POISONED.to_owned())
    }

    /// Seed a user document with its password hash.
    ///
    /// # Errors
    /// Returns [`AccountRepositoryError::DuplicateUserName`] when another
    /// user already holds the name.
    pub fn insert_user(
        &self,
        user: User,
        password_hash: PasswordHash,
    ) -> Result<(), AccountRepositoryError> {
        let mut documents = self.lock().map_err(AccountRepositoryError::connection)?;
        if documents.user_name_taken(user.user_name().as_ref(), Some(user.id())) {
            return Err(AccountRepositoryError::duplicate_user_name(user.user_name().as_ref()));
        }
        documents.users.insert(
            *user.id(),
            StoredUser {
                user,
                password_hash,
            },
        );
        Ok(())
    }

    /// Seed a group document.
    ///
    /// # Errors
    /// Fails only when the store lock is poisoned.
    pub fn insert_group(&self, group: Group) -> Result<(), GraphStoreError> {
        let mut documents = self.lock().map_err(GraphStoreError::connection)?;
        documents.groups.insert(*group.id(), group);
        Ok(())
    }
}

#[async_trait]
impl GraphStore for InMemoryStore {
    async fn find_user(&self, id: &UserId) -> Result<Option<User>, GraphStoreError> {
        let documents = self.lock().map_err(GraphStoreError::connection)?;
        Ok(documents.users.get(id).map(|stored| stored.user.clone()))
    }

    async fn find_group(&self, id: &GroupId) -> Result<Option<Group>, GraphStoreError> {
        let documents = self.lock().map_err(GraphStoreError::connection)?;
        Ok(documents.groups.get(id).cloned())
    }

    async fn apply(&self, batch: &[SetMutation]) -> Result<(), GraphStoreError> {
        let mut documents = self.lock().map_err(GraphStoreError::connection)?;
        if let Some(missing) = batch.iter().find(|mutation| !documents.contains(&mutation.target)) {
            debug!(
                kind = %missing.target.kind(),
                id = %missing.target.owner(),
                "batch rejected: target document missing"
            );
            return Err(GraphStoreError::entity_not_found(
                missing.target.kind(),
                missing.target.owner(),
            ));
        }
        for mutation in batch {
            documents.write(mutation);
        }
        Ok(())
    }
}

#[async_trait]
impl AccountRepository for InMemoryStore {
    async fn list_users(&self, page: PageRequest) -> Result<Vec<User>, AccountRepositoryError> {
        let documents = self.lock().map_err(AccountRepositoryError::connection)?;
        let mut users: Vec<&User> = documents.users.values().map(|stored| &stored.user).collect();
        users.sort_by(|a, b| {
            a.user_name()
                .cmp(b.user_name())
                .then_with(|| a.id().cmp(b.id()))
        });
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);
        Ok(users
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn user_summaries(
        &self,
        ids: &[UserId],
    ) -> Result<Vec<UserSummary>, AccountRepositoryError> {
        let documents = self.lock().map_err(AccountRepositoryError::connection)?;
        Ok(ids
            .iter()
            .filter_map(|id| documents.users.get(id))
            .map(|stored| UserSummary::from(&stored.user))
            .collect())
    }

    async fn group_summaries(
        &self,
        ids: &[GroupId],
    ) -> Result<Vec<GroupSummary>, AccountRepositoryError> {
        let documents = self.lock().map_err(AccountRepositoryError::connection)?;
        Ok(ids
            .iter()
            .filter_map(|id| documents.groups.get(id))
            .map(GroupSummary::from)
            .collect())
    }

    async fn update_profile(
        &self,
        id: &UserId,
        changes: &ProfileChanges,
    ) -> Result<Option<User>, AccountRepositoryError> {
        let mut documents = self.lock().map_err(AccountRepositoryError::connection)?;
        if let Some(user_name) = changes.user_name()
            && documents.user_name_taken(user_name.as_ref(), Some(id))
        {
            return Err(AccountRepositoryError::duplicate_user_name(user_name.as_ref()));
        }
        Ok(documents.users.get_mut(id).map(|stored| {
            changes.apply_to(&mut stored.user);
            stored.user.clone()
        }))
    }

    async fn update_password(
        &self,
        id: &UserId,
        hash: &PasswordHash,
        changed_at: DateTime<Utc>,
    ) -> Result<Option<User>, AccountRepositoryError> {
        let mut documents = self.lock().map_err(AccountRepositoryError::connection)?;
        Ok(documents.users.get_mut(id).map(|stored| {
            stored.password_hash = hash.clone();
            stored.user.set_password_changed_at(changed_at);
            stored.user.clone()
        }))
    }

    async fn find_credentials(
        &self,
        user_name: &str,
    ) -> Result<Option<StoredCredentials>, AccountRepositoryError> {
        let documents = self.lock().map_err(AccountRepositoryError::connection)?;
        Ok(documents
            .users
            .values()
            .find(|stored| stored.user.user_name().as_ref() == user_name)
            .map(|stored| StoredCredentials {
                user_id: *stored.user.id(),
                password_hash: stored.password_hash.clone(),
            }))
    }

    async fn delete_detached_user(
        &self,
        id: &UserId,
    ) -> Result<UserRemoval, AccountRepositoryError> {
        let mut documents = self.lock().map_err(AccountRepositoryError::connection)?;
        let Some(stored) = documents.users.get(id) else {
            return Ok(UserRemoval::Missing);
        };
        let user = &stored.user;
        if !(user.followers().is_empty()
            && user.followings().is_empty()
            && user.my_groups().is_empty())
        {
            debug!(user = %id, "delete refused: relationships still present");
            return Ok(UserRemoval::StillLinked);
        }
        documents.users.remove(id);
        Ok(UserRemoval::Removed)
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
