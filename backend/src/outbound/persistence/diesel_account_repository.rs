//! PostgreSQL-backed [`AccountRepository`] adapter.
//!
//! Relationship arrays are never written here; profile and password updates
//! touch only their own columns so they cannot race with graph batches.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::dsl::exists;
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel::sql_query;
use diesel::sql_types;
use diesel_async::pooled_connection::bb8::PooledConnection;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{
    AccountRepository, AccountRepositoryError, StoredCredentials, UserRemoval,
};
use crate::domain::{
    GroupId, GroupSummary, PageRequest, PasswordHash, ProfileChanges, User, UserId, UserSummary,
};

use super::error_mapping::{is_unique_violation, map_diesel_error, map_pool_error};
use super::models::{CredentialsRow, GroupSummaryRow, ProfileChangeset, UserRow, UserSummaryRow};
use super::pool::DbPool;
use super::schema::{groups, users};

/// Unique index guarding `users.user_name`.
const USER_NAME_CONSTRAINT: &str = "users_user_name_key";

/// Deletes a user row only while its relationship arrays are empty.
///
/// Graph batches hold `FOR UPDATE` on the row while writing, so the `WHERE`
/// clause is re-checked against their committed arrays.
const DELETE_DETACHED_USER_SQL: &str = "DELETE FROM users WHERE id = $1 \
    AND cardinality(followers) = 0 \
    AND cardinality(followings) = 0 \
    AND cardinality(my_groups) = 0";

/// Diesel implementation of the account repository port.
#[derive(Clone)]
pub struct DieselAccountRepository {
    pool: DbPool,
}

impl DieselAccountRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn connection(
        &self,
    ) -> Result<PooledConnection<'_, AsyncPgConnection>, AccountRepositoryError> {
        self.pool
            .get()
            .await
            .map_err(|error| map_pool_error(error, AccountRepositoryError::connection))
    }
}

fn query_error(operation: &'static str) -> impl Fn(DieselError) -> AccountRepositoryError {
    move |error| {
        map_diesel_error(
            &error,
            operation,
            AccountRepositoryError::query,
            AccountRepositoryError::connection,
        )
    }
}

fn to_user(row: UserRow) -> Result<User, AccountRepositoryError> {
    let id = row.id;
    User::try_from(row)
        .map_err(|err| AccountRepositoryError::query(format!("stored user {id} is invalid: {err}")))
}

/// Reorder rows to follow `ids`, skipping ids with no row.
fn in_request_order<T>(ids: &[Uuid], rows: Vec<(Uuid, T)>) -> Vec<T> {
    let mut by_id: HashMap<Uuid, T> = rows.into_iter().collect();
    ids.iter().filter_map(|id| by_id.remove(id)).collect()
}

fn changeset(changes: &ProfileChanges, now: DateTime<Utc>) -> ProfileChangeset<'_> {
    ProfileChangeset {
        user_name: changes.user_name().map(AsRef::as_ref),
        name: changes.name(),
        bio: changes.bio(),
        profile_pic: changes.profile_pic(),
        cover_pic: changes.cover_pic(),
        is_admin: changes.is_admin(),
        updated_at: Some(now),
    }
}

#[async_trait]
impl AccountRepository for DieselAccountRepository {
    async fn list_users(&self, page: PageRequest) -> Result<Vec<User>, AccountRepositoryError> {
        let mut conn = self.connection().await?;
        let offset = i64::try_from(page.offset()).unwrap_or(i64::MAX);
        let rows: Vec<UserRow> = users::table
            .select(UserRow::as_select())
            .order_by((users::user_name, users::id))
            .limit(i64::from(page.limit()))
            .offset(offset)
            .load(&mut conn)
            .await
            .map_err(query_error("list users"))?;
        rows.into_iter().map(to_user).collect()
    }

    async fn user_summaries(
        &self,
        ids: &[UserId],
    ) -> Result<Vec<UserSummary>, AccountRepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let uuids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let mut conn = self.connection().await?;
        let rows: Vec<UserSummaryRow> = users::table
            .filter(users::id.eq_any(&uuids))
            .select(UserSummaryRow::as_select())
            .load(&mut conn)
            .await
            .map_err(query_error("load user summaries"))?;
        let summaries = rows
            .into_iter()
            .map(|row| {
                let id = row.id;
                UserSummary::try_from(row).map(|summary| (id, summary)).map_err(|err| {
                    AccountRepositoryError::query(format!("stored user {id} is invalid: {err}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(in_request_order(&uuids, summaries))
    }

    async fn group_summaries(
        &self,
        ids: &[GroupId],
    ) -> Result<Vec<GroupSummary>, AccountRepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let uuids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let mut conn = self.connection().await?;
        let rows: Vec<GroupSummaryRow> = groups::table
            .filter(groups::id.eq_any(&uuids))
            .select(GroupSummaryRow::as_select())
            .load(&mut conn)
            .await
            .map_err(query_error("load group summaries"))?;
        let summaries = rows
            .into_iter()
            .map(|row| (row.id, GroupSummary::from(row)))
            .collect();
        Ok(in_request_order(&uuids, summaries))
    }

    async fn update_profile(
        &self,
        id: &UserId,
        changes: &ProfileChanges,
    ) -> Result<Option<User>, AccountRepositoryError> {
        let mut conn = self.connection().await?;
        let result = diesel::update(users::table.find(*id.as_uuid()))
            .set(&changeset(changes, Utc::now()))
            .returning(UserRow::as_returning())
            .get_result(&mut conn)
            .await
            .optional();
        match result {
            Ok(row) => row.map(to_user).transpose(),
            Err(error) if is_unique_violation(&error, USER_NAME_CONSTRAINT) => {
                let taken = changes.user_name().map(ToString::to_string).unwrap_or_default();
                Err(AccountRepositoryError::duplicate_user_name(taken))
            }
            Err(error) => Err(query_error("update profile")(error)),
        }
    }

    async fn update_password(
        &self,
        id: &UserId,
        hash: &PasswordHash,
        changed_at: DateTime<Utc>,
    ) -> Result<Option<User>, AccountRepositoryError> {
        let mut conn = self.connection().await?;
        let row = diesel::update(users::table.find(*id.as_uuid()))
            .set((
                users::password_hash.eq(hash.as_str()),
                users::password_changed_at.eq(Some(changed_at)),
                users::updated_at.eq(changed_at),
            ))
            .returning(UserRow::as_returning())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(query_error("update password"))?;
        row.map(to_user).transpose()
    }

    async fn find_credentials(
        &self,
        user_name: &str,
    ) -> Result<Option<StoredCredentials>, AccountRepositoryError> {
        let mut conn = self.connection().await?;
        let row: Option<CredentialsRow> = users::table
            .filter(users::user_name.eq(user_name))
            .select(CredentialsRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(query_error("find credentials"))?;
        Ok(row.map(|row| {
            let (user_id, password_hash) = row.into_parts();
            StoredCredentials {
                user_id,
                password_hash,
            }
        }))
    }

    async fn delete_detached_user(
        &self,
        id: &UserId,
    ) -> Result<UserRemoval, AccountRepositoryError> {
        let mut conn = self.connection().await?;
        let deleted = sql_query(DELETE_DETACHED_USER_SQL)
            .bind::<sql_types::Uuid, _>(*id.as_uuid())
            .execute(&mut conn)
            .await
            .map_err(query_error("delete user"))?;
        if deleted > 0 {
            return Ok(UserRemoval::Removed);
        }
        let exists: bool = diesel::select(exists(users::table.find(*id.as_uuid())))
            .get_result(&mut conn)
            .await
            .map_err(query_error("check user exists"))?;
        Ok(if exists {
            UserRemoval::StillLinked
        } else {
            UserRemoval::Missing
        })
    }
}
