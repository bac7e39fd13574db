//! PostgreSQL-backed [`GraphStore`] adapter.
//!
//! A batch runs in one transaction. Every targeted row is locked with
//! `SELECT ... FOR UPDATE` before the first write, users before groups and
//! each in id order, so two batches touching the same pair of documents
//! always queue on the same lock first. Set semantics come from the guarded
//! `array_append` and `array_remove` statements below.

use std::collections::BTreeSet;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel::sql_query;
use diesel::sql_types;
use diesel_async::pooled_connection::bb8::PooledConnection;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, AsyncPgConnection, RunQueryDsl};
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{
    EntityKind, GraphStore, GraphStoreError, RelationSet, SetMutation, SetOperation,
};
use crate::domain::{Group, GroupId, User, UserId};

use super::error_mapping::{map_diesel_error, map_pool_error};
use super::models::{GroupRow, UserRow};
use super::pool::{DbPool, PoolError};
use super::schema::{groups, users};

/// Diesel implementation of the graph store port.
#[derive(Clone)]
pub struct DieselGraphStore {
    pool: DbPool,
}

impl DieselGraphStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

macro_rules! add_sql {
    ($table:literal, $column:literal) => {
        concat!(
            "UPDATE ", $table, " SET ", $column, " = array_append(", $column, ", $2) ",
            "WHERE id = $1 AND NOT ($2 = ANY(", $column, "))"
        )
    };
}

macro_rules! remove_sql {
    ($table:literal, $column:literal) => {
        concat!(
            "UPDATE ", $table, " SET ", $column, " = array_remove(", $column, ", $2) ",
            "WHERE id = $1"
        )
    };
}

/// Statement for one mutation. `$1` is the owning row id, `$2` the member.
const fn statement(target: &RelationSet, operation: SetOperation) -> &'static str {
    match (target, operation) {
        (RelationSet::Followers(_), SetOperation::Add) => add_sql!("users", "followers"),
        (RelationSet::Followers(_), SetOperation::Remove) => remove_sql!("users", "followers"),
        (RelationSet::Followings(_), SetOperation::Add) => add_sql!("users", "followings"),
        (RelationSet::Followings(_), SetOperation::Remove) => remove_sql!("users", "followings"),
        (RelationSet::MyGroups(_), SetOperation::Add) => add_sql!("users", "my_groups"),
        (RelationSet::MyGroups(_), SetOperation::Remove) => remove_sql!("users", "my_groups"),
        (RelationSet::GroupFollowers(_), SetOperation::Add) => add_sql!("groups", "followers"),
        (RelationSet::GroupFollowers(_), SetOperation::Remove) => {
            remove_sql!("groups", "followers")
        }
    }
}

/// Owners touched by a batch, split by table and sorted for lock ordering.
#[derive(Debug, Default, PartialEq, Eq)]
struct LockSet {
    users: BTreeSet<Uuid>,
    groups: BTreeSet<Uuid>,
}

impl LockSet {
    fn for_batch(batch: &[SetMutation]) -> Self {
        let mut locks = Self::default();
        for mutation in batch {
            let owner = mutation.target.owner();
            match mutation.target.kind() {
                EntityKind::User => locks.users.insert(owner),
                EntityKind::Group => locks.groups.insert(owner),
            };
        }
        locks
    }
}

enum ApplyError {
    Missing { kind: EntityKind, id: Uuid },
    Diesel(DieselError),
}

impl From<DieselError> for ApplyError {
    fn from(error: DieselError) -> Self {
        Self::Diesel(error)
    }
}

/// First expected id that the lock query did not return.
fn first_missing(expected: &BTreeSet<Uuid>, locked: &[Uuid]) -> Option<Uuid> {
    expected.iter().copied().find(|id| !locked.contains(id))
}

async fn lock_rows(conn: &mut AsyncPgConnection, locks: &LockSet) -> Result<(), ApplyError> {
    if !locks.users.is_empty() {
        let ids: Vec<Uuid> = locks.users.iter().copied().collect();
        let locked: Vec<Uuid> = users::table
            .filter(users::id.eq_any(&ids))
            .select(users::id)
            .order_by(users::id)
            .for_update()
            .load(conn)
            .await?;
        if let Some(id) = first_missing(&locks.users, &locked) {
            return Err(ApplyError::Missing {
                kind: EntityKind::User,
                id,
            });
        }
    }
    if !locks.groups.is_empty() {
        let ids: Vec<Uuid> = locks.groups.iter().copied().collect();
        let locked: Vec<Uuid> = groups::table
            .filter(groups::id.eq_any(&ids))
            .select(groups::id)
            .order_by(groups::id)
            .for_update()
            .load(conn)
            .await?;
        if let Some(id) = first_missing(&locks.groups, &locked) {
            return Err(ApplyError::Missing {
                kind: EntityKind::Group,
                id,
            });
        }
    }
    Ok(())
}

fn query_error(operation: &'static str) -> impl Fn(DieselError) -> GraphStoreError {
    move |error| {
        map_diesel_error(
            &error,
            operation,
            GraphStoreError::query,
            GraphStoreError::connection,
        )
    }
}

impl DieselGraphStore {
    async fn connection(
        &self,
    ) -> Result<PooledConnection<'_, AsyncPgConnection>, GraphStoreError> {
        self.pool
            .get()
            .await
            .map_err(|error: PoolError| map_pool_error(error, GraphStoreError::connection))
    }
}

#[async_trait]
impl GraphStore for DieselGraphStore {
    async fn find_user(&self, id: &UserId) -> Result<Option<User>, GraphStoreError> {
        let mut conn = self.connection().await?;
        let row = users::table
            .find(*id.as_uuid())
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(query_error("find user"))?;
        row.map(User::try_from)
            .transpose()
            .map_err(|err| GraphStoreError::query(format!("stored user {id} is invalid: {err}")))
    }

    async fn find_group(&self, id: &GroupId) -> Result<Option<Group>, GraphStoreError> {
        let mut conn = self.connection().await?;
        let row = groups::table
            .find(*id.as_uuid())
            .select(GroupRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(query_error("find group"))?;
        Ok(row.map(Group::from))
    }

    async fn apply(&self, batch: &[SetMutation]) -> Result<(), GraphStoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        let locks = LockSet::for_batch(batch);
        let mut pooled = self.connection().await?;
        let conn: &mut AsyncPgConnection = &mut pooled;

        let outcome = conn
            .transaction::<_, ApplyError, _>(|conn| {
                let locks = &locks;
                async move {
                    lock_rows(conn, locks).await?;
                    for mutation in batch {
                        sql_query(statement(&mutation.target, mutation.operation))
                            .bind::<sql_types::Uuid, _>(mutation.target.owner())
                            .bind::<sql_types::Uuid, _>(mutation.member)
                            .execute(conn)
                            .await?;
                    }
                    Ok(())
                }
                .scope_boxed()
            })
            .await;

        match outcome {
            Ok(()) => Ok(()),
            Err(ApplyError::Missing { kind, id }) => {
                debug!(%kind, %id, "batch rejected: target document missing");
                Err(GraphStoreError::entity_not_found(kind, id))
            }
            Err(ApplyError::Diesel(error)) => Err(query_error("apply batch")(error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(
        RelationSet::Followers(UserId::random()),
        SetOperation::Add,
        "UPDATE users SET followers = array_append(followers, $2) WHERE id = $1 AND NOT ($2 = ANY(followers))"
    )]
    #[case(
        RelationSet::MyGroups(UserId::random()),
        SetOperation::Remove,
        "UPDATE users SET my_groups = array_remove(my_groups, $2) WHERE id = $1"
    )]
    #[case(
        RelationSet::GroupFollowers(GroupId::random()),
        SetOperation::Add,
        "UPDATE groups SET followers = array_append(followers, $2) WHERE id = $1 AND NOT ($2 = ANY(followers))"
    )]
    fn statements_target_the_owning_column(
        #[case] target: RelationSet,
        #[case] operation: SetOperation,
        #[case] expected: &str,
    ) {
        assert_eq!(statement(&target, operation), expected);
    }

    #[rstest]
    fn lock_set_deduplicates_owners_per_table() {
        let (a, b) = (UserId::random(), UserId::random());
        let group = GroupId::random();
        let batch = [
            SetMutation::add(RelationSet::Followings(a), b),
            SetMutation::add(RelationSet::Followers(b), a),
            SetMutation::remove(RelationSet::MyGroups(a), group),
            SetMutation::remove(RelationSet::GroupFollowers(group), a),
        ];

        let locks = LockSet::for_batch(&batch);
        assert_eq!(locks.users, BTreeSet::from([*a.as_uuid(), *b.as_uuid()]));
        assert_eq!(locks.groups, BTreeSet::from([*group.as_uuid()]));
    }

    #[rstest]
    fn first_missing_reports_the_lowest_absent_id() {
        let ids = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        let expected: BTreeSet<Uuid> = ids.into_iter().collect();
        let mut sorted: Vec<Uuid> = expected.iter().copied().collect();
        let absent = sorted.remove(1);

        assert_eq!(first_missing(&expected, &sorted), Some(absent));
        assert_eq!(first_missing(&expected, &ids), None);
    }
}
