//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Conversions into domain documents live
//! here so the adapters stay thin.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::{
    Group, GroupId, GroupSummary, PasswordHash, User, UserId, UserName, UserSummary,
    UserValidationError,
};

use super::schema::{groups, users};

/// Row struct for reading a full user document.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub user_name: String,
    pub name: String,
    pub bio: Option<String>,
    pub profile_pic: Option<String>,
    pub cover_pic: Option<String>,
    pub is_admin: bool,
    pub password_changed_at: Option<DateTime<Utc>>,
    pub followers: Vec<Uuid>,
    pub followings: Vec<Uuid>,
    pub my_groups: Vec<Uuid>,
}

impl TryFrom<UserRow> for User {
    type Error = UserValidationError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let user_name = UserName::new(row.user_name)?;
        Ok(Self::new(UserId::from_uuid(row.id), user_name, row.name)
            .with_bio(row.bio)
            .with_profile_pic(row.profile_pic)
            .with_cover_pic(row.cover_pic)
            .with_admin(row.is_admin)
            .with_password_changed_at(row.password_changed_at)
            .with_followers(row.followers.into_iter().map(UserId::from_uuid))
            .with_followings(row.followings.into_iter().map(UserId::from_uuid))
            .with_groups(row.my_groups.into_iter().map(GroupId::from_uuid)))
    }
}

/// Projection used to populate relationship views.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserSummaryRow {
    pub id: Uuid,
    pub user_name: String,
}

impl TryFrom<UserSummaryRow> for UserSummary {
    type Error = UserValidationError;

    fn try_from(row: UserSummaryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: UserId::from_uuid(row.id),
            user_name: UserName::new(row.user_name)?,
        })
    }
}

/// Credential projection used by login.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CredentialsRow {
    pub id: Uuid,
    pub password_hash: String,
}

impl CredentialsRow {
    pub(crate) fn into_parts(self) -> (UserId, PasswordHash) {
        (UserId::from_uuid(self.id), PasswordHash::new(self.password_hash))
    }
}

/// Changeset for profile updates. `None` fields are left untouched.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = users)]
pub(crate) struct ProfileChangeset<'a> {
    pub user_name: Option<&'a str>,
    pub name: Option<&'a str>,
    pub bio: Option<&'a str>,
    pub profile_pic: Option<&'a str>,
    pub cover_pic: Option<&'a str>,
    pub is_admin: Option<bool>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Row struct for reading a group document.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = groups)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct GroupRow {
    pub id: Uuid,
    pub name: String,
    pub followers: Vec<Uuid>,
}

impl From<GroupRow> for Group {
    fn from(row: GroupRow) -> Self {
        Self::new(GroupId::from_uuid(row.id), row.name)
            .with_followers(row.followers.into_iter().map(UserId::from_uuid))
    }
}

/// Projection used to populate `myGroups`.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = groups)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct GroupSummaryRow {
    pub id: Uuid,
    pub name: String,
}

impl From<GroupSummaryRow> for GroupSummary {
    fn from(row: GroupSummaryRow) -> Self {
        Self {
            id: GroupId::from_uuid(row.id),
            name: row.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn row() -> UserRow {
        UserRow {
            id: Uuid::new_v4(),
            user_name: "ada_l".to_owned(),
            name: "Ada".to_owned(),
            bio: Some("analyst".to_owned()),
            profile_pic: None,
            cover_pic: None,
            is_admin: true,
            password_changed_at: None,
            followers: vec![Uuid::new_v4()],
            followings: Vec::new(),
            my_groups: vec![Uuid::new_v4(), Uuid::new_v4()],
        }
    }

    #[rstest]
    fn user_rows_convert_into_documents() {
        let row = row();
        let id = row.id;
        let user = User::try_from(row).expect("valid row");
        assert_eq!(user.id().as_uuid(), &id);
        assert_eq!(user.bio(), Some("analyst"));
        assert!(user.is_admin());
        assert_eq!(user.followers().len(), 1);
        assert_eq!(user.my_groups().len(), 2);
    }

    #[rstest]
    fn rows_with_invalid_user_names_are_rejected() {
        let mut row = row();
        row.user_name = "no spaces allowed".to_owned();
        assert!(User::try_from(row).is_err());
    }
}
