//! User data model.
//!
//! A user document embeds its side of every relationship: who follows it,
//! whom it follows, and which groups it belongs to. The sets are kept in
//! [`BTreeSet`]s so membership has set semantics and serialises in a stable
//! order.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::GroupId;

/// Validation errors returned when constructing user value types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    EmptyId,
    InvalidId,
    EmptyUserName,
    UserNameTooShort { min: usize },
    UserNameTooLong { max: usize },
    UserNameInvalidCharacters,
}

impl fmt::Display for UserValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyId => write!(f, "user id must not be empty"),
            Self::InvalidId => write!(f, "user id must be a valid UUID"),
            Self::EmptyUserName => write!(f, "user name must not be empty"),
            Self::UserNameTooShort { min } => {
                write!(f, "user name must be at least {min} characters")
            }
            Self::UserNameTooLong { max } => {
                write!(f, "user name must be at most {max} characters")
            }
            Self::UserNameInvalidCharacters => write!(
                f,
                "user name may only contain letters, numbers, dots, or underscores",
            ),
        }
    }
}

impl std::error::Error for UserValidationError {}

/// Stable user identifier stored as a UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(Uuid);

impl UserId {
    /// Validate and construct a [`UserId`] from borrowed input.
    ///
    /// # Examples
    /// ```
    /// use socialgraph::domain::UserId;
    ///
    /// let id = UserId::new("3fa85f64-5717-4562-b3fc-2c963f66afa6").unwrap();
    /// assert_eq!(id.to_string(), "3fa85f64-5717-4562-b3fc-2c963f66afa6");
    /// assert!(UserId::new("not-a-uuid").is_err());
    /// ```
    pub fn new(id: impl AsRef<str>) -> Result<Self, UserValidationError> {
        let raw = id.as_ref();
        if raw.is_empty() {
            return Err(UserValidationError::EmptyId);
        }
        if raw.trim() != raw {
            return Err(UserValidationError::InvalidId);
        }
        let parsed = Uuid::parse_str(raw).map_err(|_| UserValidationError::InvalidId)?;
        Ok(Self(parsed))
    }

    /// Wrap an already-parsed UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Generate a new random [`UserId`].
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0.to_string()
    }
}

impl From<UserId> for Uuid {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl TryFrom<String> for UserId {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Unique handle used to log in and to label relationship summaries.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserName(String);

/// Minimum allowed length for a user name.
pub const USER_NAME_MIN: usize = 3;
/// Maximum allowed length for a user name.
pub const USER_NAME_MAX: usize = 32;

static USER_NAME_RE: OnceLock<Regex> = OnceLock::new();

fn user_name_regex() -> &'static Regex {
    USER_NAME_RE.get_or_init(|| {
        // Length is enforced separately; this regex constrains allowed characters.
        let pattern = "^[A-Za-z0-9_.]+$";
        Regex::new(pattern)
            .unwrap_or_else(|error| panic!("user name regex failed to compile: {error}"))
    })
}

impl UserName {
    /// Validate and construct a [`UserName`] from owned input.
    pub fn new(user_name: impl Into<String>) -> Result<Self, UserValidationError> {
        let user_name = user_name.into();
        if user_name.trim().is_empty() {
            return Err(UserValidationError::EmptyUserName);
        }

        let length = user_name.chars().count();
        if length < USER_NAME_MIN {
            return Err(UserValidationError::UserNameTooShort {
                min: USER_NAME_MIN,
            });
        }
        if length > USER_NAME_MAX {
            return Err(UserValidationError::UserNameTooLong {
                max: USER_NAME_MAX,
            });
        }

        if !user_name_regex().is_match(&user_name) {
            return Err(UserValidationError::UserNameInvalidCharacters);
        }

        Ok(Self(user_name))
    }
}

impl AsRef<str> for UserName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for UserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<UserName> for String {
    fn from(value: UserName) -> Self {
        value.0
    }
}

impl TryFrom<String> for UserName {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Application user document.
///
/// ## Invariants
/// - `followers` and `followings` mirror each other across documents: if A
///   lists B in `followers`, B lists A in `followings`.
/// - every group in `my_groups` lists this user in its `followers`.
///
/// The password hash never lives on this type, and `password_changed_at` is
/// not serialised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[schema(value_type = String, example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    id: UserId,
    #[schema(value_type = String, example = "ada_l")]
    user_name: UserName,
    #[schema(example = "Ada Lovelace")]
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    profile_pic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cover_pic: Option<String>,
    is_admin: bool,
    #[serde(skip)]
    password_changed_at: Option<DateTime<Utc>>,
    #[schema(value_type = Vec<String>)]
    followers: BTreeSet<UserId>,
    #[schema(value_type = Vec<String>)]
    followings: BTreeSet<UserId>,
    #[schema(value_type = Vec<String>)]
    my_groups: BTreeSet<GroupId>,
}

impl User {
    /// Build a user with no relationships and default profile fields.
    ///
    /// # Examples
    /// ```
    /// use socialgraph::domain::{User, UserId, UserName};
    ///
    /// let user = User::new(UserId::random(), UserName::new("ada_l").unwrap(), "Ada");
    /// assert!(user.followers().is_empty());
    /// assert!(!user.is_admin());
    /// ```
    pub fn new(id: UserId, user_name: UserName, name: impl Into<String>) -> Self {
        Self {
            id,
            user_name,
            name: name.into(),
            bio: None,
            profile_pic: None,
            cover_pic: None,
            is_admin: false,
            password_changed_at: None,
            followers: BTreeSet::new(),
            followings: BTreeSet::new(),
            my_groups: BTreeSet::new(),
        }
    }

    pub fn with_bio(mut self, bio: Option<String>) -> Self {
        self.bio = bio;
        self
    }

    pub fn with_profile_pic(mut self, url: Option<String>) -> Self {
        self.profile_pic = url;
        self
    }

    pub fn with_cover_pic(mut self, url: Option<String>) -> Self {
        self.cover_pic = url;
        self
    }

    pub fn with_admin(mut self, is_admin: bool) -> Self {
        self.is_admin = is_admin;
        self
    }

    pub fn with_password_changed_at(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.password_changed_at = at;
        self
    }

    pub fn with_followers(mut self, ids: impl IntoIterator<Item = UserId>) -> Self {
        self.followers = ids.into_iter().collect();
        self
    }

    pub fn with_followings(mut self, ids: impl IntoIterator<Item = UserId>) -> Self {
        self.followings = ids.into_iter().collect();
        self
    }

    pub fn with_groups(mut self, ids: impl IntoIterator<Item = GroupId>) -> Self {
        self.my_groups = ids.into_iter().collect();
        self
    }

    /// Stable user identifier.
    pub fn id(&self) -> &UserId {
        &self.id
    }

    pub fn user_name(&self) -> &UserName {
        &self.user_name
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn bio(&self) -> Option<&str> {
        self.bio.as_deref()
    }

    pub fn profile_pic(&self) -> Option<&str> {
        self.profile_pic.as_deref()
    }

    pub fn cover_pic(&self) -> Option<&str> {
        self.cover_pic.as_deref()
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    /// When the password was last changed, if ever.
    pub fn password_changed_at(&self) -> Option<DateTime<Utc>> {
        self.password_changed_at
    }

    /// Users following this user.
    pub fn followers(&self) -> &BTreeSet<UserId> {
        &self.followers
    }

    /// Users this user follows.
    pub fn followings(&self) -> &BTreeSet<UserId> {
        &self.followings
    }

    /// Groups this user has joined.
    pub fn my_groups(&self) -> &BTreeSet<GroupId> {
        &self.my_groups
    }

    pub(crate) fn followers_mut(&mut self) -> &mut BTreeSet<UserId> {
        &mut self.followers
    }

    pub(crate) fn followings_mut(&mut self) -> &mut BTreeSet<UserId> {
        &mut self.followings
    }

    pub(crate) fn my_groups_mut(&mut self) -> &mut BTreeSet<GroupId> {
        &mut self.my_groups
    }

    pub(crate) fn set_user_name(&mut self, user_name: UserName) {
        self.user_name = user_name;
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn set_bio(&mut self, bio: String) {
        self.bio = Some(bio);
    }

    pub(crate) fn set_profile_pic(&mut self, url: String) {
        self.profile_pic = Some(url);
    }

    pub(crate) fn set_cover_pic(&mut self, url: String) {
        self.cover_pic = Some(url);
    }

    pub(crate) fn set_admin(&mut self, is_admin: bool) {
        self.is_admin = is_admin;
    }

    pub(crate) fn set_password_changed_at(&mut self, at: DateTime<Utc>) {
        self.password_changed_at = Some(at);
    }
}
