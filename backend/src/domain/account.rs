//! Account-facing value types: allow-listed profile changes, relationship
//! summaries, populated user views, and pagination.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use url::Url;
use utoipa::ToSchema;

use super::{Group, GroupId, User, UserId, UserName, UserValidationError};

/// Maximum length of the free-form `name` field.
pub const NAME_MAX: usize = 64;
/// Maximum length of a user biography.
pub const BIO_MAX: usize = 280;
/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;
/// Largest page size a caller may request.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Reasons a profile change is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileValidationError {
    NoChanges,
    EmptyName,
    NameTooLong { max: usize },
    UserName(UserValidationError),
    BioTooLong { max: usize },
    InvalidImageUrl { field: &'static str },
}

impl ProfileValidationError {
    /// Request field the error refers to, in wire casing.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::NoChanges => None,
            Self::EmptyName | Self::NameTooLong { .. } => Some("name"),
            Self::UserName(_) => Some("userName"),
            Self::BioTooLong { .. } => Some("bio"),
            Self::InvalidImageUrl { field } => Some(*field),
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoChanges => "no_changes",
            Self::EmptyName => "empty_name",
            Self::NameTooLong { .. } => "name_too_long",
            Self::UserName(_) => "invalid_user_name",
            Self::BioTooLong { .. } => "bio_too_long",
            Self::InvalidImageUrl { .. } => "invalid_url",
        }
    }
}

impl fmt::Display for ProfileValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoChanges => write!(f, "update must change at least one field"),
            Self::EmptyName => write!(f, "name must not be empty"),
            Self::NameTooLong { max } => write!(f, "name must be at most {max} characters"),
            Self::UserName(err) => err.fmt(f),
            Self::BioTooLong { max } => write!(f, "bio must be at most {max} characters"),
            Self::InvalidImageUrl { field } => {
                write!(f, "{field} must be an absolute http or https URL")
            }
        }
    }
}

impl std::error::Error for ProfileValidationError {}

fn validate_image_url(raw: String, field: &'static str) -> Result<String, ProfileValidationError> {
    let parsed = Url::parse(&raw).map_err(|_| ProfileValidationError::InvalidImageUrl { field })?;
    match parsed.scheme() {
        "http" | "https" => Ok(raw),
        _ => Err(ProfileValidationError::InvalidImageUrl { field }),
    }
}

/// Validated set of profile fields to overwrite. Absent fields stay as they
/// are.
///
/// Which fields a caller may touch is decided by the inbound adapter's
/// request type; this type only guarantees that whatever is present is valid.
///
/// # Examples
/// ```
/// use socialgraph::domain::ProfileChanges;
///
/// let changes = ProfileChanges::default()
///     .with_name("Ada")
///     .and_then(|c| c.with_bio("Analyst"))
///     .unwrap();
/// assert_eq!(changes.name(), Some("Ada"));
/// assert!(!changes.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileChanges {
    name: Option<String>,
    user_name: Option<UserName>,
    bio: Option<String>,
    profile_pic: Option<String>,
    cover_pic: Option<String>,
    is_admin: Option<bool>,
}

impl ProfileChanges {
    pub fn with_name(mut self, name: impl Into<String>) -> Result<Self, ProfileValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ProfileValidationError::EmptyName);
        }
        if name.chars().count() > NAME_MAX {
            return Err(ProfileValidationError::NameTooLong { max: NAME_MAX });
        }
        self.name = Some(name);
        Ok(self)
    }

    pub fn with_user_name(
        mut self,
        user_name: impl Into<String>,
    ) -> Result<Self, ProfileValidationError> {
        let user_name = UserName::new(user_name).map_err(ProfileValidationError::UserName)?;
        self.user_name = Some(user_name);
        Ok(self)
    }

    pub fn with_bio(mut self, bio: impl Into<String>) -> Result<Self, ProfileValidationError> {
        let bio = bio.into();
        if bio.chars().count() > BIO_MAX {
            return Err(ProfileValidationError::BioTooLong { max: BIO_MAX });
        }
        self.bio = Some(bio);
        Ok(self)
    }

    pub fn with_profile_pic(
        mut self,
        url: impl Into<String>,
    ) -> Result<Self, ProfileValidationError> {
        self.profile_pic = Some(validate_image_url(url.into(), "profilePic")?);
        Ok(self)
    }

    pub fn with_cover_pic(
        mut self,
        url: impl Into<String>,
    ) -> Result<Self, ProfileValidationError> {
        self.cover_pic = Some(validate_image_url(url.into(), "coverPic")?);
        Ok(self)
    }

    pub fn with_admin(mut self, is_admin: bool) -> Self {
        self.is_admin = Some(is_admin);
        self
    }

    /// Reject a change set that would not touch anything.
    pub fn ensure_not_empty(self) -> Result<Self, ProfileValidationError> {
        if self.is_empty() {
            Err(ProfileValidationError::NoChanges)
        } else {
            Ok(self)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.user_name.is_none()
            && self.bio.is_none()
            && self.profile_pic.is_none()
            && self.cover_pic.is_none()
            && self.is_admin.is_none()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn user_name(&self) -> Option<&UserName> {
        self.user_name.as_ref()
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

    pub fn is_admin(&self) -> Option<bool> {
        self.is_admin
    }

    /// Overwrite the present fields on `user`.
    pub(crate) fn apply_to(&self, user: &mut User) {
        if let Some(name) = &self.name {
            user.set_name(name.clone());
        }
        if let Some(user_name) = &self.user_name {
            user.set_user_name(user_name.clone());
        }
        if let Some(bio) = &self.bio {
            user.set_bio(bio.clone());
        }
        if let Some(url) = &self.profile_pic {
            user.set_profile_pic(url.clone());
        }
        if let Some(url) = &self.cover_pic {
            user.set_cover_pic(url.clone());
        }
        if let Some(is_admin) = self.is_admin {
            user.set_admin(is_admin);
        }
    }
}

/// Compact view of a user used when populating relationship lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[schema(value_type = String)]
    pub id: UserId,
    #[schema(value_type = String)]
    pub user_name: UserName,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: *user.id(),
            user_name: user.user_name().clone(),
        }
    }
}

/// Compact view of a group used when populating `myGroups`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    #[schema(value_type = String)]
    pub id: GroupId,
    pub name: String,
}

impl From<&Group> for GroupSummary {
    fn from(group: &Group) -> Self {
        Self {
            id: *group.id(),
            name: group.name().to_owned(),
        }
    }
}

/// A user with relationship ids replaced by summaries of the referenced
/// documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[schema(value_type = String)]
    pub id: UserId,
    #[schema(value_type = String)]
    pub user_name: UserName,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_pic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_pic: Option<String>,
    pub is_admin: bool,
    pub followers: Vec<UserSummary>,
    pub followings: Vec<UserSummary>,
    pub my_groups: Vec<GroupSummary>,
}

impl UserProfile {
    /// Populate `user`'s relationship sets from the supplied summaries.
    ///
    /// Ids with no matching summary point at documents that no longer exist
    /// and are left out.
    pub fn populate(user: &User, users: Vec<UserSummary>, groups: Vec<GroupSummary>) -> Self {
        let users: HashMap<UserId, UserSummary> =
            users.into_iter().map(|summary| (summary.id, summary)).collect();
        let groups: HashMap<GroupId, GroupSummary> =
            groups.into_iter().map(|summary| (summary.id, summary)).collect();
        let pick_users = |ids: &std::collections::BTreeSet<UserId>| {
            ids.iter()
                .filter_map(|id| users.get(id).cloned())
                .collect::<Vec<_>>()
        };

        Self {
            id: *user.id(),
            user_name: user.user_name().clone(),
            name: user.name().to_owned(),
            bio: user.bio().map(str::to_owned),
            profile_pic: user.profile_pic().map(str::to_owned),
            cover_pic: user.cover_pic().map(str::to_owned),
            is_admin: user.is_admin(),
            followers: pick_users(user.followers()),
            followings: pick_users(user.followings()),
            my_groups: user
                .my_groups()
                .iter()
                .filter_map(|id| groups.get(id).cloned())
                .collect(),
        }
    }
}

/// Pagination validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageValidationError {
    LimitOutOfRange { max: u32 },
}

impl fmt::Display for PageValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LimitOutOfRange { max } => write!(f, "limit must be between 1 and {max}"),
        }
    }
}

impl std::error::Error for PageValidationError {}

/// Offset pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    limit: u32,
    offset: u64,
}

impl PageRequest {
    /// Build a page window, applying defaults for missing values.
    ///
    /// # Examples
    /// ```
    /// use socialgraph::domain::PageRequest;
    ///
    /// let page = PageRequest::new(None, None).unwrap();
    /// assert_eq!(page.limit(), 20);
    /// assert!(PageRequest::new(Some(101), None).is_err());
    /// ```
    pub fn new(limit: Option<u32>, offset: Option<u64>) -> Result<Self, PageValidationError> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        if limit == 0 || limit > MAX_PAGE_LIMIT {
            return Err(PageValidationError::LimitOutOfRange {
                max: MAX_PAGE_LIMIT,
            });
        }
        Ok(Self {
            limit,
            offset: offset.unwrap_or(0),
        })
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

/// One page of users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserPage {
    pub users: Vec<User>,
    pub limit: u32,
    pub offset: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn user(name: &str) -> User {
        User::new(UserId::random(), UserName::new(name).expect("user name"), name)
    }

    #[rstest]
    fn empty_changes_are_rejected() {
        let result = ProfileChanges::default().ensure_not_empty();
        assert_eq!(result, Err(ProfileValidationError::NoChanges));
    }

    #[rstest]
    #[case("ftp://cdn.example.com/a.png")]
    #[case("not a url")]
    #[case("/relative/path.png")]
    fn image_urls_must_be_http(#[case] raw: &str) {
        let err = ProfileChanges::default()
            .with_profile_pic(raw)
            .expect_err("invalid url");
        assert_eq!(err.field(), Some("profilePic"));
        assert_eq!(err.code(), "invalid_url");
    }

    #[rstest]
    fn name_length_is_bounded() {
        let err = ProfileChanges::default()
            .with_name("n".repeat(NAME_MAX + 1))
            .expect_err("too long");
        assert_eq!(err, ProfileValidationError::NameTooLong { max: NAME_MAX });
    }

    #[rstest]
    fn apply_to_only_touches_present_fields() {
        let mut target = user("grace").with_bio(Some("original".into()));
        let changes = ProfileChanges::default()
            .with_name("Grace Hopper")
            .and_then(|c| c.with_cover_pic("https://cdn.example.com/c.png"))
            .expect("valid changes");

        changes.apply_to(&mut target);

        assert_eq!(target.name(), "Grace Hopper");
        assert_eq!(target.bio(), Some("original"));
        assert_eq!(target.cover_pic(), Some("https://cdn.example.com/c.png"));
        assert!(!target.is_admin());
    }

    #[rstest]
    fn populate_omits_missing_documents() {
        let follower = user("follower");
        let ghost = UserId::random();
        let group = Group::new(GroupId::random(), "Rustaceans");
        let subject = user("subject")
            .with_followers([*follower.id(), ghost])
            .with_groups([*group.id(), GroupId::random()]);

        let profile = UserProfile::populate(
            &subject,
            vec![UserSummary::from(&follower)],
            vec![GroupSummary::from(&group)],
        );

        assert_eq!(profile.followers, vec![UserSummary::from(&follower)]);
        assert!(profile.followings.is_empty());
        assert_eq!(profile.my_groups, vec![GroupSummary::from(&group)]);
    }

    #[rstest]
    #[case(Some(0))]
    #[case(Some(MAX_PAGE_LIMIT + 1))]
    fn page_limit_out_of_range(#[case] limit: Option<u32>) {
        assert!(PageRequest::new(limit, None).is_err());
    }

    #[rstest]
    fn page_defaults() {
        let page = PageRequest::new(None, Some(40)).expect("valid page");
        assert_eq!(page.limit(), DEFAULT_PAGE_LIMIT);
        assert_eq!(page.offset(), 40);
    }
}
