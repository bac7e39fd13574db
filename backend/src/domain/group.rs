//! Group data model.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::UserId;

/// Validation errors returned when parsing a [`GroupId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupValidationError {
    EmptyId,
    InvalidId,
}

impl fmt::Display for GroupValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyId => write!(f, "group id must not be empty"),
            Self::InvalidId => write!(f, "group id must be a valid UUID"),
        }
    }
}

impl std::error::Error for GroupValidationError {}

/// Stable group identifier stored as a UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GroupId(Uuid);

impl GroupId {
    /// Validate and construct a [`GroupId`] from borrowed input.
    pub fn new(id: impl AsRef<str>) -> Result<Self, GroupValidationError> {
        let raw = id.as_ref();
        if raw.is_empty() {
            return Err(GroupValidationError::EmptyId);
        }
        Uuid::parse_str(raw)
            .map(Self)
            .map_err(|_| GroupValidationError::InvalidId)
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<GroupId> for String {
    fn from(value: GroupId) -> Self {
        value.0.to_string()
    }
}

impl From<GroupId> for Uuid {
    fn from(value: GroupId) -> Self {
        value.0
    }
}

impl TryFrom<String> for GroupId {
    type Error = GroupValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Group document.
///
/// ## Invariants
/// - every user in `followers` lists this group in its `my_groups`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[schema(value_type = String)]
    id: GroupId,
    name: String,
    #[schema(value_type = Vec<String>)]
    followers: BTreeSet<UserId>,
}

impl Group {
    pub fn new(id: GroupId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            followers: BTreeSet::new(),
        }
    }

    pub fn with_followers(mut self, ids: impl IntoIterator<Item = UserId>) -> Self {
        self.followers = ids.into_iter().collect();
        self
    }

    pub fn id(&self) -> &GroupId {
        &self.id
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Members of the group.
    pub fn followers(&self) -> &BTreeSet<UserId> {
        &self.followers
    }

    pub(crate) fn followers_mut(&mut self) -> &mut BTreeSet<UserId> {
        &mut self.followers
    }
}
