//! Startup seeding of the in-memory store from a JSON file.
//!
//! There is no registration endpoint, so a development server without a
//! database would otherwise start empty. The seed file lists users (with
//! plaintext passwords, hashed on load) and groups:
//!
//! ```json
//! {
//!   "users": [{ "userName": "ada_l", "name": "Ada", "password": "correct horse", "isAdmin": true }],
//!   "groups": [{ "name": "Rustaceans" }]
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::domain::ports::PasswordHasher;
use crate::domain::{Group, GroupId, Password, User, UserId, UserName};
use crate::outbound::InMemoryStore;

/// Errors returned while loading or applying a seed file.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse seed file at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid seed entry '{entry}': {message}")]
    Invalid { entry: String, message: String },
    #[error("seeding task failed: {message}")]
    Task { message: String },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct SeedUser {
    id: Option<UserId>,
    user_name: String,
    name: String,
    password: String,
    #[serde(default)]
    is_admin: bool,
    bio: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct SeedGroup {
    id: Option<GroupId>,
    name: String,
}

/// Parsed seed file.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SeedDocument {
    #[serde(default)]
    users: Vec<SeedUser>,
    #[serde(default)]
    groups: Vec<SeedGroup>,
}

impl SeedDocument {
    /// Read and parse a seed file.
    ///
    /// # Errors
    /// Returns [`SeedError::Read`] or [`SeedError::Parse`].
    pub fn load(path: &Path) -> Result<Self, SeedError> {
        let contents = std::fs::read_to_string(path).map_err(|source| SeedError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| SeedError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Counts of documents written by [`seed_store`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedOutcome {
    pub users: usize,
    pub groups: usize,
}

/// Insert every seeded user and group into `store`.
///
/// Each seeded password is hashed with Argon2, so the work runs on the
/// blocking thread pool.
///
/// # Errors
/// Returns [`SeedError::Invalid`] for an invalid user name or password, a
/// duplicate user name, or a hashing failure, and [`SeedError::Task`] when
/// the blocking task dies.
pub async fn seed_store<H: PasswordHasher>(
    store: Arc<InMemoryStore>,
    seed: SeedDocument,
    hasher: Arc<H>,
) -> Result<SeedOutcome, SeedError> {
    tokio::task::spawn_blocking(move || write_seed(&store, seed, hasher.as_ref()))
        .await
        .map_err(|err| SeedError::Task {
            message: err.to_string(),
        })?
}

fn write_seed<H: PasswordHasher>(
    store: &InMemoryStore,
    seed: SeedDocument,
    hasher: &H,
) -> Result<SeedOutcome, SeedError> {
    let outcome = SeedOutcome {
        users: seed.users.len(),
        groups: seed.groups.len(),
    };

    for entry in seed.users {
        let invalid = |message: String| SeedError::Invalid {
            entry: entry.user_name.clone(),
            message,
        };
        let user_name =
            UserName::new(entry.user_name.as_str()).map_err(|err| invalid(err.to_string()))?;
        let password = Password::new(entry.password).map_err(|err| invalid(err.to_string()))?;
        let hash = hasher
            .hash(&password)
            .map_err(|err| invalid(err.to_string()))?;
        let user = User::new(entry.id.unwrap_or_else(UserId::random), user_name, entry.name)
            .with_bio(entry.bio)
            .with_admin(entry.is_admin);
        store
            .insert_user(user, hash)
            .map_err(|err| invalid(err.to_string()))?;
    }

    for entry in seed.groups {
        let group = Group::new(entry.id.unwrap_or_else(GroupId::random), entry.name.as_str());
        store.insert_group(group).map_err(|err| SeedError::Invalid {
            entry: entry.name,
            message: err.to_string(),
        })?;
    }

    info!(users = outcome.users, groups = outcome.groups, "in-memory store seeded");
    Ok(outcome)
}
