//! Server settings loaded via OrthoConfig and the session cookie policy
//! derived from them.
//!
//! Values layer CLI flags over `SOCIAL_*` environment variables over the
//! configuration file. Release builds refuse to start with an unsafe cookie
//! policy; debug builds warn and fall back to development defaults.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use actix_web::cookie::{Key, SameSite};
use ortho_config::OrthoConfig;
use serde::Deserialize;
use tracing::warn;
use zeroize::Zeroize;

use crate::domain::DEFAULT_STORE_TIMEOUT;
use crate::outbound::persistence::PoolConfig;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const SESSION_KEY_DEFAULT_PATH: &str = "/var/run/secrets/session_key";
const SESSION_KEY_MIN_LEN: usize = 64;
const SAMESITE_EXPECTED: &str = "Strict|Lax|None";

/// Raw configuration values for the HTTP server.
#[derive(Debug, Clone, Default, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "SOCIAL")]
pub struct ServerSettings {
    /// Socket address to listen on.
    pub bind_addr: Option<String>,
    /// PostgreSQL connection URL. The in-memory store is used when absent.
    pub database_url: Option<String>,
    /// Maximum number of pooled database connections.
    pub pool_size: Option<u32>,
    /// Upper bound for a single store call, in milliseconds.
    pub store_timeout_ms: Option<u64>,
    /// File holding the session cookie master key.
    pub session_key_file: Option<PathBuf>,
    /// Mark session cookies `Secure`.
    pub cookie_secure: Option<bool>,
    /// `SameSite` policy for session cookies (`Strict`, `Lax`, or `None`).
    pub same_site: Option<String>,
    /// Allow a generated session key when the key file cannot be read, even
    /// in release builds. Sessions do not survive a restart.
    #[ortho_config(default = false)]
    pub allow_ephemeral_key: bool,
    /// JSON file of users and groups loaded into the in-memory store.
    pub seed_file: Option<PathBuf>,
}

/// Build mode for session configuration validation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BuildMode {
    /// Debug builds tolerate defaults and emit warnings for missing toggles.
    Debug,
    /// Release builds require explicit, valid session toggles.
    Release,
}

impl BuildMode {
    #[must_use]
    pub fn from_debug_assertions() -> Self {
        if cfg!(debug_assertions) {
            Self::Debug
        } else {
            Self::Release
        }
    }

    const fn is_debug(self) -> bool {
        matches!(self, Self::Debug)
    }
}

/// Session cookie policy ready to hand to the session middleware.
pub struct SessionSettings {
    pub key: Key,
    pub cookie_secure: bool,
    pub same_site: SameSite,
}

/// Errors raised while validating server settings.
#[derive(thiserror::Error, Debug)]
pub enum SettingsError {
    #[error("invalid bind address '{value}': {message}")]
    InvalidBindAddr { value: String, message: String },
    #[error("missing required setting: {name}")]
    Missing { name: &'static str },
    #[error("invalid value for {name}='{value}'; expected {expected}")]
    Invalid {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("failed to read session key at {path}: {source}")]
    KeyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("session key at {path} too short: need >= {min_len} bytes, got {length}")]
    KeyTooShort {
        path: PathBuf,
        length: usize,
        min_len: usize,
    },
    #[error("same_site=None requires cookie_secure=true")]
    InsecureSameSiteNone,
}

impl ServerSettings {
    /// Parsed listen address, defaulting to `0.0.0.0:8080`.
    ///
    /// # Errors
    /// Returns [`SettingsError::InvalidBindAddr`] when the value is not a
    /// socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let raw = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        raw.parse().map_err(|err: std::net::AddrParseError| SettingsError::InvalidBindAddr {
            value: raw.to_owned(),
            message: err.to_string(),
        })
    }

    /// Per-call store timeout. Zero or unset means the default.
    pub fn store_timeout(&self) -> Duration {
        self.store_timeout_ms
            .filter(|ms| *ms > 0)
            .map_or(DEFAULT_STORE_TIMEOUT, Duration::from_millis)
    }

    /// Pool configuration when a database URL is set.
    pub fn pool_config(&self) -> Option<PoolConfig> {
        let url = self.database_url.as_deref()?;
        let config = PoolConfig::new(url);
        Some(match self.pool_size {
            Some(size) if size > 0 => config.with_max_size(size),
            _ => config,
        })
    }

    pub fn session_key_path(&self) -> &Path {
        self.session_key_file
            .as_deref()
            .unwrap_or_else(|| Path::new(SESSION_KEY_DEFAULT_PATH))
    }

    /// Validate the cookie policy and load the session key.
    ///
    /// # Errors
    /// Release builds fail on missing or unsafe toggles and, unless
    /// `allow_ephemeral_key` is set, on an unreadable or short key file.
    /// Debug builds warn and fall back to defaults instead.
    pub fn session(&self, mode: BuildMode) -> Result<SessionSettings, SettingsError> {
        let cookie_secure = self.cookie_secure(mode)?;
        let same_site = self.same_site(mode, cookie_secure)?;
        let key = self.session_key(mode)?;
        Ok(SessionSettings {
            key,
            cookie_secure,
            same_site,
        })
    }

    fn cookie_secure(&self, mode: BuildMode) -> Result<bool, SettingsError> {
        match self.cookie_secure {
            Some(flag) => Ok(flag),
            None if mode.is_debug() => {
                warn!("cookie_secure not set; defaulting to secure");
                Ok(true)
            }
            None => Err(SettingsError::Missing {
                name: "cookie_secure",
            }),
        }
    }

    fn same_site(&self, mode: BuildMode, cookie_secure: bool) -> Result<SameSite, SettingsError> {
        let default_same_site = if mode.is_debug() {
            SameSite::Lax
        } else {
            SameSite::Strict
        };
        let Some(value) = self.same_site.as_deref() else {
            if mode.is_debug() {
                warn!("same_site not set; using default");
                return Ok(default_same_site);
            }
            return Err(SettingsError::Missing { name: "same_site" });
        };

        match value.to_ascii_lowercase().as_str() {
            "lax" => Ok(SameSite::Lax),
            "strict" => Ok(SameSite::Strict),
            "none" if cookie_secure => Ok(SameSite::None),
            "none" if mode.is_debug() => {
                warn!("same_site=None without secure cookies; browsers may reject the cookie");
                Ok(SameSite::None)
            }
            "none" => Err(SettingsError::InsecureSameSiteNone),
            _ if mode.is_debug() => {
                warn!(value, "invalid same_site, using default");
                Ok(default_same_site)
            }
            _ => Err(SettingsError::Invalid {
                name: "same_site",
                value: value.to_owned(),
                expected: SAMESITE_EXPECTED,
            }),
        }
    }

    fn session_key(&self, mode: BuildMode) -> Result<Key, SettingsError> {
        let path = self.session_key_path();
        let fallback_allowed = mode.is_debug() || self.allow_ephemeral_key;
        match std::fs::read(path) {
            Ok(mut bytes) => {
                let length = bytes.len();
                if length < SESSION_KEY_MIN_LEN {
                    bytes.zeroize();
                    if fallback_allowed {
                        warn!(path = %path.display(), length, "session key too short; using temporary key");
                        return Ok(Key::generate());
                    }
                    return Err(SettingsError::KeyTooShort {
                        path: path.to_path_buf(),
                        length,
                        min_len: SESSION_KEY_MIN_LEN,
                    });
                }
                let key = Key::derive_from(&bytes);
                bytes.zeroize();
                Ok(key)
            }
            Err(error) if fallback_allowed => {
                warn!(path = %path.display(), %error, "using temporary session key (dev only)");
                Ok(Key::generate())
            }
            Err(source) => Err(SettingsError::KeyRead {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
