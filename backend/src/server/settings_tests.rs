//! Unit tests for server settings and the derived session policy.

use super::*;
use std::ffi::OsString;
use std::io::Write as _;

use env_lock::lock_env;
use rstest::rstest;
use tempfile::{NamedTempFile, TempDir};

const VARS: [&str; 9] = [
    "SOCIAL_BIND_ADDR",
    "SOCIAL_DATABASE_URL",
    "SOCIAL_POOL_SIZE",
    "SOCIAL_STORE_TIMEOUT_MS",
    "SOCIAL_SESSION_KEY_FILE",
    "SOCIAL_COOKIE_SECURE",
    "SOCIAL_SAME_SITE",
    "SOCIAL_ALLOW_EPHEMERAL_KEY",
    "SOCIAL_SEED_FILE",
];

fn load_with(overrides: &[(&str, &str)]) -> ServerSettings {
    let vars = VARS.map(|name| {
        let value = overrides
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| (*value).to_owned());
        (name, value)
    });
    let _guard = lock_env(vars);
    ServerSettings::load_from_iter([OsString::from("socialgraph")]).expect("settings should load")
}

fn key_file(len: usize) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create key file");
    file.write_all(&vec![b'k'; len]).expect("write key file");
    file
}

fn release_settings(key: &NamedTempFile) -> ServerSettings {
    ServerSettings {
        session_key_file: Some(key.path().to_path_buf()),
        cookie_secure: Some(true),
        same_site: Some("Strict".to_owned()),
        ..ServerSettings::default()
    }
}

#[rstest]
fn defaults_apply_when_nothing_is_set() {
    let settings = load_with(&[]);
    assert_eq!(
        settings.bind_addr().expect("bind addr"),
        "0.0.0.0:8080".parse::<SocketAddr>().expect("socket addr")
    );
    assert_eq!(settings.store_timeout(), DEFAULT_STORE_TIMEOUT);
    assert!(settings.pool_config().is_none());
    assert!(!settings.allow_ephemeral_key);
    assert_eq!(settings.session_key_path(), Path::new(SESSION_KEY_DEFAULT_PATH));
}

#[rstest]
fn environment_overrides_are_respected() {
    let settings = load_with(&[
        ("SOCIAL_BIND_ADDR", "127.0.0.1:9000"),
        ("SOCIAL_DATABASE_URL", "postgres://social@localhost/social"),
        ("SOCIAL_POOL_SIZE", "4"),
        ("SOCIAL_STORE_TIMEOUT_MS", "250"),
        ("SOCIAL_COOKIE_SECURE", "false"),
        ("SOCIAL_SAME_SITE", "Lax"),
    ]);

    assert_eq!(settings.bind_addr().expect("bind addr").port(), 9000);
    assert_eq!(settings.store_timeout(), Duration::from_millis(250));
    let pool = settings.pool_config().expect("pool config");
    assert_eq!(pool.database_url(), "postgres://social@localhost/social");
    assert_eq!(pool.max_size(), 4);
    assert_eq!(settings.cookie_secure, Some(false));
    assert_eq!(settings.same_site.as_deref(), Some("Lax"));
}

#[rstest]
fn zero_timeout_falls_back_to_default() {
    let settings = ServerSettings {
        store_timeout_ms: Some(0),
        ..ServerSettings::default()
    };
    assert_eq!(settings.store_timeout(), DEFAULT_STORE_TIMEOUT);
}

#[rstest]
fn malformed_bind_address_is_rejected() {
    let settings = ServerSettings {
        bind_addr: Some("localhost".to_owned()),
        ..ServerSettings::default()
    };
    assert!(matches!(
        settings.bind_addr(),
        Err(SettingsError::InvalidBindAddr { .. })
    ));
}

#[rstest]
fn release_accepts_an_explicit_policy() {
    let key = key_file(SESSION_KEY_MIN_LEN);
    let session = release_settings(&key)
        .session(BuildMode::Release)
        .expect("valid release settings");
    assert!(session.cookie_secure);
    assert_eq!(session.same_site, SameSite::Strict);
}

#[rstest]
fn release_requires_cookie_toggles() {
    let key = key_file(SESSION_KEY_MIN_LEN);
    let settings = ServerSettings {
        cookie_secure: None,
        ..release_settings(&key)
    };
    assert!(matches!(
        settings.session(BuildMode::Release),
        Err(SettingsError::Missing {
            name: "cookie_secure"
        })
    ));
}

#[rstest]
fn release_rejects_same_site_none_without_secure() {
    let key = key_file(SESSION_KEY_MIN_LEN);
    let settings = ServerSettings {
        cookie_secure: Some(false),
        same_site: Some("None".to_owned()),
        ..release_settings(&key)
    };
    assert!(matches!(
        settings.session(BuildMode::Release),
        Err(SettingsError::InsecureSameSiteNone)
    ));
}

#[rstest]
fn release_rejects_short_keys() {
    let key = key_file(16);
    assert!(matches!(
        release_settings(&key).session(BuildMode::Release),
        Err(SettingsError::KeyTooShort { length: 16, .. })
    ));
}

#[rstest]
#[case(false, true)]
#[case(true, false)]
fn missing_key_needs_ephemeral_opt_in(#[case] allow_ephemeral: bool, #[case] should_fail: bool) {
    let dir = TempDir::new().expect("temp dir");
    let settings = ServerSettings {
        session_key_file: Some(dir.path().join("absent")),
        cookie_secure: Some(true),
        same_site: Some("Strict".to_owned()),
        allow_ephemeral_key: allow_ephemeral,
        ..ServerSettings::default()
    };
    let result = settings.session(BuildMode::Release);
    assert_eq!(
        matches!(result, Err(SettingsError::KeyRead { .. })),
        should_fail
    );
}

#[rstest]
fn debug_builds_fall_back_to_development_defaults() {
    let dir = TempDir::new().expect("temp dir");
    let settings = ServerSettings {
        session_key_file: Some(dir.path().join("absent")),
        same_site: Some("sideways".to_owned()),
        ..ServerSettings::default()
    };
    let session = settings
        .session(BuildMode::Debug)
        .expect("debug settings fall back");
    assert!(session.cookie_secure);
    assert_eq!(session.same_site, SameSite::Lax);
}
