//! Test fixtures: user profiles and suite configuration.
//!
//! Profiles load from a JSON file when one is provided and fall back to the
//! built-in set otherwise, so the suite runs out of the box. Suite
//! configuration reads environment overrides on top of defaults.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::result::{EnsayoError, EnsayoResult};
use crate::session::{Engine, SessionConfig};

/// One username/password pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Login username
    pub username: String,
    /// Login password
    pub password: String,
}

impl Credentials {
    /// Create credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Named credential sets for the suite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfiles {
    profiles: BTreeMap<String, Credentials>,
}

impl UserProfiles {
    /// The built-in profile set.
    #[must_use]
    pub fn builtin() -> Self {
        let mut profiles = BTreeMap::new();
        let _ = profiles.insert(
            "valid_user".to_string(),
            Credentials::new("tomsmith", "SuperSecretPassword!"),
        );
        let _ = profiles.insert(
            "invalid_user".to_string(),
            Credentials::new("invalid_user", "wrong_password"),
        );
        Self { profiles }
    }

    /// Load profiles from a JSON file of `{name: {username, password}}`.
    ///
    /// # Errors
    ///
    /// Returns [`EnsayoError::Fixture`] when the file cannot be read or
    /// parsed.
    pub fn load(path: &Path) -> EnsayoResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|err| EnsayoError::Fixture {
            message: format!("cannot read {}: {err}", path.display()),
        })?;
        let profiles: BTreeMap<String, Credentials> =
            serde_json::from_str(&raw).map_err(|err| EnsayoError::Fixture {
                message: format!("cannot parse {}: {err}", path.display()),
            })?;
        Ok(Self { profiles })
    }

    /// Load from a file when it exists, otherwise fall back to the built-in
    /// set. Parse failures still error; only absence falls back.
    ///
    /// # Errors
    ///
    /// Returns [`EnsayoError::Fixture`] when an existing file cannot be
    /// parsed.
    pub fn load_or_builtin(path: &Path) -> EnsayoResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no profile file, using built-in users");
            Ok(Self::builtin())
        }
    }

    /// Look up a profile by name.
    ///
    /// # Errors
    ///
    /// Returns [`EnsayoError::Fixture`] when no profile has that name.
    pub fn get(&self, name: &str) -> EnsayoResult<&Credentials> {
        self.profiles.get(name).ok_or_else(|| EnsayoError::Fixture {
            message: format!("no user profile named '{name}'"),
        })
    }

    /// Profile names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.profiles.keys().map(String::as_str).collect()
    }
}

impl Default for UserProfiles {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Suite-level configuration: target site plus session options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteConfig {
    /// Base URL page paths are resolved against
    pub base_url: String,
    /// Session configuration
    pub session: SessionConfig,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://the-internet.herokuapp.com".to_string(),
            session: SessionConfig::default(),
        }
    }
}

impl SuiteConfig {
    /// Defaults overridden by `ENSAYO_BASE_URL`, `ENSAYO_BROWSER`, and
    /// `ENSAYO_HEADLESS` where set.
    ///
    /// # Errors
    ///
    /// Returns [`EnsayoError::UnsupportedConfiguration`] when
    /// `ENSAYO_BROWSER` names an unknown engine.
    pub fn from_env() -> EnsayoResult<Self> {
        let mut config = Self::default();
        if let Ok(base_url) = std::env::var("ENSAYO_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(browser) = std::env::var("ENSAYO_BROWSER") {
            config.session.engine = browser.parse::<Engine>()?;
        }
        if let Ok(headless) = std::env::var("ENSAYO_HEADLESS") {
            config.session.headless = headless != "0" && !headless.eq_ignore_ascii_case("false");
        }
        Ok(config)
    }

    /// Resolve a path against the base URL.
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    mod profile_tests {
        use super::*;

        #[test]
        fn test_builtin_users() {
            let profiles = UserProfiles::builtin();
            let valid = profiles.get("valid_user").unwrap();
            assert_eq!(valid.username, "tomsmith");
            assert_eq!(valid.password, "SuperSecretPassword!");

            let invalid = profiles.get("invalid_user").unwrap();
            assert_eq!(invalid.username, "invalid_user");
            assert_eq!(invalid.password, "wrong_password");
        }

        #[test]
        fn test_unknown_profile_errors() {
            let profiles = UserProfiles::builtin();
            assert!(matches!(
                profiles.get("admin"),
                Err(EnsayoError::Fixture { .. })
            ));
        }

        #[test]
        fn test_load_from_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("users.json");
            let mut file = std::fs::File::create(&path).unwrap();
            write!(
                file,
                r#"{{"qa_user": {{"username": "qa", "password": "secret"}}}}"#
            )
            .unwrap();

            let profiles = UserProfiles::load(&path).unwrap();
            assert_eq!(profiles.get("qa_user").unwrap().username, "qa");
            assert!(profiles.get("valid_user").is_err());
        }

        #[test]
        fn test_missing_file_falls_back_to_builtin() {
            let dir = tempfile::tempdir().unwrap();
            let profiles = UserProfiles::load_or_builtin(&dir.path().join("absent.json")).unwrap();
            assert!(profiles.get("valid_user").is_ok());
        }

        #[test]
        fn test_malformed_file_errors() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("users.json");
            std::fs::write(&path, "not json").unwrap();
            assert!(matches!(
                UserProfiles::load_or_builtin(&path),
                Err(EnsayoError::Fixture { .. })
            ));
        }
    }

    mod config_tests {
        use super::*;

        #[test]
        fn test_default_base_url() {
            let config = SuiteConfig::default();
            assert_eq!(config.base_url, "https://the-internet.herokuapp.com");
            assert!(config.session.headless);
        }

        #[test]
        fn test_url_for_joins_cleanly() {
            let config = SuiteConfig {
                base_url: "https://example.com/".to_string(),
                ..SuiteConfig::default()
            };
            assert_eq!(config.url_for("/login"), "https://example.com/login");
            assert_eq!(config.url_for("login"), "https://example.com/login");
        }
    }
}
