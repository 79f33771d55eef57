//! Session settings
//!
//! Built once at startup, validated at registration and shared read-only by every request.

use crate::error::{ErrorContext, SatchelError, SatchelResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Minimum length of the cookie sealing password
pub const MIN_PASSWORD_LENGTH: usize = 32;

/// Id generator names accepted in `id_generator`
pub const ID_GENERATOR_UUID: &str = "uuid";
pub const ID_GENERATOR_CUSTOM: &str = "custom";

/// Settings for the session lifecycle controller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Cookie name
    pub name: String,
    /// Maximum sealed cookie length before falling back to the cache; 0 always uses the cache
    pub max_cookie_size: usize,
    /// Initial modification flag of brand-new sessions
    pub store_blank: bool,
    /// Whether an unavailable cache fails the request or degrades silently
    pub error_on_cache_not_ready: bool,
    pub cache: CacheSettings,
    pub cookie: CookieOptions,
    /// Session id strategy, see [`ID_GENERATOR_UUID`] and [`ID_GENERATOR_CUSTOM`]
    pub id_generator: String,
    /// Route patterns that never get a session attached
    pub skip_routes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// TTL handed to the cache on every write; 0 defers to the cache default
    pub expires_in_ms: u64,
}

/// Cookie attributes passed through to the response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieOptions {
    /// Secret used to seal and unseal the cookie content
    pub password: String,
    pub path: String,
    pub domain: Option<String>,
    pub same_site: SameSitePolicy,
    pub is_secure: bool,
    pub is_http_only: bool,
    /// Browser lifetime; None keeps a browser-session cookie
    pub ttl_ms: Option<u64>,
    /// Ask the client to drop a cookie that failed to unseal
    pub clear_invalid: bool,
    /// Treat a cookie that fails to unseal as absent instead of rejecting the request
    pub ignore_errors: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSitePolicy {
    Strict,
    Lax,
    None,
    /// Omit the attribute
    Disabled,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            name: "session".to_string(),
            max_cookie_size: 1024,
            store_blank: true,
            error_on_cache_not_ready: true,
            cache: CacheSettings::default(),
            cookie: CookieOptions::default(),
            id_generator: ID_GENERATOR_UUID.to_string(),
            skip_routes: Vec::new(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        // One day sessions
        Self {
            expires_in_ms: 24 * 60 * 60 * 1000,
        }
    }
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            password: String::new(),
            path: "/".to_string(),
            domain: None,
            same_site: SameSitePolicy::Lax,
            is_secure: true,
            is_http_only: false,
            ttl_ms: None,
            clear_invalid: true,
            ignore_errors: true,
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.expires_in_ms)
    }
}

impl CookieOptions {
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_ms.map(Duration::from_millis)
    }
}

impl SessionSettings {
    /// Settings with defaults and the given sealing password
    pub fn with_password<S: Into<String>>(password: S) -> Self {
        let mut settings = Self::default();
        settings.cookie.password = password.into();
        settings
    }

    /// Load settings from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> SatchelResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| SatchelError::Config {
            message: format!("Failed to read settings file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the settings file exists and is readable"),
        })?;

        let settings: SessionSettings =
            toml::from_str(&content).map_err(|e| SatchelError::Config {
                message: format!("Failed to parse settings: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("config")
                    .with_operation("parse_toml")
                    .with_suggestion("Check TOML syntax in settings file"),
            })?;

        Ok(settings)
    }

    /// Load settings from an optional file overlaid with `SATCHEL__*` environment variables
    ///
    /// Nested keys use a double underscore, e.g. `SATCHEL__COOKIE__PASSWORD`.
    pub fn load(path: Option<&Path>) -> SatchelResult<Self> {
        let mut builder = ::config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(false));
        }

        let loaded = builder
            .add_source(
                ::config::Environment::with_prefix("SATCHEL")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize::<SessionSettings>())
            .map_err(|e| SatchelError::Config {
                message: format!("Failed to load settings: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("config")
                    .with_operation("load")
                    .with_suggestion("Check the settings file and SATCHEL__ environment variables"),
            })?;

        Ok(loaded)
    }

    /// Validate settings at registration time
    pub fn validate(&self) -> SatchelResult<()> {
        if self.name.trim().is_empty() {
            return Err(SatchelError::Config {
                message: "Cookie name must not be empty".to_string(),
                source: None,
                context: ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Set name to a cookie name such as \"session\""),
            });
        }

        if self.cookie.password.len() < MIN_PASSWORD_LENGTH {
            return Err(SatchelError::Config {
                message: format!(
                    "Cookie password must be at least {} characters",
                    MIN_PASSWORD_LENGTH
                ),
                source: None,
                context: ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Set cookie.password to a long random secret"),
            });
        }

        if self.id_generator != ID_GENERATOR_UUID && self.id_generator != ID_GENERATOR_CUSTOM {
            return Err(SatchelError::Config {
                message: format!("Unknown session id generator: {}", self.id_generator),
                source: None,
                context: ErrorContext::new("config")
                    .with_operation("validate")
                    .with_metadata("id_generator", &self.id_generator)
                    .with_suggestion("Use \"uuid\" or register a custom generator"),
            });
        }

        Ok(())
    }

    /// Whether the given matched route opts out of sessions
    pub fn skips_route(&self, route: &str) -> bool {
        self.skip_routes.iter().any(|r| r == route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PASSWORD: &str = "password-should-be-32-characters-long";

    #[test]
    fn test_defaults() {
        let settings = SessionSettings::default();
        assert_eq!(settings.name, "session");
        assert_eq!(settings.max_cookie_size, 1024);
        assert!(settings.store_blank);
        assert!(settings.error_on_cache_not_ready);
        assert_eq!(settings.cache.ttl(), Duration::from_secs(86_400));
        assert!(settings.cookie.ignore_errors);
        assert!(settings.cookie.clear_invalid);
        assert_eq!(settings.cookie.same_site, SameSitePolicy::Lax);
    }

    #[test]
    fn test_validate_requires_password() {
        let settings = SessionSettings::default();
        assert!(matches!(
            settings.validate(),
            Err(SatchelError::Config { .. })
        ));

        assert!(SessionSettings::with_password(PASSWORD).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_generator() {
        let mut settings = SessionSettings::with_password(PASSWORD);
        settings.id_generator = "sequential".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
name = "jar"
max_cookie_size = 0
store_blank = false

[cookie]
password = "{}"
is_secure = false
same_site = "Strict"
"#,
            PASSWORD
        )
        .unwrap();

        let settings = SessionSettings::from_file(file.path()).unwrap();
        assert_eq!(settings.name, "jar");
        assert_eq!(settings.max_cookie_size, 0);
        assert!(!settings.store_blank);
        assert!(!settings.cookie.is_secure);
        assert_eq!(settings.cookie.same_site, SameSitePolicy::Strict);
        assert_eq!(settings.cookie.path, "/");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_from_file_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name = ").unwrap();
        assert!(SessionSettings::from_file(file.path()).is_err());
    }

    // One test owns the SATCHEL__ variables so parallel tests never see them
    #[test]
    fn test_load_layers_environment_over_file() {
        let defaults = SessionSettings::load(None).unwrap();
        assert_eq!(defaults.name, "session");
        assert_eq!(defaults.max_cookie_size, 1024);

        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
name = "jar"
max_cookie_size = 0

[cookie]
password = "{}"
"#,
            PASSWORD
        )
        .unwrap();

        std::env::set_var("SATCHEL__MAX_COOKIE_SIZE", "2048");
        std::env::set_var("SATCHEL__COOKIE__IS_SECURE", "false");
        let loaded = SessionSettings::load(Some(file.path()));
        std::env::remove_var("SATCHEL__MAX_COOKIE_SIZE");
        std::env::remove_var("SATCHEL__COOKIE__IS_SECURE");

        let settings = loaded.unwrap();
        assert_eq!(settings.name, "jar");
        assert_eq!(settings.max_cookie_size, 2048);
        assert!(!settings.cookie.is_secure);
        assert_eq!(settings.cookie.password, PASSWORD);
        assert!(settings.store_blank);
        assert!(settings.validate().is_ok());

        // a missing file is optional
        let missing = SessionSettings::load(Some(Path::new("/nonexistent/satchel.toml"))).unwrap();
        assert_eq!(missing.name, "session");
    }

    #[test]
    fn test_skips_route() {
        let mut settings = SessionSettings::with_password(PASSWORD);
        settings.skip_routes = vec!["/api/public".to_string()];
        assert!(settings.skips_route("/api/public"));
        assert!(!settings.skips_route("/api/session"));
    }
}
