use std::env;

use crate::ParseError;

/// Environment variables consulted by [`ParseConfig::from_env`].
pub const ENV_SERVER_URL: &str = "PARSE_SERVER_URL";
pub const ENV_APP_ID: &str = "PARSE_APP_ID";
pub const ENV_MASTER_KEY: &str = "PARSE_MASTER_KEY";
pub const ENV_REST_API_KEY: &str = "PARSE_REST_API_KEY";

/// Base URL used when none is configured.
pub const DEFAULT_SERVER_URL: &str = "https://api.parse.com/1";

/// Connection settings and credentials for a [`ParseClient`](crate::ParseClient).
///
/// Every field is optional while building. Values set explicitly always win; anything left
/// unset can be filled from the process environment with [`resolve_with_env`]. That is the
/// single resolution order for credentials: instance-level value, else process-wide
/// configuration.
///
/// ```rust
/// use parse_resource::ParseConfig;
///
/// let config = ParseConfig::new()
///     .server_url("http://localhost:1337/1")
///     .app_id("myAppId")
///     .master_key("myMasterKey");
/// assert_eq!(config.app_id_ref(), Some("myAppId"));
/// ```
///
/// [`resolve_with_env`]: ParseConfig::resolve_with_env
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseConfig {
    pub(crate) server_url: Option<String>,
    pub(crate) app_id: Option<String>,
    pub(crate) master_key: Option<String>,
    pub(crate) rest_api_key: Option<String>,
}

impl ParseConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    pub fn app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    /// The privileged key. Sent as `X-Parse-Master-Key` and preferred over the REST key.
    pub fn master_key(mut self, key: impl Into<String>) -> Self {
        self.master_key = Some(key.into());
        self
    }

    pub fn rest_api_key(mut self, key: impl Into<String>) -> Self {
        self.rest_api_key = Some(key.into());
        self
    }

    pub fn app_id_ref(&self) -> Option<&str> {
        self.app_id.as_deref()
    }

    /// The configured server URL, or [`DEFAULT_SERVER_URL`].
    pub fn server_url_or_default(&self) -> &str {
        self.server_url.as_deref().unwrap_or(DEFAULT_SERVER_URL)
    }

    /// Reads whatever the process environment provides.
    pub fn from_env() -> Self {
        let read = |name: &str| env::var(name).ok().filter(|v| !v.trim().is_empty());
        ParseConfig {
            server_url: read(ENV_SERVER_URL),
            app_id: read(ENV_APP_ID),
            master_key: read(ENV_MASTER_KEY),
            rest_api_key: read(ENV_REST_API_KEY),
        }
    }

    /// Fills every unset field from `fallback`.
    pub fn or(self, fallback: ParseConfig) -> Self {
        ParseConfig {
            server_url: self.server_url.or(fallback.server_url),
            app_id: self.app_id.or(fallback.app_id),
            master_key: self.master_key.or(fallback.master_key),
            rest_api_key: self.rest_api_key.or(fallback.rest_api_key),
        }
    }

    /// Fills every unset field from the environment.
    pub fn resolve_with_env(self) -> Self {
        self.or(Self::from_env())
    }

    /// Checks that the configuration can address a backend.
    pub fn validate(&self) -> Result<(), ParseError> {
        match self.app_id.as_deref() {
            Some(id) if !id.trim().is_empty() => Ok(()),
            _ => Err(ParseError::MissingConfiguration("application id")),
        }
    }
}
