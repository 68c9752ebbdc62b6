// src/user.rs

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::client::ParseClient;
use crate::error::{ParseError, ResourceError};
use crate::model::{FieldDescriptor, Persistable, Validatable};
use crate::resource::Resource;
use crate::validation::ValidationErrors;

/// The built-in `_User` class.
///
/// Users are saved like any other model (a new user saved through [`Resource::save`] signs
/// up) and additionally authenticate through the class-level functions below.
///
/// ```rust,no_run
/// use parse_resource::{ParseClient, ParseConfig, ParseUser, Resource};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let mut client = ParseClient::new(ParseConfig::new().app_id("app").rest_api_key("rest"))?;
///
/// let mut user = Resource::<ParseUser>::new();
/// user.set_username("ada")?.set_password("s3cret")?;
/// user.save(&client).await?;
///
/// let user = ParseUser::authenticate(&client, "ada", "s3cret").await?;
/// client.set_session_token(user.session_token());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ParseUser;

impl Persistable for ParseUser {
    const CLASS_NAME: &'static str = "_User";
    const FIELDS: &'static [FieldDescriptor] = &[
        FieldDescriptor::new("username", "String"),
        FieldDescriptor::new("password", "String"),
        FieldDescriptor::new("email", "String"),
    ];

    fn collection_path() -> String {
        "users".to_string()
    }
}

impl Validatable for ParseUser {
    fn validate(user: &Resource<Self>, errors: &mut ValidationErrors) {
        errors.require_presence(user, "username");
        if user.is_new() {
            errors.require_presence(user, "password");
        }
    }
}

// Request body for password reset request
#[derive(Serialize, Debug)]
pub(crate) struct PasswordResetRequest<'a> {
    pub email: &'a str,
}

impl ParseUser {
    /// Logs in with a username and password.
    ///
    /// The returned user carries the session token issued by the backend.
    pub async fn authenticate(
        client: &ParseClient,
        username: &str,
        password: &str,
    ) -> Result<Resource<ParseUser>, ResourceError> {
        let params = vec![
            ("username".to_string(), username.to_string()),
            ("password".to_string(), password.to_string()),
        ];
        let response = client.get("login", &params).await?;
        let payload: Map<String, Value> = response.into_result()?;
        log::debug!("Authenticated user '{}'", username);
        Ok(Resource::from_remote(payload)?)
    }

    /// Logs in (or signs up) through Facebook credentials.
    ///
    /// `expires_in_seconds` is relative to now; the backend receives the absolute
    /// expiration as an ISO 8601 UTC timestamp.
    pub async fn authenticate_with_facebook(
        client: &ParseClient,
        user_id: &str,
        access_token: &str,
        expires_in_seconds: i64,
    ) -> Result<Resource<ParseUser>, ResourceError> {
        let body = facebook_auth_data(user_id, access_token, expires_in_seconds, Utc::now())?;
        let response = client.post(&Self::collection_path(), &body).await?;
        let payload: Map<String, Value> = response.into_result()?;
        Ok(Resource::from_remote(payload)?)
    }

    /// Asks the backend to email a password reset link.
    pub async fn reset_password(client: &ParseClient, email: &str) -> Result<(), ResourceError> {
        let body = serde_json::to_value(PasswordResetRequest { email }).map_err(ParseError::from)?;
        let response = client.post("requestPasswordReset", &body).await?;
        response.into_result::<Value>()?;
        Ok(())
    }

    /// The user owning the client's session token.
    pub async fn current(client: &ParseClient) -> Result<Resource<ParseUser>, ResourceError> {
        if !client.is_authenticated() {
            return Err(ParseError::InvalidSessionToken(
                "no session token is set on the client".to_string(),
            )
            .into());
        }
        let response = client.get("users/me", &[]).await?;
        let payload: Map<String, Value> = response.into_result()?;
        Ok(Resource::from_remote(payload)?)
    }
}

fn facebook_auth_data(
    user_id: &str,
    access_token: &str,
    expires_in_seconds: i64,
    now: DateTime<Utc>,
) -> Result<Value, ParseError> {
    let expiration = TimeDelta::try_seconds(expires_in_seconds)
        .and_then(|expires_in| now.checked_add_signed(expires_in))
        .ok_or_else(|| {
            ParseError::InvalidInput(format!(
                "facebook token lifetime of {} seconds is out of range",
                expires_in_seconds
            ))
        })?;

    Ok(json!({
        "authData": {
            "facebook": {
                "id": user_id,
                "access_token": access_token,
                "expiration_date": expiration.to_rfc3339_opts(SecondsFormat::Millis, true),
            }
        }
    }))
}

impl Resource<ParseUser> {
    pub fn username(&self) -> Option<String> {
        self.get("username")
    }

    pub fn set_username(&mut self, username: impl Into<String>) -> Result<&mut Self, ParseError> {
        self.set("username", username.into())
    }

    pub fn email(&self) -> Option<String> {
        self.get("email")
    }

    pub fn set_email(&mut self, email: impl Into<String>) -> Result<&mut Self, ParseError> {
        self.set("email", email.into())
    }

    pub fn set_password(&mut self, password: impl Into<String>) -> Result<&mut Self, ParseError> {
        self.set("password", password.into())
    }

    /// The session token returned by signup or login.
    pub fn session_token(&self) -> Option<String> {
        self.get("sessionToken")
    }
}
