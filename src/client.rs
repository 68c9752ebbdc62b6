// src/client.rs

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, Url};
use serde_json::Value;

use crate::config::ParseConfig;
use crate::error::ParseError;
use crate::requests::RawResponse;

/// The HTTP side of the mapper.
///
/// `ParseClient` owns the server URL, the credentials and an underlying `reqwest::Client`.
/// Everything the resource and query layers do goes through [`ParseClient::send`], which
/// performs exactly one request and hands back the status code and body bytes untouched.
///
/// # Initialization
///
/// ```rust,no_run
/// use parse_resource::{ParseClient, ParseConfig};
/// # use parse_resource::ParseError;
///
/// # fn main() -> Result<(), ParseError> {
/// let client = ParseClient::new(
///     ParseConfig::new()
///         .server_url("https://api.parse.com/1")
///         .app_id("myAppId")
///         .master_key("myMasterKey"),
/// )?;
/// # Ok(())
/// # }
/// ```
///
/// # Key Precedence for Default Headers
/// 1. Master Key (if configured), sent as `X-Parse-Master-Key`
/// 2. REST API Key otherwise, sent as `X-Parse-REST-API-Key`
///
/// A session token, once set, is sent as `X-Parse-Session-Token` in addition.
#[derive(Debug, Clone)]
pub struct ParseClient {
    pub server_url: String,
    pub(crate) app_id: String,
    pub(crate) http_client: Client,
    pub(crate) session_token: Option<String>,
}

impl ParseClient {
    /// Creates a client from an explicit configuration.
    ///
    /// The server URL gets an `http://` scheme if it has none and loses any trailing slash.
    /// Fails if no application id is configured or the URL cannot serve as a base.
    pub fn new(config: ParseConfig) -> Result<Self, ParseError> {
        config.validate()?;
        let app_id = config.app_id.clone().unwrap_or_default();

        let mut temp_url_string = config.server_url_or_default().trim().to_string();

        // Ensure scheme is present
        if !temp_url_string.starts_with("http://") && !temp_url_string.starts_with("https://") {
            temp_url_string = format!("http://{}", temp_url_string);
        }

        let parsed_server_url = Url::parse(&temp_url_string)?;

        if parsed_server_url.cannot_be_a_base() {
            return Err(ParseError::InvalidUrl(format!(
                "The server_url '{}' cannot be a base URL. Please provide a full base URL (e.g., https://api.parse.com/1).",
                temp_url_string
            )));
        }

        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            "X-Parse-Application-Id",
            HeaderValue::from_str(&app_id).map_err(ParseError::InvalidHeaderValue)?,
        );
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(mk_str) = config.master_key.as_deref() {
            default_headers.insert(
                "X-Parse-Master-Key",
                HeaderValue::from_str(mk_str).map_err(ParseError::InvalidHeaderValue)?,
            );
        } else if let Some(rk_str) = config.rest_api_key.as_deref() {
            default_headers.insert(
                "X-Parse-REST-API-Key",
                HeaderValue::from_str(rk_str).map_err(ParseError::InvalidHeaderValue)?,
            );
        } else {
            log::warn!("ParseClient created without a master key or REST API key");
        }

        let http_client = Client::builder()
            .default_headers(default_headers)
            .build()
            .map_err(ParseError::ReqwestError)?;

        let final_server_url = parsed_server_url.as_str().trim_end_matches('/').to_string();

        log::debug!(
            "ParseClient initialized with base server_url: {}",
            final_server_url
        );

        Ok(Self {
            server_url: final_server_url,
            app_id,
            http_client,
            session_token: None,
        })
    }

    /// Creates a client from the process environment only.
    pub fn from_env() -> Result<Self, ParseError> {
        Self::new(ParseConfig::from_env())
    }

    /// Creates a client from `config`, filling unset values from the environment.
    pub fn with_env_fallback(config: ParseConfig) -> Result<Self, ParseError> {
        Self::new(config.resolve_with_env())
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Sets or clears the session token sent with every request.
    pub fn set_session_token(&mut self, token: Option<String>) {
        self.session_token = token;
    }

    /// Returns the current session token, if one is set on the client.
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    /// Checks if the client currently has an active session token.
    pub fn is_authenticated(&self) -> bool {
        self.session_token.is_some()
    }

    /// Resolves an endpoint such as `classes/Post` against the server URL.
    pub fn endpoint_url(&self, endpoint: &str) -> Result<Url, ParseError> {
        let joined = format!(
            "{}/{}",
            self.server_url,
            endpoint.trim_start_matches('/')
        );
        Url::parse(&joined).map_err(|e| {
            ParseError::InvalidUrl(format!(
                "Failed to join base URL '{}' with endpoint '{}': {}",
                self.server_url, endpoint, e
            ))
        })
    }

    /// Performs one request and returns the raw status and body.
    ///
    /// Only connection-level problems are errors here; any HTTP status, including 4xx and
    /// 5xx, comes back as a [`RawResponse`] for the caller to interpret.
    pub async fn send(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
        params: &[(String, String)],
    ) -> Result<RawResponse, ParseError> {
        let mut full_url = self.endpoint_url(endpoint)?;

        if !params.is_empty() {
            let mut pairs = full_url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }

        let mut request_builder = self.http_client.request(method.clone(), full_url.clone());

        let mut headers = HeaderMap::new();
        if let Some(token) = &self.session_token {
            headers.insert(
                "X-Parse-Session-Token",
                HeaderValue::from_str(token).map_err(ParseError::InvalidHeaderValue)?,
            );
        }

        let mut body_str_for_log: Option<String> = None;
        if let Some(body_data) = body {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            let body_bytes = serde_json::to_vec(body_data).map_err(ParseError::JsonError)?;
            if log::log_enabled!(log::Level::Debug) {
                body_str_for_log = Some(String::from_utf8_lossy(&body_bytes).into_owned());
            }
            request_builder = request_builder.body(body_bytes);
        }

        request_builder = request_builder.headers(headers);

        log::debug!(
            "Sending request: Method={}, URL={}, SessionToken={}",
            method,
            full_url,
            self.session_token.is_some()
        );
        if let Some(log_body) = &body_str_for_log {
            log::debug!("Request body: {}", log_body);
        }

        let response = request_builder.send().await.map_err(|e| {
            log::error!("{} {} failed before a response arrived: {}", method, full_url, e);
            ParseError::ReqwestError(e)
        })?;

        let status = response.status().as_u16();
        let body_bytes = response.bytes().await.map_err(ParseError::ReqwestError)?;

        log::debug!(
            "Response: Status={}, Body={}",
            status,
            String::from_utf8_lossy(&body_bytes)
        );

        Ok(RawResponse::new(status, body_bytes.to_vec()))
    }
}
