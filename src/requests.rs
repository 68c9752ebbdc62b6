use crate::error::{ParseError, ResourceError};

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Status code and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        RawResponse { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decodes the body. An empty body decodes as `{}` so unit-like responses work.
    pub fn json<R: DeserializeOwned>(&self) -> Result<R, ParseError> {
        let bytes: &[u8] = if self.body.iter().all(u8::is_ascii_whitespace) {
            b"{}"
        } else {
            &self.body
        };
        serde_json::from_slice(bytes).map_err(|e| {
            log::error!(
                "JSON Deserialization failed for response with status {}. Error: {}. Body: {}",
                self.status,
                e,
                self.text()
            );
            ParseError::JsonDeserializationFailed(format!(
                "Error: {}, Body: {}",
                e,
                self.text()
            ))
        })
    }

    /// Decodes a 2xx body, or classifies the failure.
    pub fn into_result<R: DeserializeOwned>(self) -> Result<R, ResourceError> {
        if self.is_success() {
            Ok(self.json()?)
        } else {
            log::warn!(
                "Request failed with status {}. Response body: {}",
                self.status,
                self.text()
            );
            Err(ResourceError::from_response(self.status, &self.body))
        }
    }
}

impl crate::ParseClient {
    pub async fn get(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> Result<RawResponse, ParseError> {
        self.send(Method::GET, endpoint, None, params).await
    }

    pub async fn post(&self, endpoint: &str, data: &Value) -> Result<RawResponse, ParseError> {
        self.send(Method::POST, endpoint, Some(data), &[]).await
    }

    pub async fn put(&self, endpoint: &str, data: &Value) -> Result<RawResponse, ParseError> {
        self.send(Method::PUT, endpoint, Some(data), &[]).await
    }

    pub async fn delete(&self, endpoint: &str) -> Result<RawResponse, ParseError> {
        self.send(Method::DELETE, endpoint, None, &[]).await
    }
}
