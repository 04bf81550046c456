//! Thin JSON-over-HTTP transport shared by both forge clients.

use forgehand_core::ForgeError;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::{debug, trace};

const USER_AGENT: &str = concat!("forgehand/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// How the token is presented to the forge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// `Authorization: Bearer <token>`
    Bearer,
    /// `Authorization: token <token>`
    Token,
}

pub struct RestTransport {
    base_url: String,
    token: String,
    scheme: AuthScheme,
    client: reqwest::Client,
}

impl RestTransport {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        scheme: AuthScheme,
    ) -> Result<Self, ForgeError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ForgeError::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            scheme,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn auth_value(&self) -> String {
        match self.scheme {
            AuthScheme::Bearer => format!("Bearer {}", self.token),
            AuthScheme::Token => format!("token {}", self.token),
        }
    }

    pub async fn get(&self, path: &str) -> Result<Value, ForgeError> {
        self.send(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<Value, ForgeError> {
        self.send(Method::POST, path, Some(body)).await
    }

    pub async fn patch(&self, path: &str, body: Value) -> Result<Value, ForgeError> {
        self.send(Method::PATCH, path, Some(body)).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ForgeError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(method = %method, url = %url, "Forge request");

        let mut request = self
            .client
            .request(method, &url)
            .header("Authorization", self.auth_value())
            .header("Accept", "application/json");
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ForgeError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ForgeError::Network(e.to_string()))?;
        trace!(status = status.as_u16(), len = text.len(), "Forge response");

        if !status.is_success() {
            return Err(status_error(status, path, &text));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| ForgeError::Decode(format!("{path}: {e}")))
    }
}

/// Map a non-success status to the forge error taxonomy.
pub(crate) fn status_error(status: StatusCode, path: &str, body: &str) -> ForgeError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.chars().take(200).collect());

    match status {
        StatusCode::NOT_FOUND => ForgeError::NotFound {
            resource: path.to_string(),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ForgeError::Authentication(message),
        _ => ForgeError::Api {
            status_code: status.as_u16(),
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_not_found() {
        let err = status_error(StatusCode::NOT_FOUND, "/repos/a/b/branches/x", "");
        assert!(err.is_not_found());
    }

    #[test]
    fn api_message_is_extracted() {
        let err = status_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "/x",
            r#"{"message":"Validation Failed"}"#,
        );
        match err {
            ForgeError::Api { status_code, message } => {
                assert_eq!(status_code, 422);
                assert_eq!(message, "Validation Failed");
            }
            other => panic!("Expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn forbidden_maps_to_authentication() {
        let err = status_error(StatusCode::FORBIDDEN, "/x", "nope");
        assert!(matches!(err, ForgeError::Authentication(m) if m == "nope"));
    }

    #[test]
    fn auth_schemes() {
        let bearer = RestTransport::new("https://api.example/", "t0k", AuthScheme::Bearer).unwrap();
        assert_eq!(bearer.auth_value(), "Bearer t0k");
        assert_eq!(bearer.base_url(), "https://api.example");
        let token = RestTransport::new("https://git.example/api/v1", "t0k", AuthScheme::Token).unwrap();
        assert_eq!(token.auth_value(), "token t0k");
    }
}
