// Fetch client: the only path from client code to the network
use async_trait::async_trait;
use reqwest::{header, Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;

use super::error::ApiError;
use crate::error::AppResult;

/// Prefix under which the gateway forwards to the upstream API
pub const PROXY_PREFIX: &str = "/api/proxy";

/// Transport used by sync views and mutations
///
/// `path` is the upstream-relative path plus query, e.g. `/deliveries?status=FAILED`.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError>;
}

/// Issue a request and deserialize the body into the caller's type
///
/// A shape mismatch carries status 0: the transport has already consumed the
/// HTTP status by the time the body is typed.
pub async fn fetch_json<T: DeserializeOwned>(
    fetcher: &dyn Fetcher,
    method: Method,
    path: &str,
    body: Option<Value>,
) -> Result<T, ApiError> {
    let value = fetcher.request(method, path, body).await?;
    serde_json::from_value(value).map_err(|e| ApiError::malformed(0, e))
}

/// Full-page navigation to the login view
pub trait LoginNavigator: Send + Sync {
    fn redirect_to_login(&self);
}

/// Navigator for headless use: records the redirect in the log
pub struct LogNavigator;

impl LoginNavigator for LogNavigator {
    fn redirect_to_login(&self) {
        tracing::warn!("Session is not authenticated, redirecting to /login");
    }
}

pub struct FetchClient {
    http_client: Client,
    origin: String,
    navigator: Arc<dyn LoginNavigator>,
}

impl FetchClient {
    /// `origin` is the gateway's origin, e.g. `http://127.0.0.1:3000`
    pub fn new(origin: &str, navigator: Arc<dyn LoginNavigator>) -> AppResult<Self> {
        Ok(Self {
            http_client: crate::utils::http::create_session_client()?,
            origin: origin.trim_end_matches('/').to_string(),
            navigator,
        })
    }

    fn proxy_url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}{}", self.origin, PROXY_PREFIX, path)
        } else {
            format!("{}{}/{}", self.origin, PROXY_PREFIX, path)
        }
    }

    /// Exchange an API key for a session cookie
    ///
    /// A rejected key is reported to the caller, never redirected.
    pub async fn login(&self, api_key: &str) -> Result<(), ApiError> {
        let response = self
            .http_client
            .post(format!("{}/api/auth/login", self.origin))
            .json(&json!({ "api_key": api_key }))
            .send()
            .await
            .map_err(ApiError::network)?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.bytes().await.map_err(ApiError::network)?;
        Err(ApiError::from_response(status, &body))
    }

    pub async fn logout(&self) -> Result<(), ApiError> {
        let response = self
            .http_client
            .post(format!("{}/api/auth/logout", self.origin))
            .send()
            .await
            .map_err(ApiError::network)?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.bytes().await.map_err(ApiError::network)?;
        Err(ApiError::from_response(status, &body))
    }

    pub async fn is_authenticated(&self) -> Result<bool, ApiError> {
        let response = self
            .http_client
            .get(format!("{}/api/auth/me", self.origin))
            .send()
            .await
            .map_err(ApiError::network)?;
        let status = response.status();
        let body = response.bytes().await.map_err(ApiError::network)?;
        if !status.is_success() {
            return Err(ApiError::from_response(status, &body));
        }
        let value: Value =
            serde_json::from_slice(&body).map_err(|e| ApiError::malformed(status.as_u16(), e))?;
        Ok(value["authenticated"].as_bool().unwrap_or(false))
    }
}

#[async_trait]
impl Fetcher for FetchClient {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        let mut request = self
            .http_client
            .request(method, self.proxy_url(path))
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            request = request.body(body.to_string());
        }

        let response = request.send().await.map_err(ApiError::network)?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            self.navigator.redirect_to_login();
            return Err(ApiError::unauthorized());
        }

        let bytes = response.bytes().await.map_err(ApiError::network)?;
        if !status.is_success() {
            return Err(ApiError::from_response(status, &bytes));
        }
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| ApiError::malformed(status.as_u16(), e))
    }
}
