// Upstream client for the Deliverant API
use axum::http::{Method, StatusCode};
use bytes::Bytes;
use reqwest::{header, Client};

use crate::error::{AppError, AppResult};
use crate::proxy::config::GatewayConfig;
use crate::proxy::session::Credential;

/// Path used to validate a candidate API key during login
const PROBE_PATH: &str = "/endpoints";

/// Raw upstream reply; the gateway re-emits it unchanged
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Bytes,
}

pub struct UpstreamClient {
    http_client: Client,
    base_url: String,
}

impl UpstreamClient {
    pub fn new(config: &GatewayConfig) -> AppResult<Self> {
        let http_client = crate::utils::http::create_client_with_proxy(
            config.request_timeout,
            Some(&config.upstream_proxy),
        )?;

        Ok(Self {
            http_client,
            base_url: config.api_base().to_string(),
        })
    }

    /// Build upstream URL from a path (with leading slash) and an optional raw query
    fn build_url(base_url: &str, path: &str, query_string: Option<&str>) -> String {
        match query_string {
            Some(qs) if !qs.is_empty() => format!("{}{}?{}", base_url, path, qs),
            _ => format!("{}{}", base_url, path),
        }
    }

    /// Forward one request with the session credential as bearer token
    pub async fn forward(
        &self,
        method: Method,
        path: &str,
        query_string: Option<&str>,
        credential: &Credential,
        body: Bytes,
    ) -> AppResult<UpstreamResponse> {
        let url = Self::build_url(&self.base_url, path, query_string);
        tracing::debug!("Forwarding {} {}", method, url);

        let mut request = self
            .http_client
            .request(method, &url)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, credential.bearer());
        if !body.is_empty() {
            request = request.body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to read upstream body: {}", e)))?;

        Ok(UpstreamResponse {
            status,
            content_type,
            body,
        })
    }

    /// Check a candidate API key with a cheap authenticated list call
    ///
    /// Any non-2xx or transport failure counts as an invalid key.
    pub async fn probe(&self, credential: &Credential) -> bool {
        let url = Self::build_url(&self.base_url, PROBE_PATH, None);
        match self
            .http_client
            .get(&url)
            .header(header::AUTHORIZATION, credential.bearer())
            .send()
            .await
        {
            Ok(response) => {
                let ok = response.status().is_success();
                if !ok {
                    tracing::info!("API key probe rejected with {}", response.status());
                }
                ok
            }
            Err(e) => {
                tracing::warn!("API key probe failed: {}", e);
                false
            }
        }
    }
}
