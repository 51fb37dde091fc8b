use reqwest::{Client, Proxy};
use std::time::Duration;

use crate::error::AppResult;
use crate::proxy::config::UpstreamProxyConfig;

const USER_AGENT: &str = concat!("deliverant-gateway/", env!("CARGO_PKG_VERSION"));

/// Create the server-side HTTP client used to reach the Deliverant API
pub fn create_client_with_proxy(
    timeout_secs: u64,
    proxy_config: Option<&UpstreamProxyConfig>,
) -> AppResult<Client> {
    let mut builder = Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(USER_AGENT);

    if let Some(config) = proxy_config {
        if config.enabled && !config.url.is_empty() {
            match Proxy::all(&config.url) {
                Ok(proxy) => {
                    builder = builder.proxy(proxy);
                    tracing::info!("HTTP client upstream proxy enabled: {}", config.url);
                }
                Err(e) => {
                    tracing::error!("Invalid proxy address: {}, error: {}", config.url, e);
                }
            }
        }
    }

    Ok(builder.build()?)
}

/// Create a cookie-holding client that plays the browser's part against the gateway
///
/// No timeout: a hung refresh only delays that one cycle.
pub fn create_session_client() -> AppResult<Client> {
    Ok(Client::builder()
        .cookie_store(true)
        .user_agent(USER_AGENT)
        .build()?)
}
