use serde::{Deserialize, Serialize};

/// Upstream API base URL used when `API_URL` is not set
pub const DEFAULT_API_URL: &str = "http://localhost:8000/v1";

/// Gateway service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Allow LAN access
    /// - false: loopback only 127.0.0.1 (default)
    /// - true: bind 0.0.0.0
    #[serde(default)]
    pub allow_lan_access: bool,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Base URL of the Deliverant API, e.g. `http://localhost:8000/v1`
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Upstream request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Production deployment; turns on the `Secure` cookie flag
    #[serde(default)]
    pub production: bool,

    /// Outbound proxy for upstream calls
    #[serde(default)]
    pub upstream_proxy: UpstreamProxyConfig,
}

/// Outbound proxy configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct UpstreamProxyConfig {
    /// Enabled
    pub enabled: bool,
    /// Proxy address (http://, https://, socks5://)
    pub url: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            allow_lan_access: false,
            port: default_port(),
            api_url: default_api_url(),
            request_timeout: default_request_timeout(),
            production: false,
            upstream_proxy: UpstreamProxyConfig::default(),
        }
    }
}

fn default_port() -> u16 {
    3000
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_request_timeout() -> u64 {
    120
}

impl GatewayConfig {
    /// Get the actual listen address
    pub fn get_bind_address(&self) -> &str {
        if self.allow_lan_access {
            "0.0.0.0"
        } else {
            "127.0.0.1"
        }
    }

    /// Upstream base URL without a trailing slash
    pub fn api_base(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_partial_json() {
        let config: GatewayConfig = serde_json::from_str(r#"{"port": 4000}"#).unwrap();
        assert_eq!(config.port, 4000);
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.request_timeout, 120);
        assert!(!config.production);
        assert_eq!(config.get_bind_address(), "127.0.0.1");
    }

    #[test]
    fn test_api_base_trims_trailing_slash() {
        let config = GatewayConfig {
            api_url: "https://api.example.com/v1/".to_string(),
            ..Default::default()
        };
        assert_eq!(config.api_base(), "https://api.example.com/v1");
    }
}
