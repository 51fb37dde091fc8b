use crate::proxy::GatewayConfig;
use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Directory for rolling log files; defaults to `~/.deliverant/logs`
    #[serde(default)]
    pub log_dir: Option<String>,
}

impl AppConfig {
    pub fn new() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            log_dir: None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}
