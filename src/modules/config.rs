use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::models::AppConfig;

const DATA_DIR: &str = ".deliverant";
const CONFIG_FILE: &str = "gateway_config.json";

/// Environment variable pointing at an explicit config file
pub const CONFIG_PATH_ENV: &str = "DELIVERANT_CONFIG";

/// Get data directory path, creating it if needed
pub fn get_data_dir() -> AppResult<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| AppError::Config("Failed to get user home directory".to_string()))?;
    let data_dir = home.join(DATA_DIR);

    if !data_dir.exists() {
        fs::create_dir_all(&data_dir)?;
    }

    Ok(data_dir)
}

fn config_path<F>(lookup: &F) -> AppResult<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(CONFIG_PATH_ENV) {
        Some(path) if !path.trim().is_empty() => Ok(PathBuf::from(path)),
        _ => Ok(get_data_dir()?.join(CONFIG_FILE)),
    }
}

/// Load application config from the process environment
///
/// A missing file yields defaults; a malformed file is an error. Environment
/// overrides (`API_URL`, `PORT`, `APP_ENV`) are applied last.
pub fn load_app_config() -> AppResult<AppConfig> {
    let lookup = |key: &str| std::env::var(key).ok();
    let path = config_path(&lookup)?;
    load_app_config_from(&path, lookup)
}

/// Load `path` (if present) and apply overrides through `lookup`
pub fn load_app_config_from<F>(path: &Path, lookup: F) -> AppResult<AppConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let config = if path.exists() {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            AppError::Config(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })?
    } else {
        tracing::debug!("No config file at {}, using defaults", path.display());
        AppConfig::new()
    };

    apply_env_overrides(config, lookup)
}

/// Apply environment overrides through `lookup`
pub fn apply_env_overrides<F>(mut config: AppConfig, lookup: F) -> AppResult<AppConfig>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(api_url) = lookup("API_URL").filter(|v| !v.trim().is_empty()) {
        url::Url::parse(&api_url)
            .map_err(|e| AppError::Config(format!("Invalid API_URL {}: {}", api_url, e)))?;
        config.gateway.api_url = api_url;
    }

    if let Some(port) = lookup("PORT").filter(|v| !v.trim().is_empty()) {
        config.gateway.port = port
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid PORT {}: {}", port, e)))?;
    }

    if let Some(env) = lookup("APP_ENV") {
        config.gateway.production = env.eq_ignore_ascii_case("production");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::config::DEFAULT_API_URL;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_no_overrides_keeps_local_default() {
        let config = apply_env_overrides(AppConfig::new(), env(&[])).unwrap();
        assert_eq!(config.gateway.api_url, DEFAULT_API_URL);
        assert!(!config.gateway.production);
    }

    #[test]
    fn test_api_url_and_environment_overrides() {
        let config = apply_env_overrides(
            AppConfig::new(),
            env(&[
                ("API_URL", "https://api.deliverant.dev/v1"),
                ("APP_ENV", "production"),
                ("PORT", "8080"),
            ]),
        )
        .unwrap();
        assert_eq!(config.gateway.api_url, "https://api.deliverant.dev/v1");
        assert!(config.gateway.production);
        assert_eq!(config.gateway.port, 8080);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let result = apply_env_overrides(AppConfig::new(), env(&[("PORT", "eighty")]));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    fn temp_config(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("deliverant-{}-{}.json", name, std::process::id()))
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let path = temp_config("missing");
        let _ = fs::remove_file(&path);

        let config = load_app_config_from(&path, env(&[])).unwrap();
        assert_eq!(config.gateway.api_url, DEFAULT_API_URL);
        assert_eq!(config.gateway.port, 3000);
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn test_file_values_then_env_overrides() {
        let path = temp_config("file");
        fs::write(
            &path,
            r#"{"gateway": {"port": 4100, "api_url": "https://staging.deliverant.dev/v1"}, "log_dir": "/var/log/deliverant"}"#,
        )
        .unwrap();

        let config = load_app_config_from(&path, env(&[("PORT", "4200")])).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(config.gateway.api_url, "https://staging.deliverant.dev/v1");
        assert_eq!(config.gateway.port, 4200);
        assert_eq!(config.log_dir.as_deref(), Some("/var/log/deliverant"));
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let path = temp_config("malformed");
        fs::write(&path, "{ gateway: ").unwrap();

        let result = load_app_config_from(&path, env(&[]));
        let _ = fs::remove_file(&path);

        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_config_path_env_is_honoured() {
        let path = temp_config("explicit");
        let lookup = env(&[(CONFIG_PATH_ENV, path.to_str().unwrap())]);
        assert_eq!(config_path(&lookup).unwrap(), path);
    }

    #[test]
    fn test_invalid_api_url_is_rejected() {
        let result = apply_env_overrides(AppConfig::new(), env(&[("API_URL", "not a url")]));
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
