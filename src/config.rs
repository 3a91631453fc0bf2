use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::notifications::DEFAULT_POLL_INTERVAL;

pub const ENV_PREFIX: &str = "PBADMIN_";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize, Serialize, Default, PartialEq)]
pub struct ConfigFile {
    pub api_url: Option<Url>,
    /// Human readable duration, e.g. `45s`.
    pub request_timeout: Option<String>,
    pub poll_interval: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ConfigEnv {
    api_url: Option<Url>,
    request_timeout: Option<String>,
    poll_interval: Option<String>,
    token: Option<String>,
}

#[derive(Debug)]
pub struct Config {
    pub api_url: Url,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    /// Token from the environment; takes precedence over the stored session.
    pub token: Option<String>,
}

/// Joined routes are resolved relative to the base, so it must end in `/`.
pub fn normalize_base_url(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn parse_duration(name: &str, value: Option<String>, default: Duration) -> Result<Duration> {
    match value {
        Some(raw) => humantime::parse_duration(&raw)
            .with_context(|| format!("Invalid {name} '{raw}', expected e.g. '30s' or '2m'")),
        None => Ok(default),
    }
}

fn merge_config(base: ConfigFile, override_config: ConfigEnv) -> Result<Config> {
    let api_url = override_config
        .api_url
        .or(base.api_url)
        .ok_or(anyhow!(
            "No API URL provided; run `pbadmin config` or set {ENV_PREFIX}API_URL"
        ))?;

    let request_timeout = parse_duration(
        "request timeout",
        override_config.request_timeout.or(base.request_timeout),
        DEFAULT_REQUEST_TIMEOUT,
    )?;
    let poll_interval = parse_duration(
        "poll interval",
        override_config.poll_interval.or(base.poll_interval),
        DEFAULT_POLL_INTERVAL,
    )?;

    Ok(Config {
        api_url: normalize_base_url(api_url),
        request_timeout,
        poll_interval,
        token: override_config.token.filter(|t| !t.is_empty()),
    })
}

fn config_file_path() -> Result<PathBuf> {
    let project_dirs = directories::ProjectDirs::from("com", "myprintbot", "pbadmin")
        .ok_or(anyhow!("Unable to determine home directory"))?;
    Ok(project_dirs.config_dir().join("config.toml"))
}

pub fn read_config_file() -> Result<ConfigFile> {
    let config_file = config_file_path()?;
    match fs::read_to_string(&config_file) {
        Ok(config) => toml::from_str(&config)
            .with_context(|| format!("Failed to parse {}", config_file.display())),
        Err(_) => Ok(ConfigFile::default()),
    }
}

pub fn read_config() -> Result<Config> {
    let _ = dotenv();
    let env_config = envy::prefixed(ENV_PREFIX)
        .from_env::<ConfigEnv>()
        .unwrap_or_default();

    merge_config(read_config_file()?, env_config)
}

pub fn write_config(config: ConfigFile) -> Result<()> {
    let config_file = config_file_path()?;
    if let Some(parent) = config_file.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&config_file, toml::to_string_pretty(&config)?)
        .with_context(|| format!("Failed to write {}", config_file.display()))?;
    tracing::info!(path = %config_file.display(), "configuration written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_overrides_file() {
        let file = ConfigFile {
            api_url: Some(Url::parse("https://file.example.com/api").unwrap()),
            request_timeout: Some("10s".to_string()),
            poll_interval: None,
        };
        let env = ConfigEnv {
            api_url: Some(Url::parse("https://env.example.com/api/").unwrap()),
            request_timeout: None,
            poll_interval: Some("1m".to_string()),
            token: Some("env-token".to_string()),
        };

        let config = merge_config(file, env).unwrap();
        assert_eq!(config.api_url.as_str(), "https://env.example.com/api/");
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert_eq!(config.token.as_deref(), Some("env-token"));
    }

    #[test]
    fn test_defaults_and_normalisation() {
        let file = ConfigFile {
            api_url: Some(Url::parse("https://api.example.com/api").unwrap()),
            ..Default::default()
        };

        let config = merge_config(file, ConfigEnv::default()).unwrap();
        assert_eq!(config.api_url.as_str(), "https://api.example.com/api/");
        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(config.token, None);
    }

    #[test]
    fn test_missing_url_is_an_error() {
        assert!(merge_config(ConfigFile::default(), ConfigEnv::default()).is_err());
    }

    #[test]
    fn test_invalid_duration_is_an_error() {
        let file = ConfigFile {
            api_url: Some(Url::parse("https://api.example.com/").unwrap()),
            request_timeout: Some("soon".to_string()),
            ..Default::default()
        };
        let err = merge_config(file, ConfigEnv::default()).unwrap_err();
        assert!(err.to_string().contains("soon"));
    }

    #[test]
    fn test_config_file_round_trips_through_toml() {
        let file = ConfigFile {
            api_url: Some(Url::parse("https://api.example.com/api/").unwrap()),
            request_timeout: Some("30s".to_string()),
            poll_interval: None,
        };
        let text = toml::to_string_pretty(&file).unwrap();
        assert_eq!(toml::from_str::<ConfigFile>(&text).unwrap(), file);
    }
}
