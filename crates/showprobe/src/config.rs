//! Configuration file parsing and structures.
//!
//! Every section is optional; a missing file or section falls back to the
//! defaults below. Secrets are not expected in the file: the hub token is
//! normally read from the environment variable named by `hub.token_env`.

use std::net::IpAddr;
use std::net::Ipv4Addr;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use tracing_subscriber::filter::LevelFilter;

use crate::hub;
use crate::hub::HubConfig;

/// Config file used when `--config` is not given, if it exists
pub const DEFAULT_CONFIG_PATH: &str = "showprobe.toml";

/// Top-level configuration structure
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub hub: HubSettings,

    #[serde(default)]
    pub osc: OscSettings,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("invalid log level '{}'", other)),
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default)]
    pub level: LogLevel,
}

fn default_hub_url() -> String {
    "http://homeassistant.local:80".to_string()
}

fn default_token_env() -> String {
    "HAKEY".to_string()
}

/// Home Assistant connection settings
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HubSettings {
    /// Base URL of the hub
    #[serde(default = "default_hub_url")]
    pub url: String,

    /// Environment variable holding the access token
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Access token; takes precedence over `token_env`
    #[serde(default)]
    pub token: Option<String>,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            url: default_hub_url(),
            token_env: default_token_env(),
            token: None,
        }
    }
}

impl std::fmt::Debug for HubSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubSettings")
            .field("url", &self.url)
            .field("token_env", &self.token_env)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl HubSettings {
    /// Build the client configuration, reading the token from the process
    /// environment when it is not set in the file.
    pub fn resolve(&self) -> hub::Result<HubConfig> {
        self.resolve_with(|var| std::env::var(var).ok())
    }

    /// Like [`HubSettings::resolve`], with an explicit environment lookup
    pub fn resolve_with(&self, lookup: impl Fn(&str) -> Option<String>) -> hub::Result<HubConfig> {
        let token = self
            .token
            .clone()
            .or_else(|| lookup(&self.token_env))
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| hub::Error::MissingCredential {
                var: self.token_env.clone(),
            })?;

        Ok(HubConfig {
            url: self.url.clone(),
            token,
        })
    }
}

fn default_listen() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_listen_port() -> u16 {
    8006
}

fn default_send_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_send_port() -> u16 {
    8765
}

/// OSC listener and sender settings
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OscSettings {
    /// Interface to listen on (0.0.0.0 for all)
    #[serde(default = "default_listen")]
    pub listen: IpAddr,

    /// Port to listen on; must match the sender's destination port
    #[serde(default = "default_listen_port")]
    pub port: u16,

    /// Default destination for `osc send`
    #[serde(default = "default_send_host")]
    pub send_host: IpAddr,

    #[serde(default = "default_send_port")]
    pub send_port: u16,
}

impl Default for OscSettings {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_listen_port(),
            send_host: default_send_host(),
            send_port: default_send_port(),
        }
    }
}

impl OscSettings {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen, self.port)
    }

    pub fn send_addr(&self) -> SocketAddr {
        SocketAddr::new(self.send_host, self.send_port)
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(path.as_ref().to_path_buf(), e))?;

        toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.as_ref().to_path_buf(), e))
    }

    /// Load an explicitly requested file, or the default file if it exists,
    /// or fall back to defaults.
    ///
    /// Returns the path that was loaded, if any.
    pub fn load(path: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        match path {
            Some(path) => Ok((Self::from_file(path)?, Some(path.to_path_buf()))),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_PATH);
                if default.is_file() {
                    Ok((Self::from_file(&default)?, Some(default)))
                } else {
                    Ok((Self::default(), None))
                }
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse config file {}", .0.display())]
    Parse(PathBuf, #[source] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.hub.url, "http://homeassistant.local:80");
        assert_eq!(config.hub.token_env, "HAKEY");
        assert!(config.hub.token.is_none());
        assert_eq!(config.osc.listen_addr(), "0.0.0.0:8006".parse().unwrap());
        assert_eq!(config.osc.send_addr(), "127.0.0.1:8765".parse().unwrap());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [logging]
            level = "debug"

            [hub]
            url = "http://10.1.10.5:8123"
            token_env = "HA_TOKEN"

            [osc]
            listen = "10.1.10.203"
            port = 9000
            send_host = "10.1.10.7"
            send_port = 53000
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.hub.url, "http://10.1.10.5:8123");
        assert_eq!(config.hub.token_env, "HA_TOKEN");
        assert_eq!(config.osc.listen_addr(), "10.1.10.203:9000".parse().unwrap());
        assert_eq!(config.osc.send_addr(), "10.1.10.7:53000".parse().unwrap());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = toml::from_str::<Config>("[osc]\nprot = 9000\n").unwrap_err();
        assert!(err.to_string().contains("prot"));
    }

    #[test]
    fn test_invalid_listen_address() {
        assert!(toml::from_str::<Config>("[osc]\nlisten = \"not-an-ip\"\n").is_err());
    }

    #[test]
    fn test_log_level_from_str() {
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("trace".parse::<LogLevel>().unwrap(), LogLevel::Trace);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_resolve_token_from_env() {
        let settings = HubSettings::default();
        let config = settings
            .resolve_with(|var| (var == "HAKEY").then(|| "abc".to_string()))
            .unwrap();
        assert_eq!(config.token, "abc");
        assert_eq!(config.url, "http://homeassistant.local:80");
    }

    #[test]
    fn test_resolve_prefers_file_token() {
        let settings = HubSettings {
            token: Some("from-file".to_string()),
            ..HubSettings::default()
        };
        let config = settings.resolve_with(|_| Some("from-env".to_string())).unwrap();
        assert_eq!(config.token, "from-file");
    }

    #[test]
    fn test_resolve_missing_token() {
        let settings = HubSettings {
            token_env: "SHOWPROBE_TEST_TOKEN".to_string(),
            ..HubSettings::default()
        };

        let err = settings.resolve_with(|_| None).unwrap_err();
        assert!(matches!(err, hub::Error::MissingCredential { ref var } if var == "SHOWPROBE_TEST_TOKEN"));

        // An empty variable counts as unset
        let err = settings.resolve_with(|_| Some("  ".to_string())).unwrap_err();
        assert!(matches!(err, hub::Error::MissingCredential { .. }));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("showprobe.toml");
        std::fs::write(&path, "[osc]\nport = 8100\n").unwrap();

        let (config, loaded) = Config::load(Some(&path)).unwrap();
        assert_eq!(config.osc.port, 8100);
        assert_eq!(loaded.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_from_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(matches!(Config::from_file(&missing), Err(ConfigError::Io(..))));

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[osc\n").unwrap();
        assert!(matches!(Config::from_file(&bad), Err(ConfigError::Parse(..))));
    }

    #[test]
    fn test_error_chain_names_cause_once() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let err = Config::from_file(&missing).unwrap_err();
        let cause = std::error::Error::source(&err).unwrap().to_string();

        let report = format!("{:#}", anyhow::Error::from(err));
        assert!(report.starts_with("Failed to read config file "));
        assert_eq!(report.matches(cause.as_str()).count(), 1, "{}", report);
    }
}
