use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;

use crate::sessions::{DateRange, InvalidDateRange};

pub const CONFIG_ENV: &str = "MC_PLAYTIME_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "mc-playtime.toml";

/// Commented starting point written by `mc-playtime init`.
pub const TEMPLATE: &str = r#"# mc-playtime configuration

[ssh]
# Minecraft server hostname or IP
hostname = "example.com"
# SSH user and private key used to log in
username = "username"
key_path = "/path/to/key"
port = 22
# passphrase = "only if the key is encrypted"
# Directory holding latest.log and the rotated *.log.gz files
log_dir = "minecraft-server/minecraft-data/logs"

[viz]
# Inclusive YYYY-MM-DD bounds; remove either line for an open range
start_date = "2025-03-23"
end_date = "2025-03-25"
# Where the timeline PNG is written
output_path = "output/minecraft_sessions.png"
"#;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("no [ssh] section configured; pass --input or run `mc-playtime init`")]
    MissingSsh,
    #[error(transparent)]
    DateRange(#[from] InvalidDateRange),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SshConfig {
    pub hostname: String,
    pub username: String,
    pub key_path: PathBuf,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub passphrase: Option<String>,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VizConfig {
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
}

impl Default for VizConfig {
    fn default() -> Self {
        Self {
            start_date: None,
            end_date: None,
            output_path: default_output_path(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ssh: Option<SshConfig>,
    #[serde(default)]
    pub viz: VizConfig,
}

fn default_port() -> u16 {
    22
}

fn default_log_dir() -> String {
    "minecraft-server/minecraft-data/logs".to_string()
}

fn default_output_path() -> PathBuf {
    PathBuf::from("output").join("minecraft_sessions.png")
}

/// Per-invocation overrides for the `[viz]` section.
#[derive(Debug, Clone, Default)]
pub struct VizOverrides {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub output_path: Option<PathBuf>,
}

/// Visualization parameters after overrides and validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VizSettings {
    pub range: DateRange,
    pub output_path: PathBuf,
}

impl VizConfig {
    /// Each override replaces its configured value individually.
    pub fn resolve(&self, overrides: &VizOverrides) -> Result<VizSettings, ConfigError> {
        let range = DateRange::new(
            overrides.start_date.or(self.start_date),
            overrides.end_date.or(self.end_date),
        )?;
        let output_path = overrides
            .output_path
            .clone()
            .unwrap_or_else(|| self.output_path.clone());

        Ok(VizSettings { range, output_path })
    }
}

impl Config {
    pub fn parse_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        Self::parse_toml(&contents)
    }

    /// Load the config from the resolved location.
    ///
    /// A missing file is only an error when the path was asked for
    /// explicitly; otherwise defaults apply.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_from(explicit, std::env::var(CONFIG_ENV).ok())
    }

    /// A missing file is only an error when a path was actually given.
    /// An empty env var counts as unset.
    fn load_from(explicit: Option<&Path>, env_value: Option<String>) -> Result<Self, ConfigError> {
        let env_value = env_value.filter(|v| !v.is_empty());
        let asked_for = explicit.is_some() || env_value.is_some();
        let path = resolve_path(explicit, env_value);

        match Self::from_file(&path) {
            Err(ConfigError::NotFound(_)) if !asked_for => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn ssh(&self) -> Result<&SshConfig, ConfigError> {
        self.ssh.as_ref().ok_or(ConfigError::MissingSsh)
    }
}

/// Priority:
/// 1. `--config` flag
/// 2. `MC_PLAYTIME_CONFIG` env var
/// 3. `./mc-playtime.toml`
pub fn resolve_path(explicit: Option<&Path>, env_value: Option<String>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| env_value.filter(|v| !v.is_empty()).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_template_parses() {
        let config = Config::parse_toml(TEMPLATE).unwrap();
        let ssh = config.ssh().unwrap();

        assert_eq!(ssh.hostname, "example.com");
        assert_eq!(ssh.port, 22);
        assert_eq!(ssh.passphrase, None);
        assert_eq!(config.viz.start_date, Some(date(2025, 3, 23)));
        assert_eq!(config.viz.end_date, Some(date(2025, 3, 25)));
        assert_eq!(
            config.viz.output_path,
            PathBuf::from("output/minecraft_sessions.png")
        );
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = Config::parse_toml(
            r#"
            [ssh]
            hostname = "test.example.com"
            username = "test_user"
            key_path = "/path/to/test/key"
            "#,
        )
        .unwrap();

        let ssh = config.ssh().unwrap();
        assert_eq!(ssh.port, 22);
        assert_eq!(ssh.log_dir, "minecraft-server/minecraft-data/logs");
        assert_eq!(config.viz.start_date, None);
        assert_eq!(config.viz.output_path, default_output_path());
    }

    #[test]
    fn test_empty_config_has_no_ssh() {
        let config = Config::parse_toml("").unwrap();
        assert!(matches!(config.ssh(), Err(ConfigError::MissingSsh)));
    }

    #[test]
    fn test_bad_date_is_parse_error() {
        let err = Config::parse_toml("[viz]\nstart_date = \"2025-13-01\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_overrides_apply_individually() {
        let viz = VizConfig {
            start_date: Some(date(2025, 3, 23)),
            end_date: Some(date(2025, 3, 25)),
            output_path: PathBuf::from("output/a.png"),
        };

        let settings = viz
            .resolve(&VizOverrides {
                end_date: Some(date(2025, 3, 30)),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(settings.range.start(), Some(date(2025, 3, 23)));
        assert_eq!(settings.range.end(), Some(date(2025, 3, 30)));
        assert_eq!(settings.output_path, PathBuf::from("output/a.png"));
    }

    #[test]
    fn test_reversed_dates_rejected() {
        let viz = VizConfig::default();
        let err = viz
            .resolve(&VizOverrides {
                start_date: Some(date(2025, 3, 25)),
                end_date: Some(date(2025, 3, 23)),
                output_path: None,
            })
            .unwrap_err();
        assert!(matches!(err, ConfigError::DateRange(_)));
    }

    #[test]
    fn test_resolve_path_priority() {
        let explicit = PathBuf::from("/etc/mc.toml");
        assert_eq!(
            resolve_path(Some(&explicit), Some("/env.toml".into())),
            explicit
        );
        assert_eq!(
            resolve_path(None, Some("/env.toml".into())),
            PathBuf::from("/env.toml")
        );
        assert_eq!(resolve_path(None, Some(String::new())), PathBuf::from(DEFAULT_CONFIG_FILE));
        assert_eq!(resolve_path(None, None), PathBuf::from(DEFAULT_CONFIG_FILE));
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", TEMPLATE).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.ssh().unwrap().username, "username");
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let err = Config::load(Some(Path::new("/no/such/mc-playtime.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_empty_env_value_falls_back_to_defaults() {
        // crate root has no mc-playtime.toml
        let config = Config::load_from(None, Some(String::new())).unwrap();
        assert!(config.ssh.is_none());
        assert_eq!(config.viz.output_path, default_output_path());
    }

    #[test]
    fn test_env_value_missing_file_is_error() {
        let err = Config::load_from(None, Some("/no/such/env.toml".into())).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }
}
