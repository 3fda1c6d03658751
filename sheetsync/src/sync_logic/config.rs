use clap::Parser;
use lib_bugsheet::BugQuery;
use lib_bugsheet::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file read when `--config-path` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "sheet_sync.conf";

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default)]
#[clap(about = "Publishes per-team open bug counts to a Smartsheet report", version)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[clap(long, env = "BUGSHEET_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "BUGSHEET_TEAM_DATA", help = "Path to the team directory (JSON or JSON5).")]
    pub team_data: Option<PathBuf>,

    #[clap(long, env = "BUGSHEET_BUGZILLA_ENDPOINT", help = "Bugzilla base URL.")]
    pub bugzilla_endpoint: Option<String>,

    #[clap(long, env = "BUGSHEET_BUGZILLA_KEY", help = "Path to file containing the Bugzilla API key.")]
    pub bugzilla_key: Option<PathBuf>,

    #[clap(long, env = "BUGSHEET_TEST_BUG_DATA", help = "Path to a file of test bug data. Replaces Bugzilla when set.")]
    pub test_bug_data: Option<PathBuf>,

    #[clap(long, env = "BUGSHEET_SMARTSHEET_ENDPOINT", help = "Smartsheet API base URL.")]
    pub smartsheet_endpoint: Option<String>,

    #[clap(long, env = "BUGSHEET_SMARTSHEET_KEY", help = "Path to file containing the Smartsheet API key.")]
    pub smartsheet_key: Option<PathBuf>,

    #[clap(long, env = "BUGSHEET_SHEET_ID", help = "Id of the sheet to update.")]
    pub sheet_id: Option<String>,

    #[clap(long, env = "BUGSHEET_INTERVAL_SECONDS", help = "Seconds between reconciliations.")]
    pub interval_seconds: Option<u64>,

    #[clap(long, env = "BUGSHEET_TARGETS", value_delimiter = ',', help = "Target releases counted as current, comma separated.")]
    pub targets: Option<Vec<String>>,

    #[clap(long, env = "BUGSHEET_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "BUGSHEET_LOG_LEVEL", help = "Logging level (debug, info, warn, error).")]
    pub log_level: Option<String>,

    #[clap(long, env = "BUGSHEET_ONCE", num_args = 0..=1, default_missing_value = "true", help = "Reconcile and publish once, then exit. `--once=false` overrides the config file.")]
    pub once: Option<bool>,

    /// Tracker search override. Only settable from the config file.
    #[clap(skip)]
    pub query: Option<BugQuery>,
}

/// Fully resolved settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub team_data: PathBuf,
    pub bugzilla_endpoint: String,
    pub bugzilla_key: PathBuf,
    pub test_bug_data: Option<PathBuf>,
    pub smartsheet_endpoint: String,
    pub smartsheet_key: PathBuf,
    pub sheet_id: String,
    pub interval: Duration,
    pub targets: Vec<String>,
    pub log_dir: PathBuf,
    pub log_level: String,
    pub once: bool,
    pub query: BugQuery,
    /// Config file that was read, if one existed.
    pub config_file: Option<PathBuf>,
}

impl Config {
    // Merge two Config structs, where 'other' overrides 'self' for Some values
    fn merge(self, other: Config) -> Config {
        Config {
            config_path: other.config_path.or(self.config_path),
            team_data: other.team_data.or(self.team_data),
            bugzilla_endpoint: other.bugzilla_endpoint.or(self.bugzilla_endpoint),
            bugzilla_key: other.bugzilla_key.or(self.bugzilla_key),
            test_bug_data: other.test_bug_data.or(self.test_bug_data),
            smartsheet_endpoint: other.smartsheet_endpoint.or(self.smartsheet_endpoint),
            smartsheet_key: other.smartsheet_key.or(self.smartsheet_key),
            sheet_id: other.sheet_id.or(self.sheet_id),
            interval_seconds: other.interval_seconds.or(self.interval_seconds),
            targets: other.targets.or(self.targets),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            once: other.once.or(self.once),
            query: other.query.or(self.query),
        }
    }

    fn into_settings(self) -> Result<Settings, ConfigError> {
        let required = |value: Option<String>, name: &str| {
            value
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingSetting(name.to_string()))
        };
        let missing = |name: &str| ConfigError::MissingSetting(name.to_string());

        let interval_seconds = self.interval_seconds.ok_or_else(|| missing("interval_seconds"))?;
        if interval_seconds == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "interval_seconds".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        Ok(Settings {
            team_data: self.team_data.ok_or_else(|| missing("team_data"))?,
            bugzilla_endpoint: required(self.bugzilla_endpoint, "bugzilla_endpoint")?,
            bugzilla_key: self.bugzilla_key.ok_or_else(|| missing("bugzilla_key"))?,
            test_bug_data: self.test_bug_data,
            smartsheet_endpoint: required(self.smartsheet_endpoint, "smartsheet_endpoint")?,
            smartsheet_key: self.smartsheet_key.ok_or_else(|| missing("smartsheet_key"))?,
            sheet_id: required(self.sheet_id, "sheet_id")?,
            interval: Duration::from_secs(interval_seconds),
            targets: self.targets.unwrap_or_default(),
            log_dir: self.log_dir.ok_or_else(|| missing("log_dir"))?,
            log_level: self.log_level.unwrap_or_else(|| "info".to_string()),
            once: self.once.unwrap_or(false),
            config_file: None,
            query: self.query.unwrap_or_default(),
        })
    }
}

/// Built-in defaults, the lowest-precedence layer.
pub fn default_config() -> Config {
    Config {
        team_data: Some(PathBuf::from("teams.json")),
        bugzilla_endpoint: Some(lib_bugsheet::trackers::bugzilla::DEFAULT_ENDPOINT.to_string()),
        bugzilla_key: Some(PathBuf::from("bugzillaKey")),
        smartsheet_endpoint: Some(lib_bugsheet::sheets::smartsheet::DEFAULT_ENDPOINT.to_string()),
        smartsheet_key: Some(PathBuf::from("smartsheetKey")),
        interval_seconds: Some(lib_bugsheet::bugs::DEFAULT_INTERVAL.as_secs()),
        targets: Some(vec!["---".to_string(), "4.5.0".to_string()]),
        log_dir: Some(PathBuf::from("./logs")),
        log_level: Some("info".to_string()),
        ..Default::default()
    }
}

/// Reads the JSON config file. A missing file is not an error.
fn read_file_config(path: &Path) -> Result<Option<Config>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }

    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = serde_json::from_str::<Config>(&raw).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(Some(config))
}

/// Layers defaults, the config file and `cli` (which already carries the
/// environment), later layers winning.
pub fn resolve(cli: Config) -> Result<Settings, ConfigError> {
    let config_file_path = cli
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let mut current_config = default_config();
    let file_config = read_file_config(&config_file_path)?;
    let config_file = file_config.as_ref().map(|_| config_file_path.clone());
    if let Some(file_config) = file_config {
        current_config = current_config.merge(file_config);
    }
    current_config = current_config.merge(cli);

    let mut settings = current_config.into_settings()?;
    settings.config_file = config_file;
    Ok(settings)
}

pub fn load_config() -> Result<Settings, ConfigError> {
    resolve(Config::parse())
}
