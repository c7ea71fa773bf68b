use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use jobwatch_core::SnapshotScope;
use jobwatch_engine::{PollSettings, SourceSettings};
use jobwatch_logging::{watch_info, LevelFilter, LogDestination, DEFAULT_LOG_FILE};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "jobwatch.ron";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogTarget {
    File,
    Terminal,
    Both,
}

/// Settings read from the RON config file. Every field is optional in the
/// file and falls back to its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub base_url: String,
    pub page_size: u32,
    /// 0 disables the timer; lists then only refresh on demand.
    pub poll_interval_ms: u64,
    pub max_backoff_ms: u64,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub endpoints: BTreeMap<String, String>,
    pub snapshot_scope: SnapshotScope,
    pub log_target: LogTarget,
    pub log_file: PathBuf,
    pub log_level: String,
}

impl Default for WatchConfig {
    fn default() -> Self {
        let source = SourceSettings::default();
        Self {
            base_url: source.base_url,
            page_size: 10,
            poll_interval_ms: 5_000,
            max_backoff_ms: 60_000,
            connect_timeout_ms: duration_ms(source.connect_timeout),
            request_timeout_ms: duration_ms(source.request_timeout),
            endpoints: source.endpoints,
            snapshot_scope: SnapshotScope::default(),
            log_target: LogTarget::File,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            log_level: "info".to_string(),
        }
    }
}

impl WatchConfig {
    pub fn source_settings(&self, bearer_token: Option<String>) -> SourceSettings {
        SourceSettings {
            base_url: self.base_url.clone(),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            bearer_token,
            endpoints: self.endpoints.clone(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            max_backoff: Duration::from_millis(self.max_backoff_ms),
        }
    }

    pub fn log_destination(&self) -> LogDestination {
        match self.log_target {
            LogTarget::File => LogDestination::File(self.log_file.clone()),
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::Both => LogDestination::Both(self.log_file.clone()),
        }
    }

    /// Unrecognised levels fall back to `Info`.
    pub fn log_level(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::Info)
    }
}

/// Reads the config file. A missing file yields the defaults.
pub fn load_config(path: &Path) -> anyhow::Result<WatchConfig> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(WatchConfig::default());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read config {}", path.display()));
        }
    };

    let config = ron::from_str(&content)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    watch_info!("Loaded config from {:?}", path);
    Ok(config)
}

/// Writes `config` to `path`. An existing file that does not load is left
/// alone so a typo is never replaced by defaults.
pub fn save_config(path: &Path, config: &WatchConfig) -> anyhow::Result<()> {
    if path.exists() {
        load_config(path).context("refusing to overwrite a config that does not load")?;
    }
    let pretty = ron::ser::PrettyConfig::new();
    let content =
        ron::ser::to_string_pretty(config, pretty).context("failed to serialize config")?;
    fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))?;
    watch_info!("Wrote config to {:?}", path);
    Ok(())
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = load_config(&dir.path().join("absent.ron")).expect("defaults");
        assert_eq!(config, WatchConfig::default());
        assert_eq!(config.page_size, 10);
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.endpoints.get("analyses").map(String::as_str), Some("/analyses/"));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        fs::write(
            &path,
            r#"(base_url: "http://analysis.local:9000", poll_interval_ms: 0, snapshot_scope: across_pages)"#,
        )
        .expect("write");

        let config = load_config(&path).expect("parsed");
        assert_eq!(config.base_url, "http://analysis.local:9000");
        assert_eq!(config.poll_interval(), Duration::ZERO);
        assert_eq!(config.snapshot_scope, SnapshotScope::AcrossPages);
        assert_eq!(config.max_backoff_ms, 60_000);
        assert_eq!(config.log_target, LogTarget::File);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, "(page_size: \"ten\")").expect("write");

        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse config"));
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        let config = WatchConfig {
            page_size: 25,
            log_target: LogTarget::Both,
            ..WatchConfig::default()
        };

        save_config(&path, &config).expect("saved");
        assert_eq!(load_config(&path).expect("loaded"), config);
    }

    #[test]
    fn malformed_file_is_not_overwritten() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        let broken = "(page_size: 25, poll_interval_ms: \"often\")";
        fs::write(&path, broken).expect("write");

        let err = save_config(&path, &WatchConfig::default()).unwrap_err();
        assert!(format!("{err:#}").contains("refusing to overwrite"));
        assert_eq!(fs::read_to_string(&path).expect("read"), broken);
    }

    #[test]
    fn settings_carry_token_and_timeouts() {
        let config = WatchConfig {
            request_timeout_ms: 1_500,
            log_level: "nonsense".to_string(),
            ..WatchConfig::default()
        };
        let settings = config.source_settings(Some("tok".to_string()));
        assert_eq!(settings.bearer_token.as_deref(), Some("tok"));
        assert_eq!(settings.request_timeout, Duration::from_millis(1_500));
        assert_eq!(config.log_level(), LevelFilter::Info);
        assert_eq!(
            config.log_destination(),
            LogDestination::File(PathBuf::from(DEFAULT_LOG_FILE))
        );
    }
}
