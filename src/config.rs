use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use crate::chapters::{StalenessPolicy, DEFAULT_TOLERANCE, MAX_WINDOW_HOURS};

/// Configuration for the feedqueue chapter engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Chapter merging settings
    pub chapters: ChapterConfig,

    /// Skip segment refresh windows
    pub staleness: StalenessConfig,

    /// Persisted per-video state
    pub state: StateConfig,

    /// Performance and resource settings
    pub performance: PerformanceConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterConfig {
    /// Fetch and merge crowd-sourced skip segments at all
    pub enable_skip_segments: bool,

    /// Use chapters from the video description when present
    pub merge_native_chapters: bool,

    /// Timestamp jitter (seconds) treated as the same boundary
    pub tolerance_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StalenessConfig {
    /// Uploads younger than this are always re-checked
    pub recent_upload_hours: u64,

    /// Re-check once the last check is older than this
    pub recheck_interval_hours: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// Directory holding one JSON record per video
    pub state_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// Videos refreshed concurrently in a batch
    pub max_concurrent_refreshes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level when RUST_LOG is not set
    pub level: String,
}

impl StalenessConfig {
    pub fn policy(&self) -> StalenessPolicy {
        StalenessPolicy::new(self.recent_upload_hours, self.recheck_interval_hours)
    }
}

impl Config {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        let mut config_paths = vec![
            PathBuf::from("feedqueue.toml"),
            PathBuf::from("config/feedqueue.toml"),
        ];
        if let Some(home) = std::env::var_os("HOME") {
            config_paths.push(PathBuf::from(home).join(".config/feedqueue/config.toml"));
        }

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str(&config_str) {
                    Ok(config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path.display());
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path.display(), e);
                    }
                }
            }
        }

        Self::from_env()
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Cannot read {}: {}", path.display(), e))?;
        let config: Config = toml::from_str(&config_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(tolerance) = std::env::var("FEEDQUEUE_TOLERANCE") {
            config.chapters.tolerance_seconds = tolerance
                .parse()
                .map_err(|_| anyhow!("FEEDQUEUE_TOLERANCE is not a number: {}", tolerance))?;
        }

        if let Ok(enabled) = std::env::var("FEEDQUEUE_SKIP_SEGMENTS") {
            config.chapters.enable_skip_segments = matches!(
                enabled.to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }

        if let Ok(state_dir) = std::env::var("FEEDQUEUE_STATE_DIR") {
            config.state.state_dir = PathBuf::from(state_dir);
        }

        if let Ok(workers) = std::env::var("FEEDQUEUE_MAX_CONCURRENT") {
            config.performance.max_concurrent_refreshes = workers.parse().unwrap_or(4);
        }

        if let Ok(log_level) = std::env::var("FEEDQUEUE_LOG_LEVEL") {
            config.logging.level = log_level;
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let tolerance = self.chapters.tolerance_seconds;
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(anyhow!("tolerance_seconds must be a non-negative number"));
        }

        if self.performance.max_concurrent_refreshes == 0 {
            return Err(anyhow!("max_concurrent_refreshes must be greater than 0"));
        }

        if self.staleness.recheck_interval_hours == 0 {
            return Err(anyhow!("recheck_interval_hours must be greater than 0"));
        }

        if self.staleness.recent_upload_hours > MAX_WINDOW_HOURS
            || self.staleness.recheck_interval_hours > MAX_WINDOW_HOURS
        {
            return Err(anyhow!(
                "staleness windows must not exceed {} hours",
                MAX_WINDOW_HOURS
            ));
        }

        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "feedqueue configuration:\n\
            - Skip segments: {}\n\
            - Native chapters: {}\n\
            - Tolerance: {:.1}s\n\
            - Recent upload window: {}h\n\
            - Recheck interval: {}h\n\
            - State directory: {}\n\
            - Concurrent refreshes: {}",
            self.chapters.enable_skip_segments,
            self.chapters.merge_native_chapters,
            self.chapters.tolerance_seconds,
            self.staleness.recent_upload_hours,
            self.staleness.recheck_interval_hours,
            self.state.state_dir.display(),
            self.performance.max_concurrent_refreshes,
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chapters: ChapterConfig {
                enable_skip_segments: true,
                merge_native_chapters: true,
                tolerance_seconds: DEFAULT_TOLERANCE,
            },
            staleness: StalenessConfig {
                recent_upload_hours: 24,
                recheck_interval_hours: 72,
            },
            state: StateConfig {
                state_dir: PathBuf::from(".feedqueue_state"),
            },
            performance: PerformanceConfig {
                max_concurrent_refreshes: num_cpus::get().min(8),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_tolerance(mut self, seconds: f64) -> Self {
        self.config.chapters.tolerance_seconds = seconds;
        self
    }

    pub fn enable_skip_segments(mut self, enable: bool) -> Self {
        self.config.chapters.enable_skip_segments = enable;
        self
    }

    pub fn merge_native_chapters(mut self, enable: bool) -> Self {
        self.config.chapters.merge_native_chapters = enable;
        self
    }

    pub fn with_state_dir(mut self, dir: PathBuf) -> Self {
        self.config.state.state_dir = dir;
        self
    }

    pub fn with_max_concurrent(mut self, workers: usize) -> Self {
        self.config.performance.max_concurrent_refreshes = workers;
        self
    }

    pub fn with_staleness(mut self, recent_upload_hours: u64, recheck_interval_hours: u64) -> Self {
        self.config.staleness.recent_upload_hours = recent_upload_hours;
        self.config.staleness.recheck_interval_hours = recheck_interval_hours;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.chapters.enable_skip_segments);
        assert_eq!(config.chapters.tolerance_seconds, DEFAULT_TOLERANCE);
        assert_eq!(config.staleness.recent_upload_hours, 24);
        assert_eq!(config.staleness.recheck_interval_hours, 72);
        assert!(config.performance.max_concurrent_refreshes >= 1);
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .with_tolerance(1.0)
            .enable_skip_segments(false)
            .with_max_concurrent(2)
            .build();

        assert_eq!(config.chapters.tolerance_seconds, 1.0);
        assert!(!config.chapters.enable_skip_segments);
        assert_eq!(config.performance.max_concurrent_refreshes, 2);
    }

    #[test]
    fn test_config_validation() {
        assert!(Config::default().validate().is_ok());

        let negative = ConfigBuilder::new().with_tolerance(-1.0).build();
        assert!(negative.validate().is_err());

        let no_workers = ConfigBuilder::new().with_max_concurrent(0).build();
        assert!(no_workers.validate().is_err());

        let no_interval = ConfigBuilder::new().with_staleness(24, 0).build();
        assert!(no_interval.validate().is_err());

        let huge_window = ConfigBuilder::new().with_staleness(u64::MAX, 72).build();
        assert!(huge_window.validate().is_err());
        let huge_interval = ConfigBuilder::new().with_staleness(24, MAX_WINDOW_HOURS + 1).build();
        assert!(huge_interval.validate().is_err());
    }

    #[test]
    fn test_toml_roundtrip_through_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("feedqueue.toml");

        let config = ConfigBuilder::new().with_tolerance(1.5).build();
        config.save(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.chapters.tolerance_seconds, 1.5);
        assert_eq!(loaded.state.state_dir, config.state.state_dir);
    }

    #[test]
    fn test_staleness_policy_from_config() {
        let config = ConfigBuilder::new().with_staleness(12, 48).build();
        let policy = config.staleness.policy();
        assert_eq!(policy.recent_upload_window, chrono::Duration::hours(12));
        assert_eq!(policy.recheck_interval, chrono::Duration::hours(48));
    }
}
