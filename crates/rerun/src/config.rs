use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

const APP_NAME: &str = "rerun";

// ── config.toml ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
	#[serde(default = "default_poll_interval")]
	pub poll_interval_ms: u64,
	#[serde(default = "default_stop_timeout")]
	pub stop_timeout_ms: u64,
	#[serde(default)]
	pub ignore: Vec<String>,
	#[serde(default = "default_log_level")]
	pub log_level: String,
	#[serde(default)]
	pub logs: LogsConfig,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			poll_interval_ms: default_poll_interval(),
			stop_timeout_ms: default_stop_timeout(),
			ignore: Vec::new(),
			log_level: default_log_level(),
			logs: LogsConfig::default(),
		}
	}
}

fn default_poll_interval() -> u64 { 250 }
fn default_stop_timeout() -> u64 { 3000 }
fn default_log_level() -> String { "info".into() }

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogsConfig {
	pub dir: Option<PathBuf>,
	#[serde(default = "default_max_size")]
	pub max_size_bytes: u64,
	#[serde(default = "default_max_age_days")]
	pub max_age_days: u32,
	#[serde(default = "default_max_files")]
	pub max_files: u32,
}

impl Default for LogsConfig {
	fn default() -> Self {
		Self {
			dir: None,
			max_size_bytes: default_max_size(),
			max_age_days: default_max_age_days(),
			max_files: default_max_files(),
		}
	}
}

fn default_max_size() -> u64 { 10 * 1024 * 1024 }
fn default_max_age_days() -> u32 { 7 }
fn default_max_files() -> u32 { 5 }

impl Config {
	pub fn from_toml_str(content: &str, path: &Path) -> Result<Self> {
		let config: Config = toml::from_str(content).map_err(|e| Error::Config {
			path: path.to_path_buf(),
			message: e.to_string(),
		})?;
		if config.poll_interval_ms == 0 {
			return Err(Error::Config {
				path: path.to_path_buf(),
				message: "poll_interval_ms must be greater than zero".into(),
			});
		}
		Ok(config)
	}

	pub fn poll_interval(&self) -> Duration {
		Duration::from_millis(self.poll_interval_ms)
	}

	/// `None` disables SIGKILL escalation after a stop.
	pub fn stop_timeout(&self) -> Option<Duration> {
		(self.stop_timeout_ms > 0).then(|| Duration::from_millis(self.stop_timeout_ms))
	}
}

/// Loads `path`, or the default location when `path` is `None`.
///
/// A missing default file yields defaults; a missing explicit file is an error.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
	let (path, explicit) = match path {
		Some(p) => (p.to_path_buf(), true),
		None => (config_dir().join("config.toml"), false),
	};

	if !explicit && !path.exists() {
		return Ok(Config::default());
	}

	let content = std::fs::read_to_string(&path).map_err(|e| Error::Config {
		path: path.clone(),
		message: e.to_string(),
	})?;
	Config::from_toml_str(&content, &path)
}

pub fn config_dir() -> PathBuf {
	if let Ok(dir) = std::env::var("XDG_CONFIG_HOME") {
		PathBuf::from(dir).join(APP_NAME)
	} else if let Some(home) = home_dir() {
		home.join(".config").join(APP_NAME)
	} else {
		PathBuf::from("/tmp").join(APP_NAME).join("config")
	}
}

fn home_dir() -> Option<PathBuf> {
	std::env::var("HOME").ok().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn parse(content: &str) -> Result<Config> {
		Config::from_toml_str(content, Path::new("config.toml"))
	}

	#[test]
	fn empty_file_gives_defaults() {
		let config = parse("").unwrap();
		assert_eq!(config.poll_interval(), Duration::from_millis(250));
		assert_eq!(config.stop_timeout(), Some(Duration::from_secs(3)));
		assert!(config.ignore.is_empty());
		assert_eq!(config.log_level, "info");
		assert!(config.logs.dir.is_none());
		assert_eq!(config.logs.max_files, 5);
	}

	#[test]
	fn overrides_are_applied() {
		let config = parse(
			r#"
poll_interval_ms = 100
stop_timeout_ms = 0
ignore = [".git", "target"]
log_level = "debug"

[logs]
dir = "/tmp/rerun-logs"
max_files = 2
"#,
		)
		.unwrap();
		assert_eq!(config.poll_interval_ms, 100);
		assert_eq!(config.stop_timeout(), None);
		assert_eq!(config.ignore, vec![".git", "target"]);
		assert_eq!(config.logs.dir.as_deref(), Some(Path::new("/tmp/rerun-logs")));
		assert_eq!(config.logs.max_files, 2);
		assert_eq!(config.logs.max_age_days, 7);
	}

	#[test]
	fn zero_interval_is_rejected() {
		let err = parse("poll_interval_ms = 0").unwrap_err();
		assert!(err.to_string().contains("poll_interval_ms"));
	}

	#[test]
	fn unknown_key_is_rejected() {
		assert!(matches!(parse("poll_every = 3"), Err(Error::Config { .. })));
	}

	#[test]
	fn missing_explicit_file_is_an_error() {
		let result = load_config(Some(Path::new("/nonexistent/rerun/config.toml")));
		assert!(matches!(result, Err(Error::Config { .. })));
	}
}
