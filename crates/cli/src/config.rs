//! YAML config file and the settings resolved from it.
//!
//! Precedence, highest first: command-line flag, `AUTHDBCTL_*` environment
//! variable (both handled by clap), config file, built-in default.
//!
//! ```yaml
//! portal_url: https://auth.example.com/auth
//! username: jsmith
//! format: table
//! timeout_secs: 10
//! retry:
//!   attempts: 3
//!   backoff_ms: 200
//! page_size: 100
//! page_concurrency: 4
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use authdb::{ClientOptions, OutputFormat, Pagination, RetryPolicy};
use serde::{Deserialize, Serialize};

use crate::cli::Cli;

pub const CONFIG_FILE: &str = "config.yaml";
pub const TOKEN_FILE: &str = "token.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
	/// Total tries per request, first one included.
	pub attempts: u32,
	pub backoff_ms: u64,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			attempts: 3,
			backoff_ms: 200,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
	pub portal_url: Option<String>,
	pub username: Option<String>,
	pub format: Option<OutputFormat>,
	pub token_path: Option<PathBuf>,
	pub timeout_secs: u64,
	pub retry: RetryConfig,
	pub page_size: Option<u32>,
	pub page_concurrency: usize,
}

impl Default for CliConfig {
	fn default() -> Self {
		Self {
			portal_url: None,
			username: None,
			format: None,
			token_path: None,
			timeout_secs: 10,
			retry: RetryConfig::default(),
			page_size: None,
			page_concurrency: 4,
		}
	}
}

/// `<config dir>/authdbctl`, e.g. `~/.config/authdbctl` on Linux.
pub fn config_home() -> PathBuf {
	dirs::config_dir()
		.unwrap_or_else(|| PathBuf::from("."))
		.join("authdbctl")
}

impl CliConfig {
	/// Loads `explicit` or, when `None`, the default config file.
	///
	/// A missing default file yields the defaults; a missing explicit file
	/// is an error.
	pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
		match explicit {
			Some(path) => Self::from_file(path),
			None => {
				let path = config_home().join(CONFIG_FILE);
				if path.exists() { Self::from_file(&path) } else { Ok(Self::default()) }
			}
		}
	}

	pub fn from_file(path: &Path) -> anyhow::Result<Self> {
		let content = fs::read_to_string(path)
			.with_context(|| format!("failed to read config file {}", path.display()))?;
		if content.trim().is_empty() {
			return Ok(Self::default());
		}
		let config: Self = serde_yaml::from_str(&content)
			.with_context(|| format!("invalid config file {}", path.display()))?;
		config.validate().with_context(|| format!("invalid config file {}", path.display()))?;
		Ok(config)
	}

	fn validate(&self) -> anyhow::Result<()> {
		if self.timeout_secs == 0 {
			bail!("timeout_secs must be at least 1");
		}
		if self.retry.attempts == 0 {
			bail!("retry.attempts must be at least 1");
		}
		Ok(())
	}
}

/// Everything a command needs, after merging flags, env and config.
#[derive(Debug, Clone)]
pub struct Settings {
	pub portal: Option<String>,
	pub username: Option<String>,
	pub format: OutputFormat,
	pub token_path: PathBuf,
	pub timeout: Duration,
	pub retry: RetryPolicy,
	pub pagination: Pagination,
}

impl Settings {
	pub fn resolve(cli: &Cli, config: CliConfig) -> Self {
		let username = match &cli.command {
			crate::cli::Commands::Connect(args) => args.username.clone(),
			_ => None,
		};

		let base_delay = Duration::from_millis(config.retry.backoff_ms);
		Self {
			portal: cli.portal.clone().or(config.portal_url),
			username: username.or(config.username),
			format: cli.format.or(config.format).unwrap_or_default(),
			token_path: cli
				.token_path
				.clone()
				.or(config.token_path)
				.unwrap_or_else(|| config_home().join(TOKEN_FILE)),
			timeout: Duration::from_secs(config.timeout_secs),
			retry: RetryPolicy {
				max_attempts: config.retry.attempts,
				base_delay,
				max_delay: RetryPolicy::default().max_delay.max(base_delay),
			},
			pagination: Pagination {
				page_size: config.page_size,
				concurrency: config.page_concurrency,
				..Pagination::default()
			},
		}
	}

	pub fn client_options(&self) -> ClientOptions {
		ClientOptions {
			portal: self.portal.clone(),
			retry: self.retry,
			pagination: self.pagination,
			..ClientOptions::new(&self.token_path)
		}
	}
}
