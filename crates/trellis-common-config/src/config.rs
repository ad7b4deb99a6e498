// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::env::env_layer_from;
use crate::error::ConfigError;
use crate::layer::ConfigLayer;

/// Cluster platforms the harness knows how to provision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Platform {
	/// Single-node cluster started with the VM-less `none` driver.
	#[default]
	Minikube,
}

impl Platform {
	pub fn as_str(&self) -> &'static str {
		match self {
			Platform::Minikube => "minikube",
		}
	}
}

impl fmt::Display for Platform {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Platform {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"minikube" => Ok(Platform::Minikube),
			_ => Err(ConfigError::UnsupportedPlatform(s.to_string())),
		}
	}
}

/// Named configuration keys.
///
/// Each key maps to exactly one field of [`HarnessConfig`] and one
/// environment variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
	Platform,
	UseSudo,
	Verbose,
	SkipOwnershipFix,
	HomeDir,
	User,
	ClusterTimeoutSecs,
	WaitUnitSecs,
	StatusComponent,
	LogLevel,
}

impl ConfigKey {
	pub const ALL: [ConfigKey; 10] = [
		ConfigKey::Platform,
		ConfigKey::UseSudo,
		ConfigKey::Verbose,
		ConfigKey::SkipOwnershipFix,
		ConfigKey::HomeDir,
		ConfigKey::User,
		ConfigKey::ClusterTimeoutSecs,
		ConfigKey::WaitUnitSecs,
		ConfigKey::StatusComponent,
		ConfigKey::LogLevel,
	];

	/// Environment variable that overrides this key.
	pub fn env_var(&self) -> &'static str {
		match self {
			ConfigKey::Platform => "TRELLIS_PLATFORM",
			ConfigKey::UseSudo => "USE_SUDO",
			ConfigKey::Verbose => "TRELLIS_VERBOSE_LOG",
			ConfigKey::SkipOwnershipFix => "CHANGE_MINIKUBE_NONE_USER",
			ConfigKey::HomeDir => "HOME",
			ConfigKey::User => "USER",
			ConfigKey::ClusterTimeoutSecs => "TRELLIS_CLUSTER_TIMEOUT_SECS",
			ConfigKey::WaitUnitSecs => "TRELLIS_WAIT_UNIT_SECS",
			ConfigKey::StatusComponent => "TRELLIS_STATUS_COMPONENT",
			ConfigKey::LogLevel => "TRELLIS_LOG_LEVEL",
		}
	}
}

/// Fully resolved harness configuration.
///
/// Built once at startup and handed to each component constructor.
#[derive(Debug, Clone, PartialEq)]
pub struct HarnessConfig {
	pub platform: Platform,
	/// Run cluster lifecycle commands through `sudo`.
	pub use_sudo: bool,
	pub verbose: bool,
	/// Leave credential/state directory ownership to an external supervisor.
	pub skip_ownership_fix: bool,
	pub home_dir: PathBuf,
	pub user: String,
	pub cluster_timeout: Duration,
	/// Short interval used between polls of sub-tasks.
	pub wait_unit: Duration,
	/// Component of the cluster status output that reflects the cluster state.
	pub status_component: String,
	pub log_level: String,
}

impl HarnessConfig {
	/// Load configuration from the process environment and an optional file.
	///
	/// A file that cannot be read or parsed is logged and skipped so a test
	/// run can still proceed on defaults.
	pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
		Self::load_with(path, |key| std::env::var(key).ok())
	}

	/// Like [`HarnessConfig::load`] with an explicit environment lookup.
	pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let mut layer = ConfigLayer::default();

		if let Some(path) = path {
			match ConfigLayer::from_file(path) {
				Ok(file_layer) => layer.merge(file_layer),
				Err(e) => warn!(error = %e, "error loading config file, continuing with defaults"),
			}
		}

		layer.merge(env_layer_from(lookup)?);
		layer.finalize()
	}

	/// String form of a single configuration value.
	pub fn get_string(&self, key: ConfigKey) -> String {
		match key {
			ConfigKey::Platform => self.platform.to_string(),
			ConfigKey::UseSudo => self.use_sudo.to_string(),
			ConfigKey::Verbose => self.verbose.to_string(),
			ConfigKey::SkipOwnershipFix => self.skip_ownership_fix.to_string(),
			ConfigKey::HomeDir => self.home_dir.display().to_string(),
			ConfigKey::User => self.user.clone(),
			ConfigKey::ClusterTimeoutSecs => self.cluster_timeout.as_secs().to_string(),
			ConfigKey::WaitUnitSecs => self.wait_unit.as_secs().to_string(),
			ConfigKey::StatusComponent => self.status_component.clone(),
			ConfigKey::LogLevel => self.log_level.clone(),
		}
	}
}
