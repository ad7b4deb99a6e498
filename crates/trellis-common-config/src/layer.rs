// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration layer for merging from multiple sources.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, trace};

use crate::config::{HarnessConfig, Platform};
use crate::error::ConfigError;

const DEFAULT_CLUSTER_TIMEOUT_SECS: u64 = 60;
const DEFAULT_WAIT_UNIT_SECS: u64 = 1;
const DEFAULT_STATUS_COMPONENT: &str = "host";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_USER: &str = "root";

/// Harness configuration layer - all fields are Option for merging.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
	pub platform: Option<String>,
	pub use_sudo: Option<bool>,
	pub verbose: Option<bool>,
	pub skip_ownership_fix: Option<bool>,
	pub home_dir: Option<PathBuf>,
	pub user: Option<String>,
	pub cluster_timeout_secs: Option<u64>,
	pub wait_unit_secs: Option<u64>,
	pub status_component: Option<String>,
	pub log_level: Option<String>,
}

impl ConfigLayer {
	/// Read a layer from a TOML file. A missing file is an error here; callers
	/// decide whether that is fatal.
	pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
		debug!(path = %path.display(), "loading config file");

		let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
			path: path.to_path_buf(),
			source: e,
		})?;

		let layer: ConfigLayer = toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
			path: path.to_path_buf(),
			source: e,
		})?;

		trace!(path = %path.display(), "parsed config layer");
		Ok(layer)
	}

	/// Merge another layer into this one. Other layer takes precedence.
	pub fn merge(&mut self, other: ConfigLayer) {
		self.platform = other.platform.or(self.platform.take());
		self.use_sudo = other.use_sudo.or(self.use_sudo);
		self.verbose = other.verbose.or(self.verbose);
		self.skip_ownership_fix = other.skip_ownership_fix.or(self.skip_ownership_fix);
		self.home_dir = other.home_dir.or(self.home_dir.take());
		self.user = other.user.or(self.user.take());
		self.cluster_timeout_secs = other.cluster_timeout_secs.or(self.cluster_timeout_secs);
		self.wait_unit_secs = other.wait_unit_secs.or(self.wait_unit_secs);
		self.status_component = other.status_component.or(self.status_component.take());
		self.log_level = other.log_level.or(self.log_level.take());
	}

	/// Apply built-in defaults and validate.
	pub fn finalize(self) -> Result<HarnessConfig, ConfigError> {
		let platform = match self.platform {
			Some(name) => name.parse::<Platform>()?,
			None => Platform::default(),
		};

		let home_dir = self
			.home_dir
			.or_else(dirs::home_dir)
			.ok_or_else(|| ConfigError::MissingEnvVar("HOME".to_string()))?;

		let wait_unit_secs = self.wait_unit_secs.unwrap_or(DEFAULT_WAIT_UNIT_SECS);
		if wait_unit_secs == 0 {
			return Err(ConfigError::InvalidValue {
				key: "wait_unit_secs".to_string(),
				message: "must be greater than zero".to_string(),
			});
		}

		Ok(HarnessConfig {
			platform,
			use_sudo: self.use_sudo.unwrap_or(true),
			verbose: self.verbose.unwrap_or(false),
			skip_ownership_fix: self.skip_ownership_fix.unwrap_or(false),
			home_dir,
			user: self.user.unwrap_or_else(|| DEFAULT_USER.to_string()),
			cluster_timeout: Duration::from_secs(
				self
					.cluster_timeout_secs
					.unwrap_or(DEFAULT_CLUSTER_TIMEOUT_SECS),
			),
			wait_unit: Duration::from_secs(wait_unit_secs),
			status_component: self
				.status_component
				.unwrap_or_else(|| DEFAULT_STATUS_COMPONENT.to_string()),
			log_level: self
				.log_level
				.unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
		})
	}
}
