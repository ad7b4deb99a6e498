// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Environment variable source.
//!
//! Each [`ConfigKey`] has one variable (see [`ConfigKey::env_var`]). Values are
//! converted to typed layer fields here and nowhere else.

use std::path::PathBuf;

use tracing::trace;

use crate::config::ConfigKey;
use crate::error::ConfigError;
use crate::layer::ConfigLayer;

/// Build a layer from the process environment.
pub fn env_layer() -> Result<ConfigLayer, ConfigError> {
	env_layer_from(|key| std::env::var(key).ok())
}

/// Build a layer from an arbitrary key lookup.
pub fn env_layer_from<F>(lookup: F) -> Result<ConfigLayer, ConfigError>
where
	F: Fn(&str) -> Option<String>,
{
	let get = |key: ConfigKey| {
		let value = lookup(key.env_var())?;
		trace!(key = key.env_var(), "processing env var");
		Some(value)
	};

	Ok(ConfigLayer {
		platform: get(ConfigKey::Platform).and_then(non_empty),
		use_sudo: get(ConfigKey::UseSudo).and_then(|v| parse_tristate(&v)),
		verbose: get(ConfigKey::Verbose).map(|v| v.eq_ignore_ascii_case("true")),
		// Only the exact lowercase value counts, matching how minikube reads it.
		skip_ownership_fix: get(ConfigKey::SkipOwnershipFix).map(|v| v == "true"),
		home_dir: get(ConfigKey::HomeDir)
			.and_then(non_empty)
			.map(PathBuf::from),
		user: get(ConfigKey::User).and_then(non_empty),
		cluster_timeout_secs: parse_secs(ConfigKey::ClusterTimeoutSecs, get(ConfigKey::ClusterTimeoutSecs))?,
		wait_unit_secs: parse_secs(ConfigKey::WaitUnitSecs, get(ConfigKey::WaitUnitSecs))?,
		status_component: get(ConfigKey::StatusComponent).and_then(non_empty),
		log_level: get(ConfigKey::LogLevel).and_then(non_empty),
	})
}

fn non_empty(value: String) -> Option<String> {
	let trimmed = value.trim();
	if trimmed.is_empty() {
		None
	} else {
		Some(trimmed.to_string())
	}
}

/// `true`/`false` in any case; anything else leaves the lower layer in charge.
fn parse_tristate(value: &str) -> Option<bool> {
	match value.trim().to_ascii_lowercase().as_str() {
		"true" => Some(true),
		"false" => Some(false),
		_ => None,
	}
}

fn parse_secs(key: ConfigKey, value: Option<String>) -> Result<Option<u64>, ConfigError> {
	let Some(value) = value.and_then(non_empty) else {
		return Ok(None);
	};
	value
		.parse::<u64>()
		.map(Some)
		.map_err(|e| ConfigError::InvalidValue {
			key: key.env_var().to_string(),
			message: e.to_string(),
		})
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use std::collections::HashMap;

	fn layer(pairs: &[(&str, &str)]) -> Result<ConfigLayer, ConfigError> {
		let map: HashMap<&str, &str> = pairs.iter().copied().collect();
		env_layer_from(|key| map.get(key).map(|v| v.to_string()))
	}

	#[test]
	fn empty_environment_yields_empty_layer() {
		assert_eq!(layer(&[]).unwrap(), ConfigLayer::default());
	}

	#[test]
	fn use_sudo_accepts_trimmed_mixed_case() {
		assert_eq!(layer(&[("USE_SUDO", " FALSE ")]).unwrap().use_sudo, Some(false));
		assert_eq!(layer(&[("USE_SUDO", "True")]).unwrap().use_sudo, Some(true));
	}

	#[test]
	fn use_sudo_ignores_garbage() {
		assert_eq!(layer(&[("USE_SUDO", "maybe")]).unwrap().use_sudo, None);
	}

	#[test]
	fn verbose_is_case_insensitive() {
		assert_eq!(
			layer(&[("TRELLIS_VERBOSE_LOG", "TRUE")]).unwrap().verbose,
			Some(true)
		);
		assert_eq!(
			layer(&[("TRELLIS_VERBOSE_LOG", "yes")]).unwrap().verbose,
			Some(false)
		);
	}

	#[test]
	fn ownership_override_requires_exact_true() {
		assert_eq!(
			layer(&[("CHANGE_MINIKUBE_NONE_USER", "true")])
				.unwrap()
				.skip_ownership_fix,
			Some(true)
		);
		assert_eq!(
			layer(&[("CHANGE_MINIKUBE_NONE_USER", "TRUE")])
				.unwrap()
				.skip_ownership_fix,
			Some(false)
		);
	}

	#[test]
	fn invalid_seconds_is_an_error() {
		let result = layer(&[("TRELLIS_CLUSTER_TIMEOUT_SECS", "soon")]);
		assert!(matches!(
			result,
			Err(ConfigError::InvalidValue { key, .. }) if key == "TRELLIS_CLUSTER_TIMEOUT_SECS"
		));
	}

	#[test]
	fn blank_strings_are_ignored() {
		let layer = layer(&[("TRELLIS_PLATFORM", "  "), ("HOME", "")]).unwrap();
		assert!(layer.platform.is_none());
		assert!(layer.home_dir.is_none());
	}

	proptest! {
		#[test]
		fn seconds_round_trip(secs in 0u64..1_000_000) {
			let value = secs.to_string();
			let parsed = layer(&[("TRELLIS_WAIT_UNIT_SECS", value.as_str())]).unwrap();
			prop_assert_eq!(parsed.wait_unit_secs, Some(secs));
		}
	}
}
