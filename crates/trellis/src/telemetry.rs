// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use trellis_common_config::HarnessConfig;

use crate::error::HarnessError;

/// Filter directive used when `RUST_LOG` is unset.
///
/// Verbose mode raises the level to at least `debug`.
pub fn default_filter(config: &HarnessConfig) -> String {
	let level = match config.log_level.to_ascii_lowercase().as_str() {
		"trace" => "trace",
		_ if config.verbose => "debug",
		"debug" => "debug",
		"warn" | "warning" => "warn",
		"error" => "error",
		_ => "info",
	};
	format!("trellis={level},trellis_k8s={level},trellis_environment={level},trellis_common_wait={level},trellis_common_exec={level},warn")
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_tracing(config: &HarnessConfig) -> Result<(), HarnessError> {
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(config)));

	tracing_subscriber::registry()
		.with(filter)
		.with(fmt::layer().with_target(true))
		.try_init()
		.map_err(|e| HarnessError::Telemetry(e.to_string()))
}
