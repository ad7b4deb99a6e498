// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use thiserror::Error;
use trellis_common_config::ConfigError;
use trellis_environment::EnvironmentError;
use trellis_k8s::{K8sError, WorkloadError};

#[derive(Debug, Error)]
pub enum HarnessError {
	#[error("Configuration error: {0}")]
	Config(#[from] ConfigError),

	#[error(transparent)]
	Environment(#[from] EnvironmentError),

	#[error(transparent)]
	K8s(#[from] K8sError),

	#[error(transparent)]
	Workload(#[from] WorkloadError),

	#[error("Harness was built without the {0} component")]
	NotIncluded(&'static str),

	#[error("Failed to initialize tracing: {0}")]
	Telemetry(String),
}
