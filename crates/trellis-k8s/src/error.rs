// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use trellis_common_exec::ExecError;

/// Result type alias for K8s operations.
pub type K8sResult<T> = Result<T, K8sError>;

/// Errors that can occur during K8s operations.
#[derive(Error, Debug)]
pub enum K8sError {
	#[error("K8s API error: {message}")]
	ApiError { message: String },

	#[error("K8s client configuration error: {message}")]
	ClientConfig { message: String },

	#[error("Pod not found: {name}")]
	PodNotFound { name: String },

	#[error("Exec error: {message}")]
	ExecError { message: String },

	#[error("Log stream error: {message}")]
	StreamError { message: String },
}

impl From<kube::Error> for K8sError {
	fn from(err: kube::Error) -> Self {
		K8sError::ApiError {
			message: err.to_string(),
		}
	}
}

/// Errors from the workload helpers.
#[derive(Error, Debug)]
pub enum WorkloadError {
	#[error("No pod with prefix {prefix:?} appeared in namespace {namespace:?}")]
	NoMatchingPods { prefix: String, namespace: String },

	#[error("Pod {pod:?} of namespace {namespace:?} had no container within {timeout:?}")]
	NoContainer {
		pod: String,
		namespace: String,
		timeout: Duration,
	},

	#[error("Pod {pod:?} of namespace {namespace:?} did not have {expected} containers within {timeout:?}")]
	MissingContainer {
		pod: String,
		namespace: String,
		expected: usize,
		timeout: Duration,
	},

	#[error("No nodes registered after {attempts} attempts")]
	NoNodes { attempts: u32 },

	#[error("Failed applying {}: {source}", .path.display())]
	ApplyFailed {
		path: PathBuf,
		#[source]
		source: ExecError,
	},

	#[error("Wait for {resource} was cancelled")]
	Cancelled { resource: String },

	#[error("Invalid wait for {resource}: {reason}")]
	InvalidWait {
		resource: String,
		reason: &'static str,
	},

	#[error(transparent)]
	K8s(#[from] K8sError),

	#[error(transparent)]
	Exec(#[from] ExecError),
}
