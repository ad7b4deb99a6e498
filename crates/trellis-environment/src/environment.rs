// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use async_trait::async_trait;
use trellis_common_config::{HarnessConfig, Platform};
use trellis_common_exec::CommandRunner;
use trellis_common_wait::CancellationToken;

use crate::error::EnvironmentError;
use crate::minikube::Minikube;
use crate::reconcile::Action;
use crate::status::{ClusterStatus, ObservedState};

/// A cluster platform the harness can bring to running.
#[async_trait]
pub trait Environment: Send + Sync {
	fn platform(&self) -> Platform;

	/// Probe, plan and run whatever brings the cluster to running.
	async fn setup(&self) -> Result<SetupReport, EnvironmentError>;

	async fn status(&self) -> Result<ClusterStatus, EnvironmentError>;

	/// Delete the cluster unconditionally.
	async fn teardown(&self) -> Result<(), EnvironmentError>;
}

/// A best-effort step that failed during setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedStep {
	pub step: String,
	pub error: String,
}

/// What [`Environment::setup`] observed and did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupReport {
	pub observed: ObservedState,
	pub action: Action,
	/// Teardown on the stopped path does not stop setup. A failure here may
	/// leave stale state behind.
	pub teardown_error: Option<String>,
	pub failed_steps: Vec<FailedStep>,
}

impl SetupReport {
	pub(crate) fn new(observed: ObservedState, action: Action) -> Self {
		Self {
			observed,
			action,
			teardown_error: None,
			failed_steps: Vec::new(),
		}
	}

	pub(crate) fn record_failure(&mut self, step: impl Into<String>, error: impl ToString) {
		self.failed_steps.push(FailedStep {
			step: step.into(),
			error: error.to_string(),
		});
	}

	/// True when every step, best-effort ones included, succeeded.
	pub fn is_clean(&self) -> bool {
		self.teardown_error.is_none() && self.failed_steps.is_empty()
	}
}

/// Environment implementation for the configured platform.
pub fn environment_for(
	config: &HarnessConfig,
	runner: Arc<dyn CommandRunner>,
	cancel: CancellationToken,
) -> Arc<dyn Environment> {
	match config.platform {
		Platform::Minikube => Arc::new(Minikube::new(config, runner, cancel)),
	}
}
