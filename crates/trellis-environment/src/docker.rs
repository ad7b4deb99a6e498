// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use tracing::{info, warn};
use trellis_common_exec::CommandRunner;

use crate::environment::FailedStep;
use crate::error::EnvironmentError;
use crate::status::ClusterStatus;

/// Local Docker daemon used alongside the cluster.
pub struct DockerRuntime {
	runner: Arc<dyn CommandRunner>,
	elevated: bool,
}

impl DockerRuntime {
	pub fn new(runner: Arc<dyn CommandRunner>, elevated: bool) -> Self {
		Self { runner, elevated }
	}

	/// The runtime reports no components.
	pub async fn status(&self) -> Result<ClusterStatus, EnvironmentError> {
		Ok(ClusterStatus::default())
	}

	/// Stop every running container.
	///
	/// Listing failure is an error; individual stop failures are logged and
	/// returned so the caller can inspect them.
	pub async fn teardown(&self) -> Result<Vec<FailedStep>, EnvironmentError> {
		let ids = self
			.runner
			.run("docker ps -q", self.elevated)
			.await
			.map_err(EnvironmentError::ListContainers)?;

		let mut failed = Vec::new();
		for id in ids.split_whitespace() {
			let command = format!("docker stop {id}");
			match self.runner.run(&command, self.elevated).await {
				Ok(_) => info!(container = id, "stopped container"),
				Err(e) => {
					warn!(container = id, error = %e, "failed to stop container");
					failed.push(FailedStep {
						step: command,
						error: e.to_string(),
					});
				}
			}
		}
		Ok(failed)
	}
}
