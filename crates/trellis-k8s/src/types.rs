// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1 as api;

pub use k8s_openapi::api::core::v1::{ContainerStatus, Namespace, Node, Pod, PodStatus};

/// Captured output of a command run inside a container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
	pub stdout: String,
	pub stderr: String,
}

/// State of a single container, taken from a pod snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerState {
	Waiting {
		reason: Option<String>,
		message: Option<String>,
	},
	Running {
		started_at: Option<DateTime<Utc>>,
	},
	Terminated {
		exit_code: i32,
		reason: Option<String>,
	},
	Unknown,
}

impl ContainerState {
	/// State of the container at `index` in the pod's status list.
	///
	/// Returns `None` when the pod has not reported that many containers.
	pub fn from_pod(pod: &Pod, index: usize) -> Option<Self> {
		let status = container_statuses(pod).get(index)?;
		Some(
			status
				.state
				.as_ref()
				.map(ContainerState::from)
				.unwrap_or(ContainerState::Unknown),
		)
	}

	pub fn is_running(&self) -> bool {
		matches!(self, ContainerState::Running { .. })
	}

	/// Short label used in logs and state-table lookups.
	pub fn label(&self) -> &str {
		match self {
			ContainerState::Waiting {
				reason: Some(reason),
				..
			} => reason,
			ContainerState::Waiting { reason: None, .. } => "Waiting",
			ContainerState::Running { .. } => "Running",
			ContainerState::Terminated { .. } => "Terminated",
			ContainerState::Unknown => "Unknown",
		}
	}
}

impl From<&api::ContainerState> for ContainerState {
	fn from(state: &api::ContainerState) -> Self {
		if let Some(running) = &state.running {
			return ContainerState::Running {
				started_at: running.started_at.as_ref().map(|t| t.0),
			};
		}
		if let Some(terminated) = &state.terminated {
			return ContainerState::Terminated {
				exit_code: terminated.exit_code,
				reason: terminated.reason.clone(),
			};
		}
		if let Some(waiting) = &state.waiting {
			return ContainerState::Waiting {
				reason: waiting.reason.clone(),
				message: waiting.message.clone(),
			};
		}
		ContainerState::Unknown
	}
}

/// Container statuses reported for a pod, empty if none yet.
pub(crate) fn container_statuses(pod: &Pod) -> &[ContainerStatus] {
	pod
		.status
		.as_ref()
		.and_then(|s| s.container_statuses.as_deref())
		.unwrap_or_default()
}
