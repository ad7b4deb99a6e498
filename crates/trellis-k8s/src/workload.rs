// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};
use trellis_common_exec::CommandRunner;
use trellis_common_wait::{wait_until, CancellationToken, RetryPolicy, WaitError};

use crate::client::K8sClient;
use crate::error::{K8sError, WorkloadError};
use crate::probe::Prober;
use crate::types::{container_statuses, ContainerState, ExecOutput, Namespace, Node, Pod};

/// Namespace used when a pod or caller names none.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Bounded wait for pods to appear by prefix.
const POD_LOOKUP_ATTEMPTS: u32 = 10;
const POD_LOOKUP_INTERVAL: Duration = Duration::from_secs(2);

/// Bounded wait for the first node to register.
const NODE_LOOKUP_ATTEMPTS: u32 = 10;

const KUBECTL: &str = "kubectl";

/// `kubectl [-n ns] exec pod [-c container] -- command`
pub fn kubectl_exec_command(
	command: &str,
	container: Option<&str>,
	pod: &str,
	namespace: &str,
) -> String {
	let mut line = String::from(KUBECTL);
	if !namespace.is_empty() {
		line.push_str(" -n ");
		line.push_str(namespace);
	}
	line.push_str(" exec ");
	line.push_str(pod);
	if let Some(container) = container.filter(|c| !c.is_empty()) {
		line.push_str(" -c ");
		line.push_str(container);
	}
	line.push_str(" -- ");
	line.push_str(command);
	line
}

pub fn kubectl_logs_command(pod: &str, namespace: &str) -> String {
	format!("{KUBECTL} -n {namespace} logs {pod}")
}

fn namespace_or_default(namespace: &str) -> &str {
	if namespace.is_empty() {
		DEFAULT_NAMESPACE
	} else {
		namespace
	}
}

/// Higher-level workload operations built on [`Prober`], the readiness
/// waiter and the command runner.
///
/// Exec and log retrieval try the structured API first and fall back to
/// `kubectl`; the fallback's outcome is the one returned.
pub struct Workloads {
	client: Arc<dyn K8sClient>,
	prober: Prober,
	runner: Arc<dyn CommandRunner>,
	cancel: CancellationToken,
	wait_unit: Duration,
}

impl Workloads {
	pub fn new(
		client: Arc<dyn K8sClient>,
		runner: Arc<dyn CommandRunner>,
		cancel: CancellationToken,
	) -> Self {
		Self {
			prober: Prober::new(Arc::clone(&client)),
			client,
			runner,
			cancel,
			wait_unit: Duration::from_secs(1),
		}
	}

	/// Interval used between polls of container and node waits.
	pub fn with_wait_unit(mut self, wait_unit: Duration) -> Self {
		self.wait_unit = wait_unit;
		self
	}

	pub fn prober(&self) -> &Prober {
		&self.prober
	}

	/// Run `command` in a pod, API first and `kubectl exec` on failure.
	#[instrument(skip(self))]
	pub async fn exec_in_pod(
		&self,
		command: &str,
		container: Option<&str>,
		pod: &str,
		namespace: &str,
	) -> Result<String, WorkloadError> {
		match self
			.exec_in_pod_api(command, container, pod, namespace, None)
			.await
		{
			Ok(output) => Ok(output.stdout),
			Err(e) => {
				warn!(error = %e, "exec through API failed, falling back to kubectl");
				self.exec_in_pod_cli(command, container, pod, namespace).await
			}
		}
	}

	/// Exec through the cluster API. The command is split on whitespace.
	pub async fn exec_in_pod_api(
		&self,
		command: &str,
		container: Option<&str>,
		pod: &str,
		namespace: &str,
		stdin: Option<Vec<u8>>,
	) -> Result<ExecOutput, K8sError> {
		let argv = command.split_whitespace().map(str::to_string).collect();
		self
			.client
			.exec(
				pod,
				namespace_or_default(namespace),
				container.filter(|c| !c.is_empty()),
				argv,
				stdin,
			)
			.await
	}

	pub async fn exec_in_pod_cli(
		&self,
		command: &str,
		container: Option<&str>,
		pod: &str,
		namespace: &str,
	) -> Result<String, WorkloadError> {
		let line = kubectl_exec_command(command, container, pod, namespace);
		Ok(self.runner.run(&line, false).await?)
	}

	/// Full log of a pod, API first and `kubectl logs` on failure.
	#[instrument(skip(self))]
	pub async fn fetch_log(&self, pod: &str, namespace: &str) -> Result<String, WorkloadError> {
		match self.fetch_log_api(pod, namespace).await {
			Ok(log) => Ok(log),
			Err(e) => {
				warn!(error = %e, "log fetch through API failed, falling back to kubectl");
				self.fetch_log_cli(pod, namespace).await
			}
		}
	}

	pub async fn fetch_log_api(&self, pod: &str, namespace: &str) -> Result<String, K8sError> {
		self.client.logs(pod, namespace_or_default(namespace)).await
	}

	pub async fn fetch_log_cli(&self, pod: &str, namespace: &str) -> Result<String, WorkloadError> {
		let line = kubectl_logs_command(pod, namespace_or_default(namespace));
		Ok(self.runner.run(&line, false).await?)
	}

	/// Wait for at least one pod whose name starts with `prefix`.
	///
	/// Every match is returned in list order; pods from unrelated workloads
	/// sharing the prefix are not told apart.
	pub async fn wait_for_pods_by_prefix(
		&self,
		namespace: &str,
		prefix: &str,
	) -> Result<Vec<Pod>, WorkloadError> {
		let policy = RetryPolicy::with_attempts(POD_LOOKUP_ATTEMPTS, POD_LOOKUP_INTERVAL);
		let resource = format!("pods with prefix {prefix:?} in {namespace}");
		let prober = &self.prober;

		wait_until(
			&resource,
			&policy,
			&self.cancel,
			move || prober.pods_with_prefix(namespace, prefix),
			|pods| !pods.is_empty(),
		)
		.await
		.map_err(|e| {
			from_wait(e, || WorkloadError::NoMatchingPods {
				prefix: prefix.to_string(),
				namespace: namespace.to_string(),
			})
		})
	}

	/// Wait until `pod` reports a container at `index` and return its state.
	///
	/// Two phases share `timeout`: first any container status must appear,
	/// then at least `index + 1` of them.
	pub async fn wait_for_container_state(
		&self,
		pod: &Pod,
		index: usize,
		timeout: Duration,
	) -> Result<ContainerState, WorkloadError> {
		let name = pod.metadata.name.clone().unwrap_or_default();
		let namespace = pod
			.metadata
			.namespace
			.clone()
			.unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
		let start = Instant::now();
		let resource = format!("containers of pod {namespace}/{name}");

		let prober = &self.prober;
		let (name_ref, namespace_ref) = (name.as_str(), namespace.as_str());
		let refetch = move || prober.pod(namespace_ref, name_ref);
		let container_count =
			|p: &Option<Pod>| p.as_ref().map_or(0, |p| container_statuses(p).len());

		let policy = RetryPolicy::with_timeout(timeout, self.wait_unit);
		wait_until(&resource, &policy, &self.cancel, refetch, |p| {
			container_count(p) > 0
		})
		.await
		.map_err(|e| {
			from_wait(e, || WorkloadError::NoContainer {
				pod: name.clone(),
				namespace: namespace.clone(),
				timeout,
			})
		})?;

		let remaining = timeout.saturating_sub(start.elapsed());
		let policy = RetryPolicy::with_timeout(remaining.max(self.wait_unit), self.wait_unit);
		let fresh = wait_until(&resource, &policy, &self.cancel, refetch, |p| {
			container_count(p) > index
		})
		.await
		.map_err(|e| {
			from_wait(e, || WorkloadError::MissingContainer {
				pod: name.clone(),
				namespace: namespace.clone(),
				expected: index + 1,
				timeout,
			})
		})?;

		Ok(fresh
			.and_then(|pod| ContainerState::from_pod(&pod, index))
			.unwrap_or(ContainerState::Unknown))
	}

	/// Fresh snapshot of `pod`.
	pub async fn reload_pod(&self, pod: &Pod) -> Result<Pod, WorkloadError> {
		let name = pod.metadata.name.as_deref().unwrap_or_default();
		let namespace = pod
			.metadata
			.namespace
			.as_deref()
			.unwrap_or(DEFAULT_NAMESPACE);
		Ok(self.client.get_pod(name, namespace).await?)
	}

	/// Phase of `pod` as last observed, empty if not reported.
	pub fn pod_phase(pod: &Pod) -> &str {
		pod
			.status
			.as_ref()
			.and_then(|s| s.phase.as_deref())
			.unwrap_or_default()
	}

	/// Registered nodes, waiting briefly for the first one to appear.
	pub async fn nodes(&self) -> Result<Vec<Node>, WorkloadError> {
		let policy = RetryPolicy::with_attempts(NODE_LOOKUP_ATTEMPTS, self.wait_unit);
		let prober = &self.prober;
		wait_until(
			"cluster nodes",
			&policy,
			&self.cancel,
			move || prober.nodes(),
			|nodes| !nodes.is_empty(),
		)
		.await
		.map_err(|e| {
			from_wait(e, || WorkloadError::NoNodes {
				attempts: NODE_LOOKUP_ATTEMPTS,
			})
		})
	}

	pub async fn node_names(&self) -> Result<Vec<String>, WorkloadError> {
		Ok(self
			.nodes()
			.await?
			.into_iter()
			.filter_map(|n| n.metadata.name)
			.collect())
	}

	/// Namespaces keyed by name.
	pub async fn namespaces(&self) -> Result<BTreeMap<String, Namespace>, WorkloadError> {
		let namespaces = self.prober.namespaces().await?;
		Ok(namespaces
			.into_iter()
			.filter_map(|ns| ns.metadata.name.clone().map(|name| (name, ns)))
			.collect())
	}

	/// `kubectl apply -f <path>`.
	pub async fn apply_manifest(&self, path: &Path) -> Result<(), WorkloadError> {
		let line = format!("{KUBECTL} apply -f {}", path.display());
		match self.runner.run(&line, false).await {
			Ok(output) => {
				info!(path = %path.display(), "applied manifest");
				debug!(output = %output.trim_end(), "kubectl apply output");
				Ok(())
			}
			Err(source) => {
				warn!(path = %path.display(), error = %source, "failed to apply manifest");
				Err(WorkloadError::ApplyFailed {
					path: path.to_path_buf(),
					source,
				})
			}
		}
	}
}

fn from_wait<T>(
	err: WaitError<T, K8sError>,
	on_timeout: impl FnOnce() -> WorkloadError,
) -> WorkloadError {
	match err {
		WaitError::Timeout { .. } => on_timeout(),
		WaitError::Probe { source, .. } => WorkloadError::K8s(source),
		WaitError::Cancelled { resource, .. } => WorkloadError::Cancelled { resource },
		WaitError::InvalidPolicy { resource, reason } => {
			WorkloadError::InvalidWait { resource, reason }
		}
	}
}
