// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use tracing::debug;

use crate::client::K8sClient;
use crate::error::{K8sError, K8sResult};
use crate::types::{ContainerState, Namespace, Node, Pod};

/// Single-shot queries against the cluster API.
///
/// None of these retry; the waiters in [`crate::Workloads`] wrap them.
#[derive(Clone)]
pub struct Prober {
	client: Arc<dyn K8sClient>,
}

impl Prober {
	pub fn new(client: Arc<dyn K8sClient>) -> Self {
		Self { client }
	}

	/// All registered nodes. An empty list is not an error.
	pub async fn nodes(&self) -> K8sResult<Vec<Node>> {
		self.client.list_nodes().await
	}

	pub async fn namespaces(&self) -> K8sResult<Vec<Namespace>> {
		self.client.list_namespaces().await
	}

	/// Pods in `namespace` whose name starts with `prefix`, in list order.
	pub async fn pods_with_prefix(&self, namespace: &str, prefix: &str) -> K8sResult<Vec<Pod>> {
		let pods = self.client.list_pods(namespace).await?;
		debug!(
			namespace,
			pods = ?pods.iter().filter_map(|p| p.metadata.name.as_deref()).collect::<Vec<_>>(),
			"listed pods"
		);
		Ok(pods
			.into_iter()
			.filter(|p| {
				p.metadata
					.name
					.as_deref()
					.is_some_and(|name| name.starts_with(prefix))
			})
			.collect())
	}

	/// Current snapshot of a pod, `None` if it does not exist.
	pub async fn pod(&self, namespace: &str, name: &str) -> K8sResult<Option<Pod>> {
		match self.client.get_pod(name, namespace).await {
			Ok(pod) => Ok(Some(pod)),
			Err(K8sError::PodNotFound { .. }) => Ok(None),
			Err(e) => Err(e),
		}
	}

	/// State of the container at `index`, `None` if the pod is missing or
	/// has fewer containers.
	pub async fn container_state(
		&self,
		namespace: &str,
		name: &str,
		index: usize,
	) -> K8sResult<Option<ContainerState>> {
		Ok(self
			.pod(namespace, name)
			.await?
			.and_then(|pod| ContainerState::from_pod(&pod, index)))
	}
}
