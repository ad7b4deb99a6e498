// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use async_trait::async_trait;

use crate::error::K8sError;
use crate::types::{ExecOutput, Namespace, Node, Pod};

/// Trait for K8s client operations.
///
/// This abstraction allows for easy mocking in tests while providing
/// the handful of structured calls the harness needs. Transport and auth
/// failures surface as [`K8sError::ApiError`].
#[async_trait]
pub trait K8sClient: Send + Sync {
	/// List every node in the cluster.
	async fn list_nodes(&self) -> Result<Vec<Node>, K8sError>;

	/// List every namespace in the cluster.
	async fn list_namespaces(&self) -> Result<Vec<Namespace>, K8sError>;

	/// List all pods in a namespace.
	async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>, K8sError>;

	/// Get a specific pod by name from the specified namespace.
	async fn get_pod(&self, name: &str, namespace: &str) -> Result<Pod, K8sError>;

	/// Run a command in a container without a TTY and collect its output.
	///
	/// `container` may be `None` for single-container pods.
	async fn exec(
		&self,
		name: &str,
		namespace: &str,
		container: Option<&str>,
		command: Vec<String>,
		stdin: Option<Vec<u8>>,
	) -> Result<ExecOutput, K8sError>;

	/// Fetch the full log of a pod's default container.
	async fn logs(&self, name: &str, namespace: &str) -> Result<String, K8sError>;
}
