// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::client::K8sClient;
use crate::error::K8sError;
use crate::types::{ExecOutput, Namespace, Node, Pod};

#[derive(Default)]
struct Script {
	nodes: VecDeque<Result<Vec<Node>, K8sError>>,
	namespaces: VecDeque<Result<Vec<Namespace>, K8sError>>,
	pods: VecDeque<Result<Vec<Pod>, K8sError>>,
	pod: VecDeque<Result<Pod, K8sError>>,
	exec: VecDeque<Result<ExecOutput, K8sError>>,
	logs: VecDeque<Result<String, K8sError>>,
	calls: HashMap<&'static str, usize>,
}

/// Scripted [`K8sClient`] for tests.
///
/// Each call pops the next queued response for its operation. Once a queue
/// is drained, list calls return an empty list, `get_pod` returns
/// [`K8sError::PodNotFound`] and `exec`/`logs` fail.
#[derive(Clone, Default)]
pub struct MockK8sClient {
	script: Arc<Mutex<Script>>,
}

impl MockK8sClient {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push_nodes(&self, response: Result<Vec<Node>, K8sError>) -> &Self {
		self.lock().nodes.push_back(response);
		self
	}

	pub fn push_namespaces(&self, response: Result<Vec<Namespace>, K8sError>) -> &Self {
		self.lock().namespaces.push_back(response);
		self
	}

	pub fn push_pods(&self, response: Result<Vec<Pod>, K8sError>) -> &Self {
		self.lock().pods.push_back(response);
		self
	}

	pub fn push_pod(&self, response: Result<Pod, K8sError>) -> &Self {
		self.lock().pod.push_back(response);
		self
	}

	pub fn push_exec(&self, response: Result<ExecOutput, K8sError>) -> &Self {
		self.lock().exec.push_back(response);
		self
	}

	pub fn push_logs(&self, response: Result<String, K8sError>) -> &Self {
		self.lock().logs.push_back(response);
		self
	}

	/// Number of calls made to `operation` (the trait method name).
	pub fn calls(&self, operation: &str) -> usize {
		self.lock().calls.get(operation).copied().unwrap_or(0)
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
		self.script.lock().unwrap_or_else(PoisonError::into_inner)
	}

	fn record(&self, operation: &'static str) -> std::sync::MutexGuard<'_, Script> {
		let mut script = self.lock();
		*script.calls.entry(operation).or_default() += 1;
		script
	}
}

#[async_trait]
impl K8sClient for MockK8sClient {
	async fn list_nodes(&self) -> Result<Vec<Node>, K8sError> {
		self.record("list_nodes").nodes.pop_front().unwrap_or(Ok(Vec::new()))
	}

	async fn list_namespaces(&self) -> Result<Vec<Namespace>, K8sError> {
		self
			.record("list_namespaces")
			.namespaces
			.pop_front()
			.unwrap_or(Ok(Vec::new()))
	}

	async fn list_pods(&self, _namespace: &str) -> Result<Vec<Pod>, K8sError> {
		self.record("list_pods").pods.pop_front().unwrap_or(Ok(Vec::new()))
	}

	async fn get_pod(&self, name: &str, _namespace: &str) -> Result<Pod, K8sError> {
		self.record("get_pod").pod.pop_front().unwrap_or_else(|| {
			Err(K8sError::PodNotFound {
				name: name.to_string(),
			})
		})
	}

	async fn exec(
		&self,
		_name: &str,
		_namespace: &str,
		_container: Option<&str>,
		_command: Vec<String>,
		_stdin: Option<Vec<u8>>,
	) -> Result<ExecOutput, K8sError> {
		self.record("exec").exec.pop_front().unwrap_or_else(|| {
			Err(K8sError::ExecError {
				message: "no scripted exec response".to_string(),
			})
		})
	}

	async fn logs(&self, _name: &str, _namespace: &str) -> Result<String, K8sError> {
		self.record("logs").logs.pop_front().unwrap_or_else(|| {
			Err(K8sError::StreamError {
				message: "no scripted log response".to_string(),
			})
		})
	}
}

/// Builders for API objects used in tests.
pub mod fixtures {
	use k8s_openapi::api::core::v1::{
		ContainerState, ContainerStateRunning, ContainerStateTerminated, ContainerStateWaiting,
		ContainerStatus, Namespace, NamespaceStatus, Node, Pod, PodStatus,
	};
	use kube::api::ObjectMeta;

	fn meta(name: &str, namespace: Option<&str>) -> ObjectMeta {
		ObjectMeta {
			name: Some(name.to_string()),
			namespace: namespace.map(str::to_string),
			..Default::default()
		}
	}

	pub fn node(name: &str) -> Node {
		Node {
			metadata: meta(name, None),
			..Default::default()
		}
	}

	pub fn namespace(name: &str, phase: &str) -> Namespace {
		Namespace {
			metadata: meta(name, None),
			status: Some(NamespaceStatus {
				phase: Some(phase.to_string()),
				..Default::default()
			}),
			..Default::default()
		}
	}

	/// A pod with no status yet.
	pub fn pod(name: &str, namespace: &str) -> Pod {
		Pod {
			metadata: meta(name, Some(namespace)),
			..Default::default()
		}
	}

	pub fn pod_in_phase(name: &str, namespace: &str, phase: &str) -> Pod {
		let mut pod = pod(name, namespace);
		pod.status = Some(PodStatus {
			phase: Some(phase.to_string()),
			..Default::default()
		});
		pod
	}

	/// A pod reporting one container status per entry of `states`.
	pub fn pod_with_states(name: &str, namespace: &str, states: Vec<ContainerState>) -> Pod {
		let statuses = states
			.into_iter()
			.enumerate()
			.map(|(i, state)| ContainerStatus {
				name: format!("c{i}"),
				state: Some(state),
				..Default::default()
			})
			.collect();
		let mut pod = pod(name, namespace);
		pod.status = Some(PodStatus {
			container_statuses: Some(statuses),
			..Default::default()
		});
		pod
	}

	pub fn running() -> ContainerState {
		ContainerState {
			running: Some(ContainerStateRunning::default()),
			..Default::default()
		}
	}

	pub fn waiting(reason: &str) -> ContainerState {
		ContainerState {
			waiting: Some(ContainerStateWaiting {
				reason: Some(reason.to_string()),
				message: None,
			}),
			..Default::default()
		}
	}

	pub fn terminated(exit_code: i32) -> ContainerState {
		ContainerState {
			terminated: Some(ContainerStateTerminated {
				exit_code,
				..Default::default()
			}),
			..Default::default()
		}
	}
}
