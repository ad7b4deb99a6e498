// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Cluster access for the trellis harness.
//!
//! This crate provides:
//! - A trait-based K8s client abstraction for testability
//! - Production implementation using the kube crate
//! - A scripted mock client
//! - Single-shot probes for nodes, pods and containers
//! - Workload helpers (exec, logs, bounded waits) with a kubectl fallback

mod client;
mod error;
mod kube_client;
mod mock;
mod phase;
mod probe;
mod types;
mod workload;

pub use client::K8sClient;
pub use error::{K8sError, K8sResult, WorkloadError};
pub use kube_client::KubeClient;
pub use mock::{fixtures, MockK8sClient};
pub use phase::{
	classify_pod_state, is_namespace_in_good_phase, is_pod_state_good, is_pod_state_wait,
	StateClass, NAMESPACE_GOOD_PHASES, POD_GOOD_STATES, POD_WAIT_STATES,
};
pub use probe::Prober;
pub use types::{ContainerState, ContainerStatus, ExecOutput, Namespace, Node, Pod, PodStatus};
pub use workload::{kubectl_exec_command, kubectl_logs_command, Workloads, DEFAULT_NAMESPACE};
