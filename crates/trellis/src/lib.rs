// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Integration-test harness for single-node Kubernetes clusters.
//!
//! [`Harness`] wires configuration, the cluster environment, the container
//! runtime, the workload helpers and a test logger together. Components are
//! opt-in through [`HarnessOptions`] so a suite can start before the cluster
//! exists and [`Harness::reload`] the rest afterwards.

mod error;
mod harness;
mod logger;
mod telemetry;

pub use error::HarnessError;
pub use harness::{Harness, HarnessOptions};
pub use logger::{CapturingLogger, LogLine, LogSeverity, Logger, TestLogger, TracingLogger};
pub use telemetry::{default_filter, init_tracing};

pub use trellis_common_config::{ConfigKey, HarnessConfig, Platform};
pub use trellis_common_exec::{CommandRunner, ScriptedRunner, ShellRunner};
pub use trellis_common_wait::{CancellationToken, RetryPolicy, WaitError};
pub use trellis_environment::{
	ClusterStatus, DockerRuntime, Environment, ObservedState, SetupReport,
};
pub use trellis_k8s::{ContainerState, K8sClient, MockK8sClient, Workloads};
