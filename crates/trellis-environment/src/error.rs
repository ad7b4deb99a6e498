// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use thiserror::Error;
use trellis_common_exec::ExecError;

#[derive(Debug, Error)]
pub enum EnvironmentError {
	#[error("Cluster is in unknown state {0:?}, refusing to guess a corrective action")]
	UnknownState(String),

	#[error("Cluster status probe failed: {0}")]
	Probe(#[source] ExecError),

	#[error("Cluster start failed: {0}")]
	Start(#[source] ExecError),

	#[error("Cluster teardown failed: {0}")]
	Teardown(#[source] ExecError),

	#[error("Listing running containers failed: {0}")]
	ListContainers(#[source] ExecError),

	#[error("Setup cancelled while waiting for {0}")]
	Cancelled(String),
}
