// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Cluster lifecycle for the trellis harness.
//!
//! [`Minikube`] probes the cluster, plans a corrective [`Action`] from the
//! observed state and runs it. [`DockerRuntime`] cleans up the container
//! runtime between runs.

mod docker;
mod environment;
mod error;
mod minikube;
mod reconcile;
mod status;

pub use docker::DockerRuntime;
pub use environment::{environment_for, Environment, FailedStep, SetupReport};
pub use error::EnvironmentError;
pub use minikube::Minikube;
pub use reconcile::{plan, Action};
pub use status::{ClusterStatus, ObservedState};
