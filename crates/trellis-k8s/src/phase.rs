// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! State tables used by tests to judge pods and namespaces.

/// Namespace phases that count as healthy.
pub const NAMESPACE_GOOD_PHASES: &[&str] = &["Active"];

/// Pod states worth waiting on.
pub const POD_WAIT_STATES: &[&str] = &["ContainerCreating", "Pending"];

/// Pod states that count as healthy.
pub const POD_GOOD_STATES: &[&str] = &["Running"];

/// How a pod state string should be treated by a wait loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateClass {
	Good,
	Waiting,
	Bad,
}

pub fn is_namespace_in_good_phase(phase: &str) -> bool {
	NAMESPACE_GOOD_PHASES.contains(&phase)
}

pub fn is_pod_state_wait(state: &str) -> bool {
	POD_WAIT_STATES.contains(&state)
}

pub fn is_pod_state_good(state: &str) -> bool {
	POD_GOOD_STATES.contains(&state)
}

/// Anything not in either table is bad.
pub fn classify_pod_state(state: &str) -> StateClass {
	if is_pod_state_good(state) {
		StateClass::Good
	} else if is_pod_state_wait(state) {
		StateClass::Waiting
	} else {
		StateClass::Bad
	}
}
