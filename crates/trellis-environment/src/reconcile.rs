// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use crate::error::EnvironmentError;
use crate::status::ObservedState;

/// Corrective action for an observed cluster state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
	Start,
	TeardownThenStart,
	None,
}

impl Action {
	pub fn needs_teardown(self) -> bool {
		matches!(self, Action::TeardownThenStart)
	}

	pub fn needs_start(self) -> bool {
		matches!(self, Action::Start | Action::TeardownThenStart)
	}
}

/// Map an observed state to the action that brings the cluster to running.
///
/// An unknown state has no safe corrective action and is an error.
pub fn plan(observed: &ObservedState) -> Result<Action, EnvironmentError> {
	match observed {
		ObservedState::Absent => Ok(Action::Start),
		ObservedState::Stopped => Ok(Action::TeardownThenStart),
		ObservedState::Running => Ok(Action::None),
		ObservedState::Unknown(state) => Err(EnvironmentError::UnknownState(state.clone())),
	}
}
