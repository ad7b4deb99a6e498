// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Component → status snapshot parsed from the cluster status command.
///
/// Produced fresh on every probe. A component missing from the output
/// reads as the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ClusterStatus(BTreeMap<String, String>);

impl ClusterStatus {
	/// Parse one component per line, `key: value` or `key value`.
	pub fn parse(output: &str) -> Self {
		let components = output
			.lines()
			.filter_map(|line| {
				let line = line.trim();
				if line.is_empty() {
					return None;
				}
				let (key, value) = match line.split_once(char::is_whitespace) {
					Some((key, value)) => (key, value.trim()),
					None => (line, ""),
				};
				let key = key.trim_end_matches(':');
				(!key.is_empty()).then(|| (key.to_string(), value.to_string()))
			})
			.collect();
		Self(components)
	}

	pub fn get(&self, component: &str) -> &str {
		self.0.get(component).map(String::as_str).unwrap_or_default()
	}

	pub fn contains(&self, component: &str) -> bool {
		self.0.contains_key(component)
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ClusterStatus {
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
	}
}

/// Cluster state as seen by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservedState {
	/// Status was empty: nothing provisioned.
	Absent,
	Stopped,
	Running,
	/// Any other reported string.
	Unknown(String),
}

impl ObservedState {
	pub fn from_status(status: &str) -> Self {
		match status {
			"" => ObservedState::Absent,
			"Stopped" => ObservedState::Stopped,
			"Running" => ObservedState::Running,
			other => ObservedState::Unknown(other.to_string()),
		}
	}
}

impl fmt::Display for ObservedState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ObservedState::Absent => f.write_str("absent"),
			ObservedState::Stopped => f.write_str("Stopped"),
			ObservedState::Running => f.write_str("Running"),
			ObservedState::Unknown(state) => write!(f, "unknown ({state})"),
		}
	}
}
