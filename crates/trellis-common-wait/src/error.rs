// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::time::Duration;

use thiserror::Error;

/// Ways a bounded wait can end without the condition being met.
///
/// `T` is the polled value and `E` the probe's error type.
#[derive(Error, Debug)]
pub enum WaitError<T, E> {
	#[error("Invalid retry policy for {resource}: {reason}")]
	InvalidPolicy {
		resource: String,
		reason: &'static str,
	},

	/// The bound was reached. `last` holds the most recent polled value.
	#[error("Timed out waiting for {resource} after {elapsed:?} ({attempts} attempts, allowed {allowed:?})")]
	Timeout {
		resource: String,
		elapsed: Duration,
		allowed: Option<Duration>,
		attempts: u32,
		last: Option<T>,
	},

	/// Every poll failed; `source` is the final probe error.
	#[error("Probe for {resource} failed on all {attempts} attempts: {source}")]
	Probe {
		resource: String,
		attempts: u32,
		#[source]
		source: E,
	},

	#[error("Wait for {resource} cancelled after {elapsed:?}")]
	Cancelled {
		resource: String,
		elapsed: Duration,
		last: Option<T>,
	},
}

impl<T, E> WaitError<T, E> {
	pub fn resource(&self) -> &str {
		match self {
			WaitError::InvalidPolicy { resource, .. }
			| WaitError::Timeout { resource, .. }
			| WaitError::Probe { resource, .. }
			| WaitError::Cancelled { resource, .. } => resource,
		}
	}

	/// Most recent value observed before the wait gave up.
	pub fn last(&self) -> Option<&T> {
		match self {
			WaitError::Timeout { last, .. } | WaitError::Cancelled { last, .. } => last.as_ref(),
			_ => None,
		}
	}

	pub fn into_last(self) -> Option<T> {
		match self {
			WaitError::Timeout { last, .. } | WaitError::Cancelled { last, .. } => last,
			_ => None,
		}
	}

	pub fn is_timeout(&self) -> bool {
		matches!(self, WaitError::Timeout { .. })
	}

	pub fn is_cancelled(&self) -> bool {
		matches!(self, WaitError::Cancelled { .. })
	}
}
