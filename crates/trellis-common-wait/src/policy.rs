// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::time::Duration;

/// Bounds for a polling loop.
///
/// `interval` must be non-zero and at least one of `timeout` or
/// `max_attempts` must be set; [`RetryPolicy::validate`] enforces both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
	pub timeout: Option<Duration>,
	pub interval: Duration,
	pub max_attempts: Option<u32>,
}

impl RetryPolicy {
	/// Poll every `interval` until `timeout` has elapsed.
	pub fn with_timeout(timeout: Duration, interval: Duration) -> Self {
		Self {
			timeout: Some(timeout),
			interval,
			max_attempts: None,
		}
	}

	/// Poll at most `max_attempts` times, `interval` apart.
	pub fn with_attempts(max_attempts: u32, interval: Duration) -> Self {
		Self {
			timeout: None,
			interval,
			max_attempts: Some(max_attempts),
		}
	}

	/// Add an attempt cap on top of an existing bound.
	pub fn max_attempts(mut self, max_attempts: u32) -> Self {
		self.max_attempts = Some(max_attempts);
		self
	}

	pub fn validate(&self) -> Result<(), &'static str> {
		if self.interval.is_zero() {
			return Err("interval must be greater than zero");
		}
		match (self.timeout, self.max_attempts) {
			(None, None) => Err("either timeout or max_attempts must bound the loop"),
			(_, Some(0)) => Err("max_attempts must be at least 1"),
			_ => Ok(()),
		}
	}
}
