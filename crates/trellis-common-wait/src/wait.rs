// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::fmt::Display;
use std::future::Future;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::WaitError;
use crate::policy::RetryPolicy;

/// Poll until `accept` holds for the polled value or the policy's bound is hit.
///
/// The first poll happens immediately; later polls are `policy.interval`
/// apart. A probe error is logged and the loop continues. If every poll
/// failed, the final error is returned as [`WaitError::Probe`]; otherwise
/// exhaustion yields [`WaitError::Timeout`] carrying the last polled value.
/// Cancelling `cancel` interrupts both an in-flight poll and the sleep
/// between polls. A poll still running when `policy.timeout` expires is
/// abandoned and the wait times out.
pub async fn wait_until<T, E, F, Fut, A>(
	resource: &str,
	policy: &RetryPolicy,
	cancel: &CancellationToken,
	mut poll: F,
	accept: A,
) -> Result<T, WaitError<T, E>>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T, E>>,
	A: Fn(&T) -> bool,
	E: Display,
{
	policy
		.validate()
		.map_err(|reason| WaitError::InvalidPolicy {
			resource: resource.to_string(),
			reason,
		})?;

	let start = Instant::now();
	let deadline = policy.timeout.map(|timeout| start + timeout);
	let mut attempts: u32 = 0;
	let mut last: Option<T> = None;
	let mut last_error: Option<E> = None;

	loop {
		if cancel.is_cancelled() {
			return Err(WaitError::Cancelled {
				resource: resource.to_string(),
				elapsed: start.elapsed(),
				last,
			});
		}

		attempts += 1;
		let outcome = tokio::select! {
			biased;
			_ = cancel.cancelled() => {
				debug!(resource, attempts, "wait cancelled during poll");
				return Err(WaitError::Cancelled {
					resource: resource.to_string(),
					elapsed: start.elapsed(),
					last,
				});
			}
			result = poll() => result,
			_ = deadline_reached(deadline) => {
				warn!(resource, attempt = attempts, "poll still running at deadline");
				break;
			}
		};

		match outcome {
			Ok(value) if accept(&value) => {
				debug!(
					resource,
					attempts,
					elapsed_ms = start.elapsed().as_millis() as u64,
					"condition met"
				);
				return Ok(value);
			}
			Ok(value) => {
				trace!(resource, attempts, "condition not met yet");
				last = Some(value);
			}
			Err(err) => {
				warn!(resource, attempt = attempts, error = %err, "probe failed, will retry");
				last_error = Some(err);
			}
		}

		if policy.max_attempts.is_some_and(|max| attempts >= max) {
			break;
		}
		if policy
			.timeout
			.is_some_and(|timeout| start.elapsed() + policy.interval >= timeout)
		{
			break;
		}

		tokio::select! {
			_ = cancel.cancelled() => {
				debug!(resource, attempts, "wait cancelled");
				return Err(WaitError::Cancelled {
					resource: resource.to_string(),
					elapsed: start.elapsed(),
					last,
				});
			}
			_ = tokio::time::sleep(policy.interval) => {}
		}
	}

	let elapsed = start.elapsed();
	match (last, last_error) {
		(None, Some(source)) => {
			warn!(resource, attempts, "probe failed on every attempt");
			Err(WaitError::Probe {
				resource: resource.to_string(),
				attempts,
				source,
			})
		}
		(last, _) => {
			debug!(resource, attempts, elapsed_ms = elapsed.as_millis() as u64, "wait timed out");
			Err(WaitError::Timeout {
				resource: resource.to_string(),
				elapsed,
				allowed: policy.timeout,
				attempts,
				last,
			})
		}
	}
}

/// Resolves at `deadline`, or never when there is none.
async fn deadline_reached(deadline: Option<Instant>) {
	match deadline {
		Some(deadline) => tokio::time::sleep_until(deadline).await,
		None => std::future::pending().await,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use std::sync::atomic::{AtomicU32, Ordering};
	use std::sync::Arc;
	use std::time::Duration;

	#[derive(Debug)]
	struct ProbeError(&'static str);

	impl std::fmt::Display for ProbeError {
		fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
			f.write_str(self.0)
		}
	}

	impl std::error::Error for ProbeError {}

	fn counting_poll(
		count: &Arc<AtomicU32>,
	) -> impl FnMut() -> std::future::Ready<Result<u32, ProbeError>> {
		let count = Arc::clone(count);
		move || std::future::ready(Ok(count.fetch_add(1, Ordering::SeqCst) + 1))
	}

	#[tokio::test(start_paused = true)]
	async fn returns_first_accepted_value_without_extra_polls() {
		let count = Arc::new(AtomicU32::new(0));
		let policy = RetryPolicy::with_timeout(Duration::from_secs(60), Duration::from_secs(1));

		let result = wait_until(
			"counter",
			&policy,
			&CancellationToken::new(),
			counting_poll(&count),
			|n| *n == 4,
		)
		.await
		.unwrap();

		assert_eq!(result, 4);
		assert_eq!(count.load(Ordering::SeqCst), 4);
	}

	#[tokio::test(start_paused = true)]
	async fn timeout_reports_resource_and_last_value() {
		let count = Arc::new(AtomicU32::new(0));
		let policy = RetryPolicy::with_timeout(Duration::from_secs(5), Duration::from_secs(1));

		let err = wait_until(
			"pod nginx",
			&policy,
			&CancellationToken::new(),
			counting_poll(&count),
			|_| false,
		)
		.await
		.unwrap_err();

		assert!(err.is_timeout());
		assert_eq!(err.resource(), "pod nginx");
		assert_eq!(err.last(), Some(&5));
		assert!(err.to_string().contains("pod nginx"));
		assert_eq!(count.load(Ordering::SeqCst), 5);
	}

	#[tokio::test(start_paused = true)]
	async fn attempt_bound_stops_polling() {
		let count = Arc::new(AtomicU32::new(0));
		let policy = RetryPolicy::with_attempts(3, Duration::from_secs(2));
		let start = Instant::now();

		let err = wait_until(
			"nodes",
			&policy,
			&CancellationToken::new(),
			counting_poll(&count),
			|_| false,
		)
		.await
		.unwrap_err();

		assert!(err.is_timeout());
		assert_eq!(count.load(Ordering::SeqCst), 3);
		assert_eq!(start.elapsed(), Duration::from_secs(4));
	}

	#[tokio::test(start_paused = true)]
	async fn persistent_probe_error_is_surfaced() {
		let policy = RetryPolicy::with_attempts(4, Duration::from_secs(1));

		let err = wait_until(
			"cluster",
			&policy,
			&CancellationToken::new(),
			|| std::future::ready(Err::<u32, _>(ProbeError("connection refused"))),
			|_| true,
		)
		.await
		.unwrap_err();

		match err {
			WaitError::Probe {
				attempts, source, ..
			} => {
				assert_eq!(attempts, 4);
				assert_eq!(source.0, "connection refused");
			}
			other => panic!("expected probe error, got {other:?}"),
		}
	}

	#[tokio::test(start_paused = true)]
	async fn transient_probe_error_is_retried() {
		let count = Arc::new(AtomicU32::new(0));
		let poll_count = Arc::clone(&count);
		let policy = RetryPolicy::with_attempts(5, Duration::from_secs(1));

		let result = wait_until(
			"pods",
			&policy,
			&CancellationToken::new(),
			move || {
				let n = poll_count.fetch_add(1, Ordering::SeqCst);
				std::future::ready(if n < 2 {
					Err(ProbeError("api hiccup"))
				} else {
					Ok(n)
				})
			},
			|_| true,
		)
		.await
		.unwrap();

		assert_eq!(result, 2);
		assert_eq!(count.load(Ordering::SeqCst), 3);
	}

	#[tokio::test(start_paused = true)]
	async fn mixed_errors_and_values_time_out_with_last_value() {
		let count = Arc::new(AtomicU32::new(0));
		let poll_count = Arc::clone(&count);
		let policy = RetryPolicy::with_attempts(3, Duration::from_secs(1));

		let err = wait_until(
			"pods",
			&policy,
			&CancellationToken::new(),
			move || {
				let n = poll_count.fetch_add(1, Ordering::SeqCst);
				std::future::ready(if n == 0 { Ok(n) } else { Err(ProbeError("flaky")) })
			},
			|_| false,
		)
		.await
		.unwrap_err();

		assert!(err.is_timeout());
		assert_eq!(err.into_last(), Some(0));
	}

	#[tokio::test(start_paused = true)]
	async fn cancellation_interrupts_sleep() {
		let cancel = CancellationToken::new();
		let trigger = cancel.clone();
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_millis(1500)).await;
			trigger.cancel();
		});

		let start = Instant::now();
		let policy = RetryPolicy::with_timeout(Duration::from_secs(600), Duration::from_secs(10));
		let err = wait_until(
			"minikube dirs",
			&policy,
			&cancel,
			|| std::future::ready(Ok::<_, ProbeError>(false)),
			|ready| *ready,
		)
		.await
		.unwrap_err();

		assert!(err.is_cancelled());
		assert_eq!(err.last(), Some(&false));
		assert!(start.elapsed() < Duration::from_secs(2));
	}

	#[tokio::test(start_paused = true)]
	async fn cancellation_interrupts_running_poll() {
		let cancel = CancellationToken::new();
		let trigger = cancel.clone();
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_secs(1)).await;
			trigger.cancel();
		});

		let start = Instant::now();
		let policy = RetryPolicy::with_timeout(Duration::from_secs(10), Duration::from_secs(1));
		let err = wait_until(
			"hung api call",
			&policy,
			&cancel,
			|| async {
				tokio::time::sleep(Duration::from_secs(300)).await;
				Ok::<u32, ProbeError>(1)
			},
			|_| true,
		)
		.await
		.unwrap_err();

		assert!(err.is_cancelled());
		assert_eq!(start.elapsed(), Duration::from_secs(1));
	}

	#[tokio::test(start_paused = true)]
	async fn running_poll_is_bounded_by_timeout() {
		let start = Instant::now();
		let policy = RetryPolicy::with_timeout(Duration::from_secs(10), Duration::from_secs(1));
		let err = wait_until(
			"hung api call",
			&policy,
			&CancellationToken::new(),
			|| async {
				tokio::time::sleep(Duration::from_secs(300)).await;
				Ok::<u32, ProbeError>(1)
			},
			|_| true,
		)
		.await
		.unwrap_err();

		match err {
			WaitError::Timeout { attempts, last, .. } => {
				assert_eq!(attempts, 1);
				assert!(last.is_none());
			}
			other => panic!("expected timeout, got {other:?}"),
		}
		assert_eq!(start.elapsed(), Duration::from_secs(10));
	}

	#[tokio::test(start_paused = true)]
	async fn slow_poll_after_values_keeps_last_value() {
		let count = Arc::new(AtomicU32::new(0));
		let poll_count = Arc::clone(&count);
		let policy = RetryPolicy::with_timeout(Duration::from_secs(10), Duration::from_secs(1));

		let err = wait_until(
			"pods",
			&policy,
			&CancellationToken::new(),
			move || {
				let n = poll_count.fetch_add(1, Ordering::SeqCst);
				async move {
					if n > 0 {
						tokio::time::sleep(Duration::from_secs(300)).await;
					}
					Ok::<u32, ProbeError>(n)
				}
			},
			|_| false,
		)
		.await
		.unwrap_err();

		assert!(err.is_timeout());
		assert_eq!(err.into_last(), Some(0));
	}

	#[tokio::test]
	async fn cancelled_token_skips_polling() {
		let cancel = CancellationToken::new();
		cancel.cancel();
		let count = Arc::new(AtomicU32::new(0));
		let policy = RetryPolicy::with_attempts(3, Duration::from_secs(1));

		let err = wait_until("x", &policy, &cancel, counting_poll(&count), |_| true)
			.await
			.unwrap_err();

		assert!(err.is_cancelled());
		assert_eq!(count.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn invalid_policy_is_rejected_before_polling() {
		let count = Arc::new(AtomicU32::new(0));
		let policy = RetryPolicy::with_attempts(3, Duration::ZERO);

		let err = wait_until(
			"x",
			&policy,
			&CancellationToken::new(),
			counting_poll(&count),
			|_| true,
		)
		.await
		.unwrap_err();

		assert!(matches!(err, WaitError::InvalidPolicy { .. }));
		assert_eq!(count.load(Ordering::SeqCst), 0);
	}

	proptest! {
		/// A wait that never accepts, bounded by `timeout = n * interval`,
		/// polls exactly `n` times in virtual time.
		#[test]
		fn never_accepting_wait_polls_n_times(n in 1u32..30, interval_ms in 1u64..5_000) {
			let polls = tokio_test::block_on(async {
				tokio::time::pause();
				let count = Arc::new(AtomicU32::new(0));
				let interval = Duration::from_millis(interval_ms);
				let policy = RetryPolicy::with_timeout(interval * n, interval);

				let result = wait_until(
					"property",
					&policy,
					&CancellationToken::new(),
					counting_poll(&count),
					|_| false,
				)
				.await;

				assert!(matches!(result, Err(WaitError::Timeout { .. })));
				count.load(Ordering::SeqCst)
			});
			prop_assert_eq!(polls, n);
		}

		/// A wait that accepts on attempt `k` returns that value and stops.
		#[test]
		fn accepting_wait_stops_at_k(k in 1u32..20) {
			let (value, polls) = tokio_test::block_on(async {
				tokio::time::pause();
				let count = Arc::new(AtomicU32::new(0));
				let policy = RetryPolicy::with_attempts(50, Duration::from_secs(1));

				let value = wait_until(
					"property",
					&policy,
					&CancellationToken::new(),
					counting_poll(&count),
					|n| *n == k,
				)
				.await
				.unwrap();
				(value, count.load(Ordering::SeqCst))
			});
			prop_assert_eq!(value, k);
			prop_assert_eq!(polls, k);
		}
	}
}
