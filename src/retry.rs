//! Request-level retry for credit-consuming operations.
//!
//! A failure is retried only when it looks like a transport problem. Business rejections
//! (insufficient credits, invalid codes) return after the first attempt with the server text
//! intact. Once attempts run out the caller receives a generic
//! [`FailureCode::TemporarilyUnavailable`] envelope and never the underlying transport detail.

// std
use std::time::Duration as StdDuration;
// self
use crate::{
	_prelude::*,
	envelope::{Envelope, FailureCode},
	error::ConfigError,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Case-insensitive substrings that mark an error text as a transport failure.
pub const NETWORK_ERROR_MARKERS: &[&str] = &[
	"failed to fetch",
	"fetch failed",
	"network error",
	"networkerror",
	"connection refused",
	"econnrefused",
	"connection reset",
	"timeout",
	"timed out",
	"etimedout",
	"dns",
	"enotfound",
	"getaddrinfo",
	"token acquisition failed",
	"failed to acquire token",
];

/// Returns `true` when `text` names a transport failure rather than a business rejection.
pub fn is_network_error(text: &str) -> bool {
	let lowered = text.to_lowercase();

	NETWORK_ERROR_MARKERS.iter().any(|marker| lowered.contains(marker))
}

/// Bounded retry schedule: the first gap is `first_delay`, every later gap `later_delay`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetryPolicy {
	/// Total attempts, including the first.
	pub max_attempts: u32,
	/// Gap after the first failed attempt.
	pub first_delay: StdDuration,
	/// Gap after every later failed attempt.
	pub later_delay: StdDuration,
}
impl RetryPolicy {
	/// Policy with the default schedule and a custom attempt budget.
	pub fn with_max_attempts(max_attempts: u32) -> Self {
		Self { max_attempts, ..Self::default() }
	}

	/// Checks that at least one attempt is allowed.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.max_attempts == 0 {
			return Err(ConfigError::ZeroRetryAttempts);
		}

		Ok(())
	}

	/// Gap to wait after failed attempt number `attempt` (1-based).
	pub fn delay_after(&self, attempt: u32) -> StdDuration {
		if attempt <= 1 { self.first_delay } else { self.later_delay }
	}

	/// Runs `op` until it succeeds, fails for a business reason, or the budget runs out.
	///
	/// A raised error is retried when it is retryable by class or its text looks like a
	/// transport failure; any other raised error is downgraded with [`Error::into_envelope`].
	/// Outside a Tokio runtime no gap can be awaited, so a retryable failure ends the loop with
	/// the generic unavailable envelope.
	pub async fn run<T, F, Fut>(&self, operation: &'static str, mut op: F) -> Envelope<T>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<Envelope<T>>>,
	{
		const KIND: FlowKind = FlowKind::Retry;

		let span = FlowSpan::new(KIND, operation);
		let max_attempts = self.max_attempts.max(1);

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let mut attempt = 0;

				loop {
					attempt += 1;

					let reason = match op().await {
						Ok(envelope) if envelope.success => return envelope,
						Ok(envelope) => {
							let text = envelope.failure_text().unwrap_or_default().to_owned();

							if !is_network_error(&text) {
								return envelope;
							}

							text
						},
						Err(e) if e.is_retryable() || is_network_error(&e.to_string()) =>
							e.to_string(),
						Err(e) => return e.into_envelope(),
					};

					if attempt >= max_attempts {
						obs::record_transition(KIND, "exhausted");

						return Envelope::from_code(FailureCode::TemporarilyUnavailable);
					}

					if tokio::runtime::Handle::try_current().is_err() {
						obs::record_transition(KIND, "no_runtime");

						return Envelope::from_code(FailureCode::TemporarilyUnavailable);
					}

					let delay = self.delay_after(attempt);

					obs::record_backoff(KIND, attempt, delay, &reason);
					tokio::time::sleep(delay).await;
				}
			})
			.await;

		if result.success {
			obs::record_flow_outcome(KIND, FlowOutcome::Success);
		} else {
			obs::record_flow_outcome(KIND, FlowOutcome::Failure);
		}

		result
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			first_delay: StdDuration::from_millis(1_000),
			later_delay: StdDuration::from_millis(2_000),
		}
	}
}

/// Runs `op` under the default schedule with a custom attempt budget.
pub async fn with_retry<T, F, Fut>(op: F, max_attempts: u32) -> Envelope<T>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<Envelope<T>>>,
{
	RetryPolicy::with_max_attempts(max_attempts).run("with_retry", op).await
}

#[cfg(test)]
mod tests {
	// std
	use std::{
		pin::pin,
		sync::atomic::{AtomicU32, Ordering},
		task::{Context, Poll, Waker},
	};
	// crates.io
	use serde_json::Value;
	use tokio::time::Instant;
	// self
	use super::*;
	use crate::error::{AuthError, TransportError};

	fn network_error() -> Error {
		TransportError::Io(std::io::Error::other("connection refused")).into()
	}

	#[test]
	fn classification_is_case_insensitive() {
		assert!(is_network_error("TypeError: Failed to fetch"));
		assert!(is_network_error("connect ECONNREFUSED 127.0.0.1:443"));
		assert!(is_network_error("Request Timeout"));
		assert!(is_network_error("getaddrinfo ENOTFOUND api.growth.example"));
		assert!(is_network_error("Token acquisition failed after 5 attempts."));
		assert!(!is_network_error("insufficient credits"));
		assert!(!is_network_error("Referral code already used"));
	}

	#[test]
	fn delay_schedule_is_one_then_two_seconds() {
		let policy = RetryPolicy::default();

		assert_eq!(policy.delay_after(1), StdDuration::from_secs(1));
		assert_eq!(policy.delay_after(2), StdDuration::from_secs(2));
		assert_eq!(policy.delay_after(7), StdDuration::from_secs(2));
	}

	#[tokio::test(start_paused = true)]
	async fn business_failure_is_not_retried() {
		let calls = AtomicU32::new(0);
		let started = Instant::now();
		let envelope: Envelope = with_retry(
			|| {
				calls.fetch_add(1, Ordering::SeqCst);

				async { Ok(Envelope::failure("insufficient credits", "insufficient credits")) }
			},
			3,
		)
		.await;

		assert_eq!(calls.load(Ordering::SeqCst), 1);
		assert!(started.elapsed() < StdDuration::from_millis(1));
		assert_eq!(envelope.failure_text(), Some("insufficient credits"));
	}

	#[tokio::test(start_paused = true)]
	async fn raised_business_error_is_returned_verbatim() {
		let calls = AtomicU32::new(0);
		let envelope: Envelope = with_retry(
			|| {
				calls.fetch_add(1, Ordering::SeqCst);

				async { Err(Error::business(Some(402), "insufficient credits")) }
			},
			3,
		)
		.await;

		assert_eq!(calls.load(Ordering::SeqCst), 1);
		assert_eq!(envelope.failure_text(), Some("insufficient credits"));
	}

	#[tokio::test(start_paused = true)]
	async fn network_failures_retry_up_to_budget_then_go_generic() {
		let calls = AtomicU32::new(0);
		let started = Instant::now();
		let envelope: Envelope = with_retry(
			|| {
				calls.fetch_add(1, Ordering::SeqCst);

				async { Err(network_error()) }
			},
			3,
		)
		.await;

		assert_eq!(calls.load(Ordering::SeqCst), 3);
		assert!(started.elapsed() >= StdDuration::from_secs(3));
		assert!(started.elapsed() < StdDuration::from_millis(3_100));
		assert_eq!(envelope.failure_code(), Some(FailureCode::TemporarilyUnavailable));
		assert!(!envelope.failure_text().unwrap_or_default().contains("refused"));
	}

	#[tokio::test(start_paused = true)]
	async fn in_band_network_failure_is_retried() {
		let calls = AtomicU32::new(0);
		let envelope: Envelope = with_retry(
			|| {
				let call = calls.fetch_add(1, Ordering::SeqCst);

				async move {
					if call == 0 {
						Ok(Envelope::failure("Failed to fetch", "Failed to fetch"))
					} else {
						Ok(Envelope::ok(serde_json::json!({ "balance": 10 })))
					}
				}
			},
			3,
		)
		.await;

		assert_eq!(calls.load(Ordering::SeqCst), 2);
		assert!(envelope.success);
	}

	#[tokio::test(start_paused = true)]
	async fn unauthorized_surfaces_immediately() {
		let calls = AtomicU32::new(0);
		let envelope: Envelope = with_retry(
			|| {
				calls.fetch_add(1, Ordering::SeqCst);

				async { Err(AuthError::Unauthorized.into()) }
			},
			3,
		)
		.await;

		assert_eq!(calls.load(Ordering::SeqCst), 1);
		assert_eq!(envelope.failure_code(), Some(FailureCode::AuthFailed));
	}

	#[tokio::test(start_paused = true)]
	async fn single_attempt_budget_never_sleeps() {
		let started = Instant::now();
		let envelope: Envelope = with_retry(|| async { Err(network_error()) }, 1).await;

		assert!(started.elapsed() < StdDuration::from_millis(1));
		assert_eq!(envelope.failure_code(), Some(FailureCode::TemporarilyUnavailable));
	}

	#[test]
	fn retryable_failure_outside_runtime_ends_without_sleeping() {
		let calls = AtomicU32::new(0);
		let mut cx = Context::from_waker(Waker::noop());
		let mut retry = pin!(with_retry::<Value, _, _>(
			|| {
				calls.fetch_add(1, Ordering::SeqCst);

				async { Err(network_error()) }
			},
			3,
		));
		let Poll::Ready(envelope) = retry.as_mut().poll(&mut cx) else {
			panic!("Retry loop should finish in a single poll without a runtime.");
		};

		assert_eq!(calls.load(Ordering::SeqCst), 1);
		assert_eq!(envelope.failure_code(), Some(FailureCode::TemporarilyUnavailable));
	}
}
