//! Backoff and proactive refresh policy for token acquisition.

// std
use std::time::Duration as StdDuration;
// self
use crate::{_prelude::*, error::ConfigError};

/// Token acquisition policy.
///
/// `max_attempts` is `None` by default, meaning acquisition retries for as long as the caller
/// keeps awaiting it. Set a ceiling to make [`TokenManager::ensure_valid_token`] give up.
///
/// [`TokenManager::ensure_valid_token`]: crate::token::TokenManager::ensure_valid_token
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TokenPolicy {
	/// Delay after the first failure; doubles per consecutive failure.
	pub backoff_base: StdDuration,
	/// Upper bound on any single backoff delay.
	pub backoff_cap: StdDuration,
	/// Optional per-call attempt ceiling.
	pub max_attempts: Option<u32>,
	/// Fraction of the remaining lifetime after which a proactive refresh fires.
	pub refresh_ratio: f64,
}
impl TokenPolicy {
	/// Checks ratio bounds and the optional ceiling.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if !(self.refresh_ratio > 0.0 && self.refresh_ratio <= 1.0) {
			return Err(ConfigError::InvalidRefreshRatio { ratio: self.refresh_ratio });
		}
		if self.max_attempts == Some(0) {
			return Err(ConfigError::ZeroTokenAttempts);
		}

		Ok(())
	}

	/// Backoff before the next attempt given the current failure streak length.
	pub fn backoff_delay(&self, attempt_count: u32) -> StdDuration {
		backoff_delay(self.backoff_base, self.backoff_cap, attempt_count)
	}
}
impl Default for TokenPolicy {
	fn default() -> Self {
		Self {
			backoff_base: StdDuration::from_millis(1_000),
			backoff_cap: StdDuration::from_millis(30_000),
			max_attempts: None,
			refresh_ratio: 0.8,
		}
	}
}

/// `min(base × 2^attempt_count, cap)`, saturating instead of overflowing.
pub fn backoff_delay(base: StdDuration, cap: StdDuration, attempt_count: u32) -> StdDuration {
	let factor = 2_u32.checked_pow(attempt_count).unwrap_or(u32::MAX);

	base.checked_mul(factor).unwrap_or(cap).min(cap)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn nth_failure_waits_base_times_two_to_the_n_minus_one() {
		let policy = TokenPolicy::default();

		for n in 1..=12_u32 {
			let expected = (1_000_u64 * 2_u64.pow(n - 1)).min(30_000);

			assert_eq!(policy.backoff_delay(n - 1), StdDuration::from_millis(expected), "n = {n}");
		}
	}

	#[test]
	fn large_streaks_saturate_at_cap() {
		let policy = TokenPolicy::default();

		assert_eq!(policy.backoff_delay(31), StdDuration::from_secs(30));
		assert_eq!(policy.backoff_delay(32), StdDuration::from_secs(30));
		assert_eq!(policy.backoff_delay(u32::MAX), StdDuration::from_secs(30));
	}

	#[test]
	fn validation_rejects_bad_ratio_and_zero_ceiling() {
		let zero_ratio = TokenPolicy { refresh_ratio: 0.0, ..TokenPolicy::default() };
		let nan_ratio = TokenPolicy { refresh_ratio: f64::NAN, ..TokenPolicy::default() };
		let zero_ceiling = TokenPolicy { max_attempts: Some(0), ..TokenPolicy::default() };

		assert!(matches!(zero_ratio.validate(), Err(ConfigError::InvalidRefreshRatio { .. })));
		assert!(matches!(nan_ratio.validate(), Err(ConfigError::InvalidRefreshRatio { .. })));
		assert!(matches!(zero_ceiling.validate(), Err(ConfigError::ZeroTokenAttempts)));
		assert!(TokenPolicy::default().validate().is_ok());
	}
}
