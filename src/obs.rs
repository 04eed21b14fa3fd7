//! Optional observability helpers for client flows.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit spans named `growth_client.flow` with the `flow` and `stage`
//!   fields, plus warning events for backoff, request retries, and degraded storage.
//! - Enable `metrics` to increment the `growth_client_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Flow kinds observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Foreground token acquisition with backoff.
	TokenAcquisition,
	/// Timer-driven background refresh.
	ProactiveRefresh,
	/// Single business request dispatch.
	Dispatch,
	/// 401-triggered re-authentication and replay.
	Recovery,
	/// Request-level retry loop for credit-consuming operations.
	Retry,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::TokenAcquisition => "token_acquisition",
			FlowKind::ProactiveRefresh => "proactive_refresh",
			FlowKind::Dispatch => "dispatch",
			FlowKind::Recovery => "recovery",
			FlowKind::Retry => "retry",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a client helper.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
