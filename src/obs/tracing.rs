// std
use std::time::Duration as StdDuration;
// self
use crate::{
	_prelude::*,
	obs::{self, FlowKind},
	store::StoreError,
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// A span builder used by client flows.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provided flow kind + stage.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("growth_client.flow", flow = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a warning for a scheduled backoff sleep.
pub fn record_backoff(kind: FlowKind, attempt: u32, delay: StdDuration, reason: &dyn Display) {
	obs::record_backoff_metric(kind);

	#[cfg(feature = "tracing")]
	{
		tracing::warn!(
			flow = kind.as_str(),
			attempt,
			delay_ms = delay.as_millis() as u64,
			%reason,
			"Backing off before the next attempt."
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (attempt, delay, reason);
	}
}

/// Emits a warning when the storage backend fails and the client falls back to memory.
pub fn record_storage_degraded(operation: &'static str, error: &StoreError) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(operation, %error, "Token storage is unavailable; continuing without it.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (operation, error);
	}
}

/// Emits a debug event describing a flow transition.
pub fn record_transition(kind: FlowKind, transition: &'static str) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(flow = kind.as_str(), transition, "Flow transition.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, transition);
	}
}
