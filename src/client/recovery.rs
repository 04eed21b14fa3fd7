//! Per-request unauthorized recovery state machine.
//!
//! Each dispatched request owns one [`Recovery`]. A 401 in public-key mode moves it to
//! [`RecoveryState::Recovering`]; a successful reacquisition moves it to
//! [`RecoveryState::Replaying`]. A 401 seen while the re-auth flag is still set is surfaced.

/// Phase of one request's recovery cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecoveryState {
	/// No request in flight.
	Idle,
	/// Original request sent.
	Dispatching,
	/// Token cleared; reacquisition running.
	Recovering,
	/// Original request re-sent once with the new token.
	Replaying,
}

/// What the dispatcher should do after a 401.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecoveryStep {
	/// Clear the token, reacquire, and replay.
	Recover,
	/// Surface the 401 to the caller.
	Surface,
}

/// Loop-guarded recovery cycle of a single outer request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Recovery {
	state: RecoveryState,
	reauth_in_flight: bool,
}
impl Recovery {
	/// Starts a cycle for a freshly dispatched request.
	pub fn new() -> Self {
		Self { state: RecoveryState::Dispatching, reauth_in_flight: false }
	}

	/// Current phase.
	pub fn state(&self) -> RecoveryState {
		self.state
	}

	/// Returns `true` while a recovery cycle is running for this request.
	pub fn reauth_in_flight(&self) -> bool {
		self.reauth_in_flight
	}

	/// Handles a 401 received in public-key mode.
	pub fn on_unauthorized(&mut self) -> RecoveryStep {
		if self.reauth_in_flight {
			self.finish();

			return RecoveryStep::Surface;
		}

		self.reauth_in_flight = true;
		self.state = RecoveryState::Recovering;

		RecoveryStep::Recover
	}

	/// Records a successful reacquisition; the next send is the single replay.
	pub fn on_reacquired(&mut self) {
		self.state = RecoveryState::Replaying;
	}

	/// Ends the cycle whatever its outcome.
	pub fn finish(&mut self) {
		self.reauth_in_flight = false;
		self.state = RecoveryState::Idle;
	}
}
impl Default for Recovery {
	fn default() -> Self {
		Self::new()
	}
}
