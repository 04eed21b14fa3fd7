//! Endpoint routing between the proxy/direct route set and the public-key route set.
//!
//! Every logical operation has one canonical path. Public-key clients talk to a distinct,
//! public-facing route set, so their paths are remapped; every other mode sends the canonical
//! path unchanged. Paths missing from the table pass through untouched so new endpoints work
//! before the table learns about them.

// std
use std::borrow::Cow;
// self
use crate::{_prelude::*, auth::AuthMode, http::HttpMethod};

/// Path of the public-key token endpoint.
pub const TOKEN_PATH: &str = "/api/public/auth/token";

/// Logical business operations known to the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
	/// Fetch the current user.
	CurrentUser,
	/// Create or update the current user profile.
	IdentifyUser,
	/// Fetch the user's referral code.
	ReferralCode,
	/// Fetch referral statistics.
	ReferralStats,
	/// Redeem someone else's referral code (earns credits).
	ApplyReferralCode,
	/// Fetch the credit balance.
	CreditBalance,
	/// Earn credits for an action.
	EarnCredits,
	/// Spend credits.
	SpendCredits,
	/// List available rewards.
	Rewards,
	/// Claim a reward (spends credits).
	ClaimReward,
	/// Record an analytics event.
	TrackEvent,
}
impl Operation {
	/// Every known operation, in table order.
	pub const ALL: [Operation; 11] = [
		Operation::CurrentUser,
		Operation::IdentifyUser,
		Operation::ReferralCode,
		Operation::ReferralStats,
		Operation::ApplyReferralCode,
		Operation::CreditBalance,
		Operation::EarnCredits,
		Operation::SpendCredits,
		Operation::Rewards,
		Operation::ClaimReward,
		Operation::TrackEvent,
	];

	/// Returns a stable label suitable for span or log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Operation::CurrentUser => "current_user",
			Operation::IdentifyUser => "identify_user",
			Operation::ReferralCode => "referral_code",
			Operation::ReferralStats => "referral_stats",
			Operation::ApplyReferralCode => "apply_referral_code",
			Operation::CreditBalance => "credit_balance",
			Operation::EarnCredits => "earn_credits",
			Operation::SpendCredits => "spend_credits",
			Operation::Rewards => "rewards",
			Operation::ClaimReward => "claim_reward",
			Operation::TrackEvent => "track_event",
		}
	}

	/// HTTP verb used by the operation.
	pub const fn method(self) -> HttpMethod {
		match self {
			Operation::CurrentUser
			| Operation::ReferralCode
			| Operation::ReferralStats
			| Operation::CreditBalance
			| Operation::Rewards => HttpMethod::Get,
			Operation::IdentifyUser
			| Operation::ApplyReferralCode
			| Operation::EarnCredits
			| Operation::SpendCredits
			| Operation::ClaimReward
			| Operation::TrackEvent => HttpMethod::Post,
		}
	}

	/// Canonical path used by proxy and direct clients.
	pub const fn path(self) -> &'static str {
		match self {
			Operation::CurrentUser => "/api/users/me",
			Operation::IdentifyUser => "/api/users/identify",
			Operation::ReferralCode => "/api/referrals/code",
			Operation::ReferralStats => "/api/referrals/stats",
			Operation::ApplyReferralCode => "/api/referrals/apply",
			Operation::CreditBalance => "/api/credits/balance",
			Operation::EarnCredits => "/api/credits/earn",
			Operation::SpendCredits => "/api/credits/spend",
			Operation::Rewards => "/api/rewards",
			Operation::ClaimReward => "/api/rewards/claim",
			Operation::TrackEvent => "/api/events/track",
		}
	}

	/// Path used by public-key clients.
	pub const fn public_path(self) -> &'static str {
		match self {
			Operation::CurrentUser => "/api/public/users/me",
			Operation::IdentifyUser => "/api/public/users/identify",
			Operation::ReferralCode => "/api/public/referrals/code",
			Operation::ReferralStats => "/api/public/referrals/stats",
			Operation::ApplyReferralCode => "/api/public/referrals/apply",
			Operation::CreditBalance => "/api/public/credits/balance",
			Operation::EarnCredits => "/api/public/credits/earn",
			Operation::SpendCredits => "/api/public/credits/spend",
			Operation::Rewards => "/api/public/rewards",
			Operation::ClaimReward => "/api/public/rewards/claim",
			Operation::TrackEvent => "/api/public/events/track",
		}
	}

	/// Credit-earning or credit-spending operations, wrapped by the retry policy.
	pub const fn is_credit_consuming(self) -> bool {
		matches!(
			self,
			Operation::ApplyReferralCode
				| Operation::EarnCredits
				| Operation::SpendCredits
				| Operation::ClaimReward
		)
	}

	/// Looks up the operation owning a canonical path.
	pub fn from_path(path: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|op| op.path() == path)
	}
}
impl Display for Operation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Maps a canonical path to the wire path for `mode`.
///
/// Unknown paths are returned unchanged in every mode.
pub fn route<'a>(mode: &AuthMode, path: &'a str) -> Cow<'a, str> {
	if !mode.is_public_key() {
		return Cow::Borrowed(path);
	}

	match Operation::from_path(path) {
		Some(op) => Cow::Borrowed(op.public_path()),
		None => Cow::Borrowed(path),
	}
}
