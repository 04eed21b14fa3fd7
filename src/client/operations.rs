//! Business operations exposed by [`GrowthClient`].
//!
//! Every operation returns an [`Envelope`] and never an error. Credit-earning and
//! credit-spending operations run under the configured [`RetryPolicy`]; the rest are sent
//! once.
//!
//! [`RetryPolicy`]: crate::retry::RetryPolicy

// crates.io
use serde_json::Value;
// self
use crate::{_prelude::*, client::GrowthClient, envelope::Envelope, router::Operation};

/// Profile sent by [`GrowthClient::identify_user`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
	/// Caller-side stable user identifier.
	pub external_id: String,
	/// Contact email.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
	/// Display name.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	/// Free-form attributes.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub metadata: Option<Value>,
}
impl UserProfile {
	/// Profile carrying only the external identifier.
	pub fn new(external_id: impl Into<String>) -> Self {
		Self { external_id: external_id.into(), ..Self::default() }
	}
}

/// Credit award sent by [`GrowthClient::earn_credits`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarnCredits {
	/// Action that earned the credits.
	pub action: String,
	/// Amount, when the action does not fix it server-side.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub amount: Option<i64>,
	/// Free-form attributes.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub metadata: Option<Value>,
}

/// Credit debit sent by [`GrowthClient::spend_credits`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendCredits {
	/// Amount to debit.
	pub amount: i64,
	/// What the credits pay for.
	pub reason: String,
	/// Free-form attributes.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub metadata: Option<Value>,
}

/// Analytics event sent by [`GrowthClient::track_event`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackEvent {
	/// Event name.
	pub event: String,
	/// Event properties.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub properties: Option<Value>,
}

#[derive(Serialize)]
struct ReferralCodeBody<'a> {
	code: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ClaimRewardBody<'a> {
	reward_id: &'a str,
}

impl GrowthClient {
	/// Fetches the current user.
	pub async fn current_user(&self) -> Envelope {
		self.call::<()>(Operation::CurrentUser, None).await
	}

	/// Creates or updates the current user's profile.
	pub async fn identify_user(&self, profile: &UserProfile) -> Envelope {
		self.call(Operation::IdentifyUser, Some(profile)).await
	}

	/// Fetches the user's own referral code.
	pub async fn referral_code(&self) -> Envelope {
		self.call::<()>(Operation::ReferralCode, None).await
	}

	/// Fetches referral statistics.
	pub async fn referral_stats(&self) -> Envelope {
		self.call::<()>(Operation::ReferralStats, None).await
	}

	/// Redeems someone else's referral code.
	pub async fn apply_referral_code(&self, code: &str) -> Envelope {
		self.call(Operation::ApplyReferralCode, Some(&ReferralCodeBody { code })).await
	}

	/// Fetches the credit balance.
	pub async fn credit_balance(&self) -> Envelope {
		self.call::<()>(Operation::CreditBalance, None).await
	}

	/// Earns credits for an action.
	pub async fn earn_credits(&self, request: &EarnCredits) -> Envelope {
		self.call(Operation::EarnCredits, Some(request)).await
	}

	/// Spends credits.
	pub async fn spend_credits(&self, request: &SpendCredits) -> Envelope {
		self.call(Operation::SpendCredits, Some(request)).await
	}

	/// Lists available rewards.
	pub async fn rewards(&self) -> Envelope {
		self.call::<()>(Operation::Rewards, None).await
	}

	/// Claims a reward.
	pub async fn claim_reward(&self, reward_id: &str) -> Envelope {
		self.call(Operation::ClaimReward, Some(&ClaimRewardBody { reward_id })).await
	}

	/// Records an analytics event.
	pub async fn track_event(&self, event: &TrackEvent) -> Envelope {
		self.call(Operation::TrackEvent, Some(event)).await
	}

	async fn call<B>(&self, operation: Operation, body: Option<&B>) -> Envelope
	where
		B: ?Sized + Serialize,
	{
		let (method, path) = (operation.method(), operation.path());

		if operation.is_credit_consuming() {
			self.config.retry.run(operation.as_str(), || self.dispatch(method, path, body)).await
		} else {
			self.dispatch(method, path, body).await.unwrap_or_else(Error::into_envelope)
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn request_bodies_use_camel_case() {
		let profile = UserProfile { email: Some("a@b.example".into()), ..UserProfile::new("u-1") };
		let claim = ClaimRewardBody { reward_id: "r-9" };

		assert_eq!(
			serde_json::to_value(&profile).expect("Profile should serialize."),
			serde_json::json!({ "externalId": "u-1", "email": "a@b.example" })
		);
		assert_eq!(
			serde_json::to_value(&claim).expect("Claim body should serialize."),
			serde_json::json!({ "rewardId": "r-9" })
		);
	}
}
