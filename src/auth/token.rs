//! Bearer token model and its serialized form.

// std
use std::time::Duration as StdDuration;
// crates.io
use time::format_description::well_known::Rfc3339;
// self
use crate::{_prelude::*, auth::Secret};

/// Short-lived bearer token with an absolute expiry.
///
/// Tokens are replaced wholesale on refresh; nothing mutates one in place.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
	/// Bearer value; callers must avoid logging it.
	pub value: Secret,
	/// Instant after which the token is no longer usable.
	pub expires_at: OffsetDateTime,
}
impl Token {
	/// Creates a token from its value and expiry.
	pub fn new(value: impl Into<String>, expires_at: OffsetDateTime) -> Self {
		Self { value: Secret::new(value), expires_at }
	}

	/// Returns `true` while `now` is strictly before the expiry.
	pub fn is_valid_at(&self, now: OffsetDateTime) -> bool {
		self.expires_at > now
	}

	/// Checks validity against the current UTC clock.
	pub fn is_valid(&self) -> bool {
		self.is_valid_at(OffsetDateTime::now_utc())
	}

	/// Delay until a proactive refresh should fire: `ratio × (expires_at - now)`, floored at zero.
	pub fn refresh_delay_at(&self, ratio: f64, now: OffsetDateTime) -> StdDuration {
		let remaining = self.expires_at - now;

		if !remaining.is_positive() {
			return StdDuration::ZERO;
		}

		StdDuration::try_from(remaining * ratio).unwrap_or(StdDuration::ZERO)
	}
}
impl Debug for Token {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Token")
			.field("value", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// JSON form `{ "token", "expiresAt" }` shared by the token endpoint and persisted entries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredToken {
	/// Bearer value.
	pub token: String,
	/// ISO-8601 expiry timestamp.
	pub expires_at: String,
}
impl StoredToken {
	/// Parses the expiry and yields a [`Token`], or `None` when the timestamp is malformed.
	pub fn into_token(self) -> Option<Token> {
		let expires_at = OffsetDateTime::parse(self.expires_at.trim(), &Rfc3339).ok()?;

		if self.token.is_empty() {
			return None;
		}

		Some(Token::new(self.token, expires_at))
	}
}
impl From<&Token> for StoredToken {
	fn from(token: &Token) -> Self {
		let expires_at = token
			.expires_at
			.format(&Rfc3339)
			.unwrap_or_else(|_| token.expires_at.unix_timestamp().to_string());

		Self { token: token.value.expose().to_owned(), expires_at }
	}
}
