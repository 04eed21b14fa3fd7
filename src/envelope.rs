//! Uniform `{ success, data, error, message }` response wrapper used by business endpoints.

// crates.io
use serde::de::DeserializeOwned;
use serde_json::Value;
// self
use crate::{_prelude::*, error::TransientError};

/// Fixed message returned when authentication could not be established.
pub const AUTH_FAILED_MESSAGE: &str = "Authentication failed. Please try again later.";
/// Fixed message returned once transport failures exhaust the applicable policy.
pub const TEMPORARILY_UNAVAILABLE_MESSAGE: &str =
	"Service is temporarily unavailable. Please try again later.";

/// Stable identifiers placed in [`Envelope::error`] for failures produced by the client itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureCode {
	/// No token could be obtained, or a 401 recurred during recovery.
	AuthFailed,
	/// Transport failures exhausted the retry policy.
	TemporarilyUnavailable,
	/// The request could not be built from local configuration.
	ConfigError,
	/// The local storage backend failed.
	StorageError,
}
impl FailureCode {
	/// Returns the identifier carried on the wire-shaped envelope.
	pub const fn as_str(self) -> &'static str {
		match self {
			FailureCode::AuthFailed => "auth_failed",
			FailureCode::TemporarilyUnavailable => "temporarily_unavailable",
			FailureCode::ConfigError => "config_error",
			FailureCode::StorageError => "storage_error",
		}
	}

	/// Resolves an identifier produced by [`FailureCode::as_str`].
	pub fn parse(value: &str) -> Option<Self> {
		[Self::AuthFailed, Self::TemporarilyUnavailable, Self::ConfigError, Self::StorageError]
			.into_iter()
			.find(|code| code.as_str() == value)
	}

	const fn default_message(self) -> &'static str {
		match self {
			FailureCode::AuthFailed => AUTH_FAILED_MESSAGE,
			FailureCode::TemporarilyUnavailable => TEMPORARILY_UNAVAILABLE_MESSAGE,
			FailureCode::ConfigError => "Client configuration is invalid.",
			FailureCode::StorageError => "Local storage failed.",
		}
	}
}
impl Display for FailureCode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Response envelope returned to callers of business operations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T = Value> {
	/// Whether the server accepted the operation.
	pub success: bool,
	/// Operation payload, present on success.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,
	/// Short error text or a [`FailureCode`] identifier.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
	/// Human-readable message.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
}
impl<T> Envelope<T> {
	/// Builds a success envelope around `data`.
	pub fn ok(data: T) -> Self {
		Self { success: true, data: Some(data), error: None, message: None }
	}

	/// Builds a failure envelope.
	pub fn failure(error: impl Into<String>, message: impl Into<String>) -> Self {
		Self { success: false, data: None, error: Some(error.into()), message: Some(message.into()) }
	}

	/// Builds a failure envelope carrying a client-side [`FailureCode`] and its fixed message.
	pub fn from_code(code: FailureCode) -> Self {
		Self::failure(code.as_str(), code.default_message())
	}

	/// Returns `message`, falling back to `error`, for failure envelopes.
	pub fn failure_text(&self) -> Option<&str> {
		if self.success {
			return None;
		}

		self.message.as_deref().or(self.error.as_deref())
	}

	/// Returns the client-side failure code, if this failure was produced locally.
	pub fn failure_code(&self) -> Option<FailureCode> {
		if self.success {
			return None;
		}

		self.error.as_deref().and_then(FailureCode::parse)
	}
}

/// Envelope as it appears on the wire; `success` may be absent.
#[derive(Debug, Deserialize)]
#[serde(bound = "T: DeserializeOwned")]
struct WireEnvelope<T> {
	#[serde(default)]
	success: Option<bool>,
	#[serde(default)]
	data: Option<T>,
	#[serde(default)]
	error: Option<String>,
	#[serde(default)]
	message: Option<String>,
}

/// Decodes a business response.
///
/// A 2xx response yields its envelope (`success` defaults to `true` when absent, so an in-band
/// `success: false` stays a normal return). Any other status becomes [`Error::Business`]
/// carrying `message ?? error ?? "Request failed (<status>)"`.
pub fn decode<T>(status: u16, body: &[u8]) -> Result<Envelope<T>>
where
	T: DeserializeOwned,
{
	let is_success_status = (200..300).contains(&status);

	if !is_success_status {
		return Err(Error::business(Some(status), failure_message(status, body)));
	}
	if body.iter().all(u8::is_ascii_whitespace) {
		return Ok(Envelope { success: true, data: None, error: None, message: None });
	}

	let mut de = serde_json::Deserializer::from_slice(body);
	let wire: WireEnvelope<T> = serde_path_to_error::deserialize(&mut de)
		.map_err(|source| TransientError::Decode { source, status: Some(status) })?;

	Ok(Envelope {
		success: wire.success.unwrap_or(true),
		data: wire.data,
		error: wire.error,
		message: wire.message,
	})
}

pub(crate) fn failure_message(status: u16, body: &[u8]) -> String {
	serde_json::from_slice::<WireEnvelope<Value>>(body)
		.ok()
		.and_then(|wire| wire.message.or(wire.error))
		.unwrap_or_else(|| format!("Request failed ({status})"))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn success_without_flag_defaults_to_true() {
		let envelope: Envelope = decode(200, br#"{"data":{"id":"u-1"}}"#)
			.expect("A 2xx response without a success flag should decode.");

		assert!(envelope.success);
		assert_eq!(envelope.data, Some(serde_json::json!({ "id": "u-1" })));
	}

	#[test]
	fn in_band_failure_is_returned_not_raised() {
		let envelope: Envelope = decode(200, br#"{"success":false,"error":"insufficient credits"}"#)
			.expect("An in-band failure should decode as an envelope.");

		assert!(!envelope.success);
		assert_eq!(envelope.failure_text(), Some("insufficient credits"));
		assert_eq!(envelope.failure_code(), None);
	}

	#[test]
	fn non_2xx_prefers_message_then_error_then_status() {
		let with_message = decode::<Value>(400, br#"{"error":"bad","message":"Code expired"}"#)
			.expect_err("A 400 response should raise.");
		let with_error =
			decode::<Value>(422, br#"{"error":"invalid input"}"#).expect_err("A 422 should raise.");
		let opaque = decode::<Value>(503, b"<html>upstream</html>").expect_err("A 503 should raise.");

		assert_eq!(with_message.to_string(), "Code expired");
		assert_eq!(with_error.to_string(), "invalid input");
		assert_eq!(opaque.to_string(), "Request failed (503)");
		assert!(matches!(opaque, Error::Business { status: Some(503), .. }));
	}

	#[test]
	fn malformed_success_body_is_transient() {
		let err = decode::<Value>(200, b"{\"success\":tru").expect_err("Malformed JSON should fail.");

		assert!(matches!(err, Error::Transient(TransientError::Decode { status: Some(200), .. })));
		assert!(err.is_retryable());
	}

	#[test]
	fn failure_codes_round_trip_through_identifiers() {
		let envelope: Envelope<()> = Envelope::from_code(FailureCode::TemporarilyUnavailable);

		assert_eq!(envelope.error.as_deref(), Some("temporarily_unavailable"));
		assert_eq!(envelope.failure_text(), Some(TEMPORARILY_UNAVAILABLE_MESSAGE));
		assert_eq!(envelope.failure_code(), Some(FailureCode::TemporarilyUnavailable));
		assert_eq!(FailureCode::parse("nope"), None);
	}
}
