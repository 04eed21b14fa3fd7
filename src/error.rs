//! Client-level error types shared across the token machine, dispatcher, and stores.

// self
use crate::{
	_prelude::*,
	envelope::{Envelope, FailureCode},
};

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by internal layers.
///
/// Public business operations never return this type directly; it is downgraded to an
/// [`Envelope`] through [`Error::into_envelope`] at the client boundary.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary upstream failure; retry with backoff.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS, timeouts).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Token could not be obtained or a 401 recurred during recovery.
	#[error(transparent)]
	Auth(#[from] AuthError),

	/// Server-reported rejection; never retried.
	#[error("{message}")]
	Business {
		/// HTTP status code, when the rejection came with a non-2xx response.
		status: Option<u16>,
		/// Server-provided text, forwarded verbatim.
		message: String,
	},
}
impl Error {
	/// Builds a business rejection from server-provided text.
	pub fn business(status: Option<u16>, message: impl Into<String>) -> Self {
		Self::Business { status, message: message.into() }
	}

	/// Returns a stable identifier for the error class.
	pub const fn code(&self) -> &'static str {
		match self {
			Self::Storage(_) => "storage_error",
			Self::Config(_) => "config_error",
			Self::Transient(_) | Self::Transport(_) => "network_error",
			Self::Auth(_) => "auth_error",
			Self::Business { .. } => "business_error",
		}
	}

	/// Returns `true` when a request-level retry may succeed.
	pub fn is_retryable(&self) -> bool {
		match self {
			Self::Transient(_) | Self::Transport(_) => true,
			Self::Auth(e) => e.is_retryable(),
			Self::Storage(_) | Self::Config(_) | Self::Business { .. } => false,
		}
	}

	/// Downgrades the error to a failure envelope for callers.
	///
	/// Business text travels intact; transport and auth details are replaced by fixed
	/// messages so callers only branch on [`FailureCode`] values.
	pub fn into_envelope<T>(self) -> Envelope<T> {
		match self {
			Self::Business { message, .. } => Envelope::failure(message.clone(), message),
			Self::Auth(_) => Envelope::from_code(FailureCode::AuthFailed),
			Self::Transient(_) | Self::Transport(_) =>
				Envelope::from_code(FailureCode::TemporarilyUnavailable),
			Self::Config(e) => Envelope::failure(FailureCode::ConfigError.as_str(), e.to_string()),
			Self::Storage(e) =>
				Envelope::failure(FailureCode::StorageError.as_str(), e.to_string()),
		}
	}
}

/// Configuration and validation failures raised while building a client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Base URL cannot be parsed.
	#[error("Base URL is invalid.")]
	InvalidBaseUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Base URL uses a scheme other than HTTP(S).
	#[error("Base URL must use http or https, got `{scheme}`.")]
	UnsupportedScheme {
		/// Scheme that was rejected.
		scheme: String,
	},
	/// Request path cannot be joined onto the base URL.
	#[error("Request path `{path}` is invalid.")]
	InvalidPath {
		/// Offending path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Request body could not be serialized.
	#[error("Request body could not be encoded as JSON.")]
	RequestEncode(#[source] serde_json::Error),
	/// Proactive refresh ratio is outside `(0, 1]`.
	#[error("Refresh ratio must be within (0, 1], got {ratio}.")]
	InvalidRefreshRatio {
		/// Ratio that was rejected.
		ratio: f64,
	},
	/// Retry policy allows no attempt at all.
	#[error("Retry policy must allow at least one attempt.")]
	ZeroRetryAttempts,
	/// Token acquisition ceiling was set to zero.
	#[error("Token acquisition ceiling must be at least one attempt when set.")]
	ZeroTokenAttempts,
	/// Fingerprint header name is empty.
	#[error("Fingerprint header name must not be empty.")]
	EmptyFingerprintHeader,
	/// Storage key is empty.
	#[error("Storage key must not be empty.")]
	EmptyStorageKey,
	/// No transport was supplied and the default one is compiled out.
	#[error("An HTTP transport must be supplied when the `reqwest` feature is disabled.")]
	MissingTransport,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Temporary failure variants (safe to retry).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Token endpoint answered with something other than a usable token.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	TokenEndpoint {
		/// Server- or client-supplied message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Response body could not be decoded.
	#[error("Response body is malformed JSON.")]
	Decode {
		/// Structured parsing failure naming the offending path.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Failed to fetch: {source}")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while sending the request.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Authentication failures surfaced to callers with a fixed envelope.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum AuthError {
	/// The configured attempt ceiling was reached without obtaining a token.
	#[error("Token acquisition failed after {attempts} attempts.")]
	TokenUnavailable {
		/// Number of consecutive failed attempts.
		attempts: u32,
	},
	/// A 401 arrived while the request was already replaying after re-authentication.
	#[error("Request was rejected as unauthorized after re-authentication.")]
	Unauthorized,
	/// Token acquisition was cancelled by client teardown.
	#[error("Token acquisition was cancelled by client shutdown.")]
	Cancelled,
	/// A backoff was required but no Tokio runtime drives timers on this thread.
	#[error("Token acquisition needs a Tokio runtime to back off between attempts.")]
	RuntimeUnavailable,
}
impl AuthError {
	/// Only an exhausted token acquisition may succeed on a later request attempt.
	pub const fn is_retryable(&self) -> bool {
		matches!(self, Self::TokenUnavailable { .. })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::StoreError;

	#[test]
	fn store_error_converts_into_client_error_with_source() {
		let store_error = StoreError::Backend { message: "disk unavailable".into() };
		let client_error: Error = store_error.clone().into();

		assert!(matches!(client_error, Error::Storage(_)));
		assert!(client_error.to_string().contains("disk unavailable"));

		let source = StdError::source(&client_error)
			.expect("Client error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn codes_are_stable_per_class() {
		let network: Error = TransportError::Io(std::io::Error::other("reset")).into();
		let auth: Error = AuthError::Unauthorized.into();
		let business = Error::business(Some(402), "insufficient credits");

		assert_eq!(network.code(), "network_error");
		assert_eq!(auth.code(), "auth_error");
		assert_eq!(business.code(), "business_error");
	}

	#[test]
	fn retryability_separates_transport_from_business() {
		let network: Error = TransportError::Io(std::io::Error::other("reset")).into();
		let exhausted: Error = AuthError::TokenUnavailable { attempts: 3 }.into();
		let unauthorized: Error = AuthError::Unauthorized.into();

		assert!(network.is_retryable());
		assert!(exhausted.is_retryable());
		assert!(!unauthorized.is_retryable());
		assert!(!Error::business(None, "invalid input").is_retryable());
	}

	#[test]
	fn envelopes_keep_business_text_and_hide_transport_detail() {
		let business: Envelope = Error::business(Some(400), "insufficient credits").into_envelope();

		assert!(!business.success);
		assert_eq!(business.failure_text(), Some("insufficient credits"));

		let network: Envelope =
			Error::from(TransportError::Io(std::io::Error::other("connection reset by peer")))
				.into_envelope();

		assert_eq!(network.failure_code(), Some(FailureCode::TemporarilyUnavailable));
		assert!(!network.failure_text().unwrap_or_default().contains("reset"));

		let auth: Envelope = Error::from(AuthError::Unauthorized).into_envelope();

		assert_eq!(auth.failure_code(), Some(FailureCode::AuthFailed));
	}
}
