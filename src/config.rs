//! Client configuration and its validating builder.

// self
use crate::{
	_prelude::*,
	auth::Credentials,
	error::ConfigError,
	retry::RetryPolicy,
	store::TokenStore,
	token::TokenPolicy,
};

/// Validated configuration consumed by [`GrowthClient`](crate::client::GrowthClient).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
	/// Keys that select the auth mode.
	pub credentials: Credentials,
	/// Service base URL; request paths are appended to it.
	pub base_url: Url,
	/// Header carrying the fingerprint outside public-key mode.
	pub fingerprint_header: String,
	/// Storage key of the persisted token entry.
	pub storage_key: String,
	/// Token acquisition backoff and proactive refresh policy.
	#[serde(default)]
	pub token: TokenPolicy,
	/// Request-level retry policy for credit-consuming operations.
	#[serde(default)]
	pub retry: RetryPolicy,
}
impl ClientConfig {
	/// Base URL used when the credentials do not name one.
	pub const DEFAULT_BASE_URL: &'static str = "http://127.0.0.1:3000";
	/// Default fingerprint header name.
	pub const DEFAULT_FINGERPRINT_HEADER: &'static str = "X-Fingerprint";

	/// Creates a builder seeded from `credentials`.
	pub fn builder(credentials: Credentials) -> ClientConfigBuilder {
		ClientConfigBuilder::new(credentials)
	}

	/// Re-runs builder validation, e.g. after deserializing a config file.
	pub fn validate(&self) -> Result<(), ConfigError> {
		validate_base_url(&self.base_url)?;

		if self.fingerprint_header.trim().is_empty() {
			return Err(ConfigError::EmptyFingerprintHeader);
		}
		if self.storage_key.trim().is_empty() {
			return Err(ConfigError::EmptyStorageKey);
		}

		self.token.validate()?;
		self.retry.validate()?;

		Ok(())
	}

	/// Resolves a wire path against the base URL, keeping any base path prefix.
	pub fn endpoint_url(&self, path: &str) -> Result<Url, ConfigError> {
		let base = self.base_url.as_str().trim_end_matches('/');
		let joined = if path.starts_with('/') {
			format!("{base}{path}")
		} else {
			format!("{base}/{path}")
		};

		Url::parse(&joined).map_err(|source| ConfigError::InvalidPath { path: path.into(), source })
	}
}

/// Builder for [`ClientConfig`] values.
#[derive(Clone, Debug)]
pub struct ClientConfigBuilder {
	credentials: Credentials,
	base_url: Option<String>,
	fingerprint_header: String,
	storage_key: String,
	token: TokenPolicy,
	retry: RetryPolicy,
}
impl ClientConfigBuilder {
	fn new(credentials: Credentials) -> Self {
		Self {
			base_url: credentials.base_url.clone(),
			credentials,
			fingerprint_header: ClientConfig::DEFAULT_FINGERPRINT_HEADER.into(),
			storage_key: TokenStore::DEFAULT_KEY.into(),
			token: TokenPolicy::default(),
			retry: RetryPolicy::default(),
		}
	}

	/// Overrides the base URL from the credentials.
	pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
		self.base_url = Some(base_url.into());

		self
	}

	/// Overrides the fingerprint header name.
	pub fn fingerprint_header(mut self, name: impl Into<String>) -> Self {
		self.fingerprint_header = name.into();

		self
	}

	/// Overrides the storage key of the persisted token.
	pub fn storage_key(mut self, key: impl Into<String>) -> Self {
		self.storage_key = key.into();

		self
	}

	/// Replaces the token policy.
	pub fn token_policy(mut self, policy: TokenPolicy) -> Self {
		self.token = policy;

		self
	}

	/// Replaces the request retry policy.
	pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
		self.retry = policy;

		self
	}

	/// Validates and builds the configuration.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		let raw = self.base_url.as_deref().map(str::trim).filter(|url| !url.is_empty());
		let base_url = Url::parse(raw.unwrap_or(ClientConfig::DEFAULT_BASE_URL))
			.map_err(|source| ConfigError::InvalidBaseUrl { source })?;
		let config = ClientConfig {
			credentials: self.credentials,
			base_url,
			fingerprint_header: self.fingerprint_header,
			storage_key: self.storage_key,
			token: self.token,
			retry: self.retry,
		};

		config.validate()?;

		Ok(config)
	}
}

fn validate_base_url(url: &Url) -> Result<(), ConfigError> {
	match url.scheme() {
		"http" | "https" => Ok(()),
		other => Err(ConfigError::UnsupportedScheme { scheme: other.into() }),
	}
}
