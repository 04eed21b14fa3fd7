//! Client facade tying credentials, token machine, dispatcher, and retry policy together.
//!
//! A [`GrowthClient`] classifies its credentials once and threads the resulting
//! [`AuthMode`] through routing and header construction. Only public-key clients own a
//! [`TokenManager`]; proxy and direct clients never touch the token endpoint.
//!
//! The client is deliberately not `Clone`: share it behind an `Arc`. Dropping it cancels the
//! proactive refresh timer and any background acquisition, the same as
//! [`GrowthClient::shutdown`].

pub mod dispatch;
pub mod operations;
pub mod recovery;

pub use dispatch::build_headers;
pub use operations::*;
pub use recovery::{Recovery, RecoveryState, RecoveryStep};

// self
use crate::{
	_prelude::*,
	auth::{AuthMode, Secret},
	config::ClientConfig,
	error::ConfigError,
	ext::{CachedFingerprint, DeviceContextProvider, FingerprintProvider},
	http::HttpTransport,
	router,
	store::{MemoryStorage, StorageBackend, TokenStore},
	token::{TokenManager, TokenMetrics},
};

/// Growth/referral service client.
pub struct GrowthClient {
	config: ClientConfig,
	mode: AuthMode,
	authorizer: Authorizer,
	transport: Arc<dyn HttpTransport>,
	fingerprint: Arc<CachedFingerprint>,
}
impl GrowthClient {
	/// Builds a client on the default reqwest transport with in-memory token storage.
	#[cfg(feature = "reqwest")]
	pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
		Self::builder(config).build()
	}

	/// Starts a builder for injecting a transport, storage, or collaborators.
	pub fn builder(config: ClientConfig) -> GrowthClientBuilder {
		GrowthClientBuilder::new(config)
	}

	/// Configuration the client was built from.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Auth mode resolved from the credentials.
	pub fn auth_mode(&self) -> &AuthMode {
		&self.mode
	}

	/// Token machine, present only in public-key mode.
	pub fn token_manager(&self) -> Option<&TokenManager> {
		match &self.authorizer {
			Authorizer::PublicKey(manager) => Some(manager),
			Authorizer::Proxy | Authorizer::Direct(_) => None,
		}
	}

	/// Token acquisition counters, present only in public-key mode.
	pub fn token_metrics(&self) -> Option<&TokenMetrics> {
		self.token_manager().map(TokenManager::metrics)
	}

	/// Current consecutive token failure streak; always zero outside public-key mode.
	pub fn attempt_count(&self) -> u32 {
		self.token_manager().map(TokenManager::attempt_count).unwrap_or_default()
	}

	/// Makes sure a usable token is held. Proxy and direct clients need none and get `true`.
	pub async fn ensure_valid_token(&self) -> bool {
		match self.token_manager() {
			Some(manager) => manager.ensure_valid_token().await,
			None => true,
		}
	}

	/// Drops the in-memory and persisted token, e.g. on sign-out.
	pub async fn invalidate_token(&self) {
		if let Some(manager) = self.token_manager() {
			manager.invalidate().await;
		}
	}

	/// Cancels timers the client scheduled and forgets the in-memory token.
	///
	/// In-flight HTTP requests are not aborted. The persisted token survives for the next client.
	pub fn shutdown(&self) {
		if let Some(manager) = self.token_manager() {
			manager.shutdown();
		}
	}
}
impl Debug for GrowthClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("GrowthClient")
			.field("base_url", &self.config.base_url.as_str())
			.field("mode", &self.mode.as_str())
			.field("fingerprint", &self.fingerprint)
			.finish()
	}
}
impl Drop for GrowthClient {
	fn drop(&mut self) {
		self.shutdown();
	}
}

/// Builder for [`GrowthClient`] instances.
pub struct GrowthClientBuilder {
	config: ClientConfig,
	transport: Option<Arc<dyn HttpTransport>>,
	storage: Option<Arc<dyn StorageBackend>>,
	fingerprint: Option<Arc<dyn FingerprintProvider>>,
	context: Option<Arc<dyn DeviceContextProvider>>,
}
impl GrowthClientBuilder {
	fn new(config: ClientConfig) -> Self {
		Self { config, transport: None, storage: None, fingerprint: None, context: None }
	}

	/// Replaces the default reqwest transport.
	pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
		self.transport = Some(transport);

		self
	}

	/// Persists tokens in `backend` instead of process memory.
	pub fn storage(mut self, backend: Arc<dyn StorageBackend>) -> Self {
		self.storage = Some(backend);

		self
	}

	/// Supplies the device fingerprint.
	pub fn fingerprint_provider(mut self, provider: Arc<dyn FingerprintProvider>) -> Self {
		self.fingerprint = Some(provider);

		self
	}

	/// Supplies the device context sent with token requests.
	pub fn device_context(mut self, provider: Arc<dyn DeviceContextProvider>) -> Self {
		self.context = Some(provider);

		self
	}

	/// Validates the configuration and builds the client.
	pub fn build(self) -> Result<GrowthClient, ConfigError> {
		self.config.validate()?;

		let transport = match self.transport {
			Some(transport) => transport,
			None => default_transport()?,
		};
		let mode = self.config.credentials.classify();
		let fingerprint = Arc::new(CachedFingerprint::new(self.fingerprint));
		let authorizer = match &mode {
			AuthMode::Proxy => Authorizer::Proxy,
			AuthMode::Direct(secret) => Authorizer::Direct(secret.clone()),
			AuthMode::PublicKey(public_key) => {
				let backend =
					self.storage.unwrap_or_else(|| Arc::new(MemoryStorage::default()));
				let store = TokenStore::new(backend, self.config.storage_key.clone());
				let token_url = self.config.endpoint_url(router::TOKEN_PATH)?;

				Authorizer::PublicKey(TokenManager::new(
					public_key.clone(),
					token_url,
					self.config.token.clone(),
					transport.clone(),
					store,
					fingerprint.clone(),
					self.context,
				))
			},
		};

		Ok(GrowthClient { config: self.config, mode, authorizer, transport, fingerprint })
	}
}
impl Debug for GrowthClientBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("GrowthClientBuilder")
			.field("config", &self.config)
			.field("custom_transport", &self.transport.is_some())
			.field("custom_storage", &self.storage.is_some())
			.finish()
	}
}

enum Authorizer {
	Proxy,
	PublicKey(TokenManager),
	Direct(Secret),
}

#[cfg(feature = "reqwest")]
fn default_transport() -> Result<Arc<dyn HttpTransport>, ConfigError> {
	Ok(Arc::new(crate::http::ReqwestTransport::new()?))
}

#[cfg(not(feature = "reqwest"))]
fn default_transport() -> Result<Arc<dyn HttpTransport>, ConfigError> {
	Err(ConfigError::MissingTransport)
}
