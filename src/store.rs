//! Storage capability and the validating [`TokenStore`] built on top of it.
//!
//! Backends only move opaque strings by key. [`TokenStore`] owns the single token entry:
//! it validates expiry on every load, drops expired or corrupt entries, and swallows backend
//! failures so an unavailable store degrades to "no persisted token" instead of an error.

pub mod file;
pub mod memory;
pub mod noop;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use noop::NoopStorage;

// self
use crate::{
	_prelude::*,
	auth::{StoredToken, Token},
	obs,
};

/// Boxed future returned by [`StorageBackend`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Key/value persistence contract (the shape of browser local storage).
pub trait StorageBackend
where
	Self: Send + Sync,
{
	/// Reads the raw entry stored under `key`.
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>>;

	/// Writes or replaces the raw entry stored under `key`.
	fn set<'a>(&'a self, key: &'a str, value: String) -> StoreFuture<'a, ()>;

	/// Removes the entry stored under `key`, if any.
	fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()>;
}

/// Error type produced by [`StorageBackend`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure (permissions, disk, quota).
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Persists the single cached token under a fixed key.
#[derive(Clone)]
pub struct TokenStore {
	backend: Arc<dyn StorageBackend>,
	key: String,
}
impl TokenStore {
	/// Default key used by clients that do not override it.
	pub const DEFAULT_KEY: &'static str = "growth_client.token";

	/// Wraps `backend`, storing the token under `key`.
	pub fn new(backend: Arc<dyn StorageBackend>, key: impl Into<String>) -> Self {
		Self { backend, key: key.into() }
	}

	/// Store that never persists anything.
	pub fn noop() -> Self {
		Self::new(Arc::new(NoopStorage), Self::DEFAULT_KEY)
	}

	/// Key under which the token entry lives.
	pub fn key(&self) -> &str {
		&self.key
	}

	/// Loads the persisted token if it is still valid right now.
	pub async fn load(&self) -> Option<Token> {
		self.load_at(OffsetDateTime::now_utc()).await
	}

	/// Loads the persisted token if it is valid at `now`.
	///
	/// Expired, unparsable, or otherwise unusable entries are removed as a side effect, including
	/// entries the backend itself reports as corrupt.
	pub async fn load_at(&self, now: OffsetDateTime) -> Option<Token> {
		let raw = match self.backend.get(&self.key).await {
			Ok(Some(raw)) => raw,
			Ok(None) => return None,
			Err(e) => {
				obs::record_storage_degraded("load", &e);

				if matches!(e, StoreError::Serialization { .. }) {
					self.clear().await;
				}

				return None;
			},
		};
		let token = serde_json::from_str::<StoredToken>(&raw)
			.ok()
			.and_then(StoredToken::into_token)
			.filter(|token| token.is_valid_at(now));

		if token.is_none() {
			self.clear().await;
		}

		token
	}

	/// Persists `token`, replacing any previous entry.
	pub async fn save(&self, token: &Token) {
		let payload = match serde_json::to_string(&StoredToken::from(token)) {
			Ok(payload) => payload,
			Err(e) => {
				obs::record_storage_degraded(
					"save",
					&StoreError::Serialization { message: e.to_string() },
				);

				return;
			},
		};

		if let Err(e) = self.backend.set(&self.key, payload).await {
			obs::record_storage_degraded("save", &e);
		}
	}

	/// Removes the persisted entry.
	pub async fn clear(&self) {
		if let Err(e) = self.backend.remove(&self.key).await {
			obs::record_storage_degraded("clear", &e);
		}
	}
}
impl Debug for TokenStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenStore").field("key", &self.key).finish()
	}
}
