//! Token acquisition machine for public-key mode.
//!
//! [`TokenManager`] hands out a valid short-lived token by checking, in order, the in-memory
//! token, the persisted entry, and finally the token endpoint. Endpoint failures back off
//! exponentially (`min(base × 2^n, cap)`) and, unless a ceiling is configured, retry until a
//! token arrives. Every acquired or restored token schedules one proactive refresh after
//! `refresh_ratio` of its remaining lifetime.
//!
//! Concurrent acquisitions are not coalesced. Each writes the token it obtained and the last
//! writer wins; the consecutive-failure counter is shared by all of them.

mod metrics;
mod policy;

pub use metrics::TokenMetrics;
pub use policy::{TokenPolicy, backoff_delay};

// std
use std::{
	sync::{
		Weak,
		atomic::{AtomicBool, AtomicU32, Ordering},
	},
	time::Duration as StdDuration,
};
// crates.io
use tokio::{runtime::Handle, task::JoinHandle};
// self
use crate::{
	_prelude::*,
	auth::{StoredToken, Token},
	envelope,
	error::{AuthError, ConfigError, TransientError},
	ext::{CachedFingerprint, DeviceContext, DeviceContextProvider},
	http::{ApiRequest, HttpMethod, HttpTransport},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::TokenStore,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenRequestBody<'a> {
	public_key: &'a str,
	#[serde(skip_serializing_if = "Option::is_none")]
	fingerprint: Option<String>,
	#[serde(skip_serializing_if = "BTreeMap::is_empty")]
	context: DeviceContext,
}

/// Shared handle to the token acquisition machine; clones observe the same state.
#[derive(Clone)]
pub struct TokenManager {
	inner: Arc<Inner>,
}
impl TokenManager {
	/// Creates a manager that requests tokens for `public_key` from `token_url`.
	pub fn new(
		public_key: impl Into<String>,
		token_url: Url,
		policy: TokenPolicy,
		transport: Arc<dyn HttpTransport>,
		store: TokenStore,
		fingerprint: Arc<CachedFingerprint>,
		context: Option<Arc<dyn DeviceContextProvider>>,
	) -> Self {
		Self {
			inner: Arc::new(Inner {
				public_key: public_key.into(),
				token_url,
				policy,
				transport,
				store,
				fingerprint,
				context,
				current: RwLock::new(None),
				attempt_count: AtomicU32::new(0),
				metrics: TokenMetrics::default(),
				refresh_task: Mutex::new(None),
				shut_down: AtomicBool::new(false),
			}),
		}
	}

	/// Resolves to `true` once a valid token is held in memory.
	///
	/// Resolves to `false` only when a configured attempt ceiling is reached, the manager has
	/// been shut down, or a backoff is needed outside a Tokio runtime; otherwise the call keeps
	/// backing off until a token arrives.
	pub async fn ensure_valid_token(&self) -> bool {
		self.valid_token().await.is_ok()
	}

	/// Returns a valid token, acquiring one if neither memory nor storage holds one.
	pub async fn valid_token(&self) -> Result<Token, AuthError> {
		if self.is_shut_down() {
			return Err(AuthError::Cancelled);
		}
		if let Some(token) = self.current_token() {
			return Ok(token);
		}
		if let Some(token) = self.inner.store.load().await {
			obs::record_transition(FlowKind::TokenAcquisition, "restored");

			*self.inner.current.write() = Some(token.clone());
			self.schedule_refresh(&token);

			return Ok(token);
		}

		let token = self.acquire(FlowKind::TokenAcquisition).await?;

		self.schedule_refresh(&token);

		Ok(token)
	}

	/// Returns the in-memory token if it has not expired yet.
	pub fn current_token(&self) -> Option<Token> {
		self.inner.current.read().as_ref().filter(|token| token.is_valid()).cloned()
	}

	/// Drops the in-memory token and the persisted entry and disarms the pending refresh.
	///
	/// Only a later successful acquisition schedules a new refresh.
	pub async fn invalidate(&self) {
		obs::record_transition(FlowKind::Recovery, "invalidated");

		if let Some(task) = self.inner.refresh_task.lock().take() {
			task.abort();
		}

		*self.inner.current.write() = None;
		self.inner.store.clear().await;
	}

	/// Cancels the refresh timer and any background acquisition, then forgets the in-memory
	/// token. The persisted entry is kept for the next client.
	///
	/// Later calls to [`TokenManager::valid_token`] fail with [`AuthError::Cancelled`].
	pub fn shutdown(&self) {
		let task = {
			let mut slot = self.inner.refresh_task.lock();

			self.inner.shut_down.store(true, Ordering::SeqCst);

			slot.take()
		};

		if let Some(task) = task {
			task.abort();
		}

		*self.inner.current.write() = None;
	}

	/// Returns `true` once [`TokenManager::shutdown`] has run.
	pub fn is_shut_down(&self) -> bool {
		self.inner.shut_down.load(Ordering::SeqCst)
	}

	/// Length of the current consecutive-failure streak.
	pub fn attempt_count(&self) -> u32 {
		self.inner.attempt_count.load(Ordering::SeqCst)
	}

	/// Returns the acquisition counters.
	pub fn metrics(&self) -> &TokenMetrics {
		&self.inner.metrics
	}

	/// Returns the policy in effect.
	pub fn policy(&self) -> &TokenPolicy {
		&self.inner.policy
	}

	async fn acquire(&self, kind: FlowKind) -> Result<Token, AuthError> {
		let span = FlowSpan::new(kind, "acquire");

		obs::record_flow_outcome(kind, FlowOutcome::Attempt);

		let result = span
			.instrument(async {
				let mut attempts = 0_u32;

				loop {
					if self.is_shut_down() {
						return Err(AuthError::Cancelled);
					}

					attempts += 1;
					self.inner.metrics.record_attempt();

					let e = match self.request_token().await {
						Ok(token) => {
							if self.is_shut_down() {
								return Err(AuthError::Cancelled);
							}

							*self.inner.current.write() = Some(token.clone());
							self.inner.store.save(&token).await;
							self.inner.attempt_count.store(0, Ordering::SeqCst);
							self.inner.metrics.record_success();

							return Ok(token);
						},
						Err(e) => e,
					};

					self.inner.metrics.record_failure();

					let streak = self.inner.attempt_count.fetch_add(1, Ordering::SeqCst);

					if self.inner.policy.max_attempts.is_some_and(|max| attempts >= max) {
						obs::record_transition(kind, "exhausted");

						return Err(AuthError::TokenUnavailable { attempts });
					}

					if Handle::try_current().is_err() {
						obs::record_transition(kind, "no_runtime");

						return Err(AuthError::RuntimeUnavailable);
					}

					let delay = self.inner.policy.backoff_delay(streak);

					obs::record_backoff(kind, attempts, delay, &e);
					tokio::time::sleep(delay).await;
				}
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(kind, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(kind, FlowOutcome::Failure),
		}

		result
	}

	async fn request_token(&self) -> Result<Token> {
		let body = TokenRequestBody {
			public_key: &self.inner.public_key,
			fingerprint: self.inner.fingerprint.get().await,
			context: self.inner.context.as_ref().map(|provider| provider.context()).unwrap_or_default(),
		};
		let request = ApiRequest {
			method: HttpMethod::Post,
			url: self.inner.token_url.clone(),
			headers: vec![("Content-Type".into(), "application/json".into())],
			body: Some(serde_json::to_vec(&body).map_err(ConfigError::RequestEncode)?),
		};
		let response = self.inner.transport.send(request).await?;
		let status = response.status;

		if !response.is_success() {
			return Err(TransientError::TokenEndpoint {
				message: envelope::failure_message(status, &response.body),
				status: Some(status),
			}
			.into());
		}

		let mut de = serde_json::Deserializer::from_slice(&response.body);
		let stored: StoredToken = serde_path_to_error::deserialize(&mut de)
			.map_err(|source| TransientError::Decode { source, status: Some(status) })?;

		stored.into_token().filter(Token::is_valid).ok_or_else(|| {
			TransientError::TokenEndpoint {
				message: "token is empty, malformed, or already expired".into(),
				status: Some(status),
			}
			.into()
		})
	}

	fn schedule_refresh(&self, token: &Token) {
		let Ok(runtime) = Handle::try_current() else {
			obs::record_transition(FlowKind::ProactiveRefresh, "no_runtime");

			return;
		};
		let delay = token.refresh_delay_at(self.inner.policy.refresh_ratio, OffsetDateTime::now_utc());
		let mut slot = self.inner.refresh_task.lock();

		if self.is_shut_down() {
			return;
		}

		let task = runtime.spawn(refresh_loop(Arc::downgrade(&self.inner), delay));

		if let Some(previous) = slot.replace(task) {
			previous.abort();
		}
	}
}
impl Debug for TokenManager {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("token_url", &self.inner.token_url.as_str())
			.field("store", &self.inner.store)
			.field("attempt_count", &self.attempt_count())
			.field("shut_down", &self.is_shut_down())
			.finish()
	}
}

struct Inner {
	public_key: String,
	token_url: Url,
	policy: TokenPolicy,
	transport: Arc<dyn HttpTransport>,
	store: TokenStore,
	fingerprint: Arc<CachedFingerprint>,
	context: Option<Arc<dyn DeviceContextProvider>>,
	current: RwLock<Option<Token>>,
	attempt_count: AtomicU32,
	metrics: TokenMetrics,
	refresh_task: Mutex<Option<JoinHandle<()>>>,
	shut_down: AtomicBool,
}
impl Drop for Inner {
	fn drop(&mut self) {
		if let Some(task) = self.refresh_task.get_mut().take() {
			task.abort();
		}
	}
}

// Holds only a weak handle while sleeping so an abandoned manager is not kept alive.
async fn refresh_loop(weak: Weak<Inner>, mut delay: StdDuration) {
	loop {
		tokio::time::sleep(delay).await;

		let Some(inner) = weak.upgrade() else {
			return;
		};
		let manager = TokenManager { inner };

		manager.inner.metrics.record_refresh();
		obs::record_transition(FlowKind::ProactiveRefresh, "fired");

		match manager.acquire(FlowKind::ProactiveRefresh).await {
			Ok(token) =>
				delay = token.refresh_delay_at(manager.inner.policy.refresh_ratio, OffsetDateTime::now_utc()),
			Err(_) => return,
		}
	}
}
