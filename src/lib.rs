//! Resilient client for growth and referral services: credential-driven auth modes, a
//! short-lived token lifecycle with proactive refresh, 401 recovery, and credit-safe retries.
//!
//! Credentials are classified once into an [`auth::AuthMode`]. Public-key clients exchange
//! their key for short-lived bearer tokens through [`token::TokenManager`]; direct clients send
//! their private key; proxy clients send no credential at all. Business operations on
//! [`client::GrowthClient`] always resolve to an [`envelope::Envelope`].

#![deny(clippy::all, missing_docs)]
#![cfg_attr(not(test), deny(unused_crate_dependencies))]

pub mod auth;
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod ext;
pub mod http;
pub mod obs;
pub mod retry;
pub mod router;
pub mod store;
pub mod token;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::collections::VecDeque;
	// crates.io
	use time::format_description::well_known::Rfc3339;
	// self
	use crate::{
		auth::Credentials,
		client::GrowthClient,
		config::ClientConfig,
		error::TransportError,
		http::{ApiRequest, ApiResponse, HttpTransport, TransportFuture},
		store::StorageBackend,
	};

	type Handler = Box<dyn Fn(&ApiRequest) -> Result<ApiResponse, TransportError> + Send + Sync>;

	/// In-process transport answering from a closure and recording every request.
	pub struct ScriptedTransport {
		handler: Handler,
		requests: Mutex<Vec<ApiRequest>>,
	}
	impl ScriptedTransport {
		/// Answers every request with `handler`.
		pub fn always<F>(handler: F) -> Arc<Self>
		where
			F: 'static + Send + Sync + Fn(&ApiRequest) -> Result<ApiResponse, TransportError>,
		{
			Arc::new(Self { handler: Box::new(handler), requests: Mutex::new(Vec::new()) })
		}

		/// Answers requests with `responses` in order, then with a 500.
		pub fn sequence(responses: Vec<Result<ApiResponse, TransportError>>) -> Arc<Self> {
			let queue = Mutex::new(VecDeque::from(responses));

			Self::always(move |_| {
				queue
					.lock()
					.pop_front()
					.unwrap_or_else(|| Ok(ApiResponse::new(500, r#"{"error":"script exhausted"}"#)))
			})
		}

		/// Requests received so far, oldest first.
		pub fn requests(&self) -> Vec<ApiRequest> {
			self.requests.lock().clone()
		}

		/// Number of requests received so far.
		pub fn calls(&self) -> usize {
			self.requests.lock().len()
		}

		/// Number of requests received for `path`.
		pub fn calls_to(&self, path: &str) -> usize {
			self.requests.lock().iter().filter(|request| request.url.path() == path).count()
		}
	}
	impl HttpTransport for ScriptedTransport {
		fn send(&self, request: ApiRequest) -> TransportFuture<'_> {
			let result = (self.handler)(&request);

			self.requests.lock().push(request);

			Box::pin(async move { result })
		}
	}

	/// Token endpoint response `{ token, expiresAt }` expiring `lifetime` from now.
	pub fn token_response(token: &str, lifetime: Duration) -> ApiResponse {
		let expires_at = (OffsetDateTime::now_utc() + lifetime)
			.format(&Rfc3339)
			.expect("Token fixture expiry should format.");
		let body = serde_json::json!({ "token": token, "expiresAt": expires_at });

		ApiResponse::new(200, body.to_string())
	}

	/// Transport failure whose text classifies as a network error.
	pub fn network_failure() -> TransportError {
		TransportError::network(std::io::Error::other("connection refused"))
	}

	/// Builds a client for `credentials` against `base_url` on the given transport and storage.
	pub fn build_test_client(
		credentials: Credentials,
		base_url: &str,
		transport: Arc<dyn HttpTransport>,
		storage: Arc<dyn StorageBackend>,
	) -> GrowthClient {
		let config = ClientConfig::builder(credentials)
			.base_url(base_url)
			.build()
			.expect("Test client config should validate.");

		GrowthClient::builder(config)
			.transport(transport)
			.storage(storage)
			.build()
			.expect("Test client should build.")
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
