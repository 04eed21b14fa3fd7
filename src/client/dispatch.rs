//! Request dispatcher: routing, header rules, transport call, and 401 recovery.

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::AuthMode,
	client::{Authorizer, GrowthClient, Recovery, RecoveryStep},
	envelope::{self, Envelope},
	error::{AuthError, ConfigError},
	http::{ApiRequest, HttpMethod},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	router,
};

const UNAUTHORIZED: u16 = 401;

/// Builds the outbound header set for `mode`.
///
/// `Content-Type` is always present. `authorization` is attached as given (proxy clients pass
/// `None`). The fingerprint travels in `fingerprint_header` only outside public-key mode, where
/// it is already bound into the token.
pub fn build_headers(
	mode: &AuthMode,
	authorization: Option<String>,
	fingerprint_header: &str,
	fingerprint: Option<String>,
) -> Vec<(String, String)> {
	let mut headers = vec![("Content-Type".to_owned(), "application/json".to_owned())];

	if let Some(value) = authorization {
		headers.push(("Authorization".into(), value));
	}
	if let Some(value) = fingerprint.filter(|_| !mode.is_public_key()) {
		headers.push((fingerprint_header.into(), value));
	}

	headers
}

impl GrowthClient {
	/// Sends `path` (a canonical path, remapped in public-key mode) and returns its envelope.
	///
	/// Never fails: errors are downgraded with [`Error::into_envelope`].
	pub async fn request<T, B>(&self, method: HttpMethod, path: &str, body: Option<&B>) -> Envelope<T>
	where
		T: DeserializeOwned,
		B: ?Sized + Serialize,
	{
		self.dispatch(method, path, body).await.unwrap_or_else(Error::into_envelope)
	}

	pub(crate) async fn dispatch<T, B>(
		&self,
		method: HttpMethod,
		path: &str,
		body: Option<&B>,
	) -> Result<Envelope<T>>
	where
		T: DeserializeOwned,
		B: ?Sized + Serialize,
	{
		const KIND: FlowKind = FlowKind::Dispatch;

		let span = FlowSpan::new(KIND, "dispatch");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.dispatch_with_recovery(method, path, body)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn dispatch_with_recovery<T, B>(
		&self,
		method: HttpMethod,
		path: &str,
		body: Option<&B>,
	) -> Result<Envelope<T>>
	where
		T: DeserializeOwned,
		B: ?Sized + Serialize,
	{
		let wire_path = router::route(&self.mode, path);
		let url = self.config.endpoint_url(&wire_path)?;
		let body = body.map(serde_json::to_vec).transpose().map_err(ConfigError::RequestEncode)?;
		let mut recovery = Recovery::new();

		loop {
			let authorization = match self.authorization().await {
				Ok(authorization) => authorization,
				Err(e) => {
					recovery.finish();

					return Err(e.into());
				},
			};
			let fingerprint =
				if self.mode.is_public_key() { None } else { self.fingerprint.get().await };
			let request = ApiRequest {
				method,
				url: url.clone(),
				headers: build_headers(
					&self.mode,
					authorization,
					&self.config.fingerprint_header,
					fingerprint,
				),
				body: body.clone(),
			};
			let response = match self.transport.send(request).await {
				Ok(response) => response,
				Err(e) => {
					recovery.finish();

					return Err(e.into());
				},
			};

			if let (UNAUTHORIZED, Authorizer::PublicKey(manager)) =
				(response.status, &self.authorizer)
			{
				match recovery.on_unauthorized() {
					RecoveryStep::Recover => {
						obs::record_transition(FlowKind::Recovery, "recovering");
						manager.invalidate().await;

						if let Err(e) = manager.valid_token().await {
							recovery.finish();

							return Err(e.into());
						}

						recovery.on_reacquired();
						obs::record_transition(FlowKind::Recovery, "replaying");

						continue;
					},
					RecoveryStep::Surface => {
						obs::record_transition(FlowKind::Recovery, "surfaced");

						return Err(AuthError::Unauthorized.into());
					},
				}
			}

			recovery.finish();

			return envelope::decode(response.status, &response.body);
		}
	}

	async fn authorization(&self) -> Result<Option<String>, AuthError> {
		match &self.authorizer {
			Authorizer::Proxy => Ok(None),
			Authorizer::Direct(secret) => Ok(Some(secret.bearer())),
			Authorizer::PublicKey(manager) => Ok(Some(manager.valid_token().await?.value.bearer())),
		}
	}
}
