#![cfg(feature = "reqwest")]

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use growth_client::{
	_preludet::*,
	auth::Credentials,
	client::GrowthClient,
	config::ClientConfig,
	ext::StaticFingerprint,
	http::ReqwestTransport,
};

fn build_client(server: &MockServer, credentials: Credentials) -> Result<GrowthClient> {
	let config = ClientConfig::builder(credentials)
		.base_url(server.base_url())
		.build()?;
	let transport = ReqwestTransport::new()?;
	let client = GrowthClient::builder(config)
		.transport(Arc::new(transport))
		.fingerprint_provider(Arc::new(StaticFingerprint::new("fp-device-1")))
		.build()?;

	Ok(client)
}

#[tokio::test]
async fn direct_mode_sends_private_key_and_fingerprint_on_canonical_route() -> Result<()> {
	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/public/auth/token");
			then.status(500);
		})
		.await;
	let user_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/users/me")
				.header("authorization", "Bearer sk_live_1")
				.header("x-fingerprint", "fp-device-1")
				.header("content-type", "application/json");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"success\":true,\"data\":{\"id\":\"u-7\"}}");
		})
		.await;
	let client = build_client(&server, Credentials::private_key("sk_live_1"))?;
	let envelope = client.current_user().await;

	assert!(envelope.success);

	user_mock.assert_calls_async(1).await;
	token_mock.assert_calls_async(0).await;

	Ok(())
}

#[tokio::test]
async fn proxy_mode_sends_fingerprint_on_canonical_route() -> Result<()> {
	let server = MockServer::start_async().await;
	let balance_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/credits/balance").header("x-fingerprint", "fp-device-1");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"success\":true,\"data\":{\"balance\":3}}");
		})
		.await;
	let client = build_client(&server, Credentials::proxy())?;
	let envelope = client.credit_balance().await;

	assert!(envelope.success);
	assert_eq!(envelope.data, Some(serde_json::json!({ "balance": 3 })));

	balance_mock.assert_calls_async(1).await;

	Ok(())
}

#[tokio::test]
async fn unauthorized_outside_public_key_mode_is_a_business_failure() -> Result<()> {
	let server = MockServer::start_async().await;
	let stats_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/referrals/stats");
			then.status(401)
				.header("content-type", "application/json")
				.body("{\"error\":\"unauthorized\",\"message\":\"Proxy session expired\"}");
		})
		.await;
	let client = build_client(&server, Credentials::proxy())?;
	let envelope = client.referral_stats().await;

	assert!(!envelope.success);
	assert_eq!(envelope.failure_text(), Some("Proxy session expired"));
	assert_eq!(envelope.failure_code(), None);

	stats_mock.assert_calls_async(1).await;

	Ok(())
}

#[tokio::test]
async fn identify_user_posts_camel_case_profile() -> Result<()> {
	let server = MockServer::start_async().await;
	let identify_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/users/identify")
				.body("{\"externalId\":\"u-42\",\"email\":\"dev@growth.example\"}");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"success\":true,\"data\":{\"id\":\"u-42\"}}");
		})
		.await;
	let client = build_client(&server, Credentials::private_key("sk_live_1"))?;
	let profile = growth_client::client::UserProfile {
		email: Some("dev@growth.example".into()),
		..growth_client::client::UserProfile::new("u-42")
	};
	let envelope = client.identify_user(&profile).await;

	assert!(envelope.success);

	identify_mock.assert_calls_async(1).await;

	Ok(())
}
