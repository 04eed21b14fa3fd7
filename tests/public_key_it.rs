#![cfg(feature = "reqwest")]

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::Value;
// self
use growth_client::{
	_preludet::*,
	auth::{Credentials, Token},
	client::GrowthClient,
	envelope::FailureCode,
	http::{HttpMethod, ReqwestTransport},
	store::{MemoryStorage, TokenStore},
};

const PUBLIC_KEY: &str = "pk_test_123";

fn build_client(server: &MockServer, storage: Arc<MemoryStorage>) -> Result<GrowthClient> {
	let transport = ReqwestTransport::new()?;

	Ok(build_test_client(
		Credentials::public_key(PUBLIC_KEY),
		&server.base_url(),
		Arc::new(transport),
		storage,
	))
}

fn token_body(token: &str) -> String {
	let response = token_response(token, Duration::seconds(60));

	String::from_utf8(response.body).expect("Token fixture should be UTF-8.")
}

async fn seed_token(storage: &Arc<MemoryStorage>, token: &str) {
	let store = TokenStore::new(storage.clone(), TokenStore::DEFAULT_KEY);

	store.save(&Token::new(token, OffsetDateTime::now_utc() + Duration::hours(1))).await;
}

#[tokio::test]
async fn current_user_uses_bearer_token_on_public_route() -> Result<()> {
	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/public/auth/token")
				.header("content-type", "application/json");
			then.status(200).header("content-type", "application/json").body(token_body("abc"));
		})
		.await;
	let user_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/public/users/me").header("authorization", "Bearer abc");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"success\":true,\"data\":{\"id\":\"u-1\"}}");
		})
		.await;
	let client = build_client(&server, Arc::new(MemoryStorage::default()))?;
	let envelope = client.current_user().await;

	assert!(envelope.success);
	assert_eq!(envelope.data, Some(serde_json::json!({ "id": "u-1" })));

	token_mock.assert_calls_async(1).await;
	user_mock.assert_calls_async(1).await;

	Ok(())
}

#[tokio::test]
async fn single_unauthorized_is_recovered_invisibly() -> Result<()> {
	let server = MockServer::start_async().await;
	let storage = Arc::new(MemoryStorage::default());

	seed_token(&storage, "stale").await;

	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/public/auth/token");
			then.status(200).header("content-type", "application/json").body(token_body("fresh"));
		})
		.await;
	let stale_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/public/credits/balance")
				.header("authorization", "Bearer stale");
			then.status(401).body("{\"error\":\"token expired\"}");
		})
		.await;
	let fresh_mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/public/credits/balance")
				.header("authorization", "Bearer fresh");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"success\":true,\"data\":{\"balance\":40}}");
		})
		.await;
	let client = build_client(&server, storage.clone())?;
	let envelope = client.credit_balance().await;

	assert!(envelope.success);
	assert_eq!(envelope.data, Some(serde_json::json!({ "balance": 40 })));

	token_mock.assert_calls_async(1).await;
	stale_mock.assert_calls_async(1).await;
	fresh_mock.assert_calls_async(1).await;

	let persisted = TokenStore::new(storage, TokenStore::DEFAULT_KEY)
		.load()
		.await
		.expect("Recovered token should be persisted.");

	assert_eq!(persisted.value.expose(), "fresh");

	Ok(())
}

#[tokio::test]
async fn second_unauthorized_is_surfaced_without_another_recovery() -> Result<()> {
	let server = MockServer::start_async().await;
	let storage = Arc::new(MemoryStorage::default());

	seed_token(&storage, "stale").await;

	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/public/auth/token");
			then.status(200).header("content-type", "application/json").body(token_body("fresh"));
		})
		.await;
	let rewards_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/public/rewards");
			then.status(401).body("{\"error\":\"unauthorized\"}");
		})
		.await;
	let client = build_client(&server, storage)?;
	let envelope = client.rewards().await;

	assert!(!envelope.success);
	assert_eq!(envelope.failure_code(), Some(FailureCode::AuthFailed));

	token_mock.assert_calls_async(1).await;
	rewards_mock.assert_calls_async(2).await;

	Ok(())
}

#[tokio::test]
async fn business_rejection_on_credit_operation_is_not_retried() -> Result<()> {
	let server = MockServer::start_async().await;
	let storage = Arc::new(MemoryStorage::default());

	seed_token(&storage, "abc").await;

	let spend_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/public/credits/spend").header("authorization", "Bearer abc");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"success\":false,\"error\":\"insufficient credits\"}");
		})
		.await;
	let client = build_client(&server, storage)?;
	let started = std::time::Instant::now();
	let envelope = client
		.spend_credits(&growth_client::client::SpendCredits {
			amount: 500,
			reason: "premium-theme".into(),
			metadata: None,
		})
		.await;

	assert!(!envelope.success);
	assert_eq!(envelope.failure_text(), Some("insufficient credits"));
	assert!(started.elapsed() < std::time::Duration::from_millis(900));

	spend_mock.assert_calls_async(1).await;

	Ok(())
}

#[tokio::test]
async fn non_2xx_business_failure_keeps_server_message() -> Result<()> {
	let server = MockServer::start_async().await;
	let storage = Arc::new(MemoryStorage::default());

	seed_token(&storage, "abc").await;

	let apply_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/public/referrals/apply");
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_code\",\"message\":\"Referral code already used\"}");
		})
		.await;
	let client = build_client(&server, storage)?;
	let envelope = client.apply_referral_code("FRIEND-42").await;

	assert!(!envelope.success);
	assert_eq!(envelope.failure_text(), Some("Referral code already used"));

	apply_mock.assert_calls_async(1).await;

	Ok(())
}

#[tokio::test]
async fn unknown_paths_pass_through_unchanged() -> Result<()> {
	let server = MockServer::start_async().await;
	let storage = Arc::new(MemoryStorage::default());

	seed_token(&storage, "abc").await;

	let campaign_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/campaigns/active").header("authorization", "Bearer abc");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"data\":[{\"id\":\"spring\"}]}");
		})
		.await;
	let client = build_client(&server, storage)?;
	let envelope = client.request::<Value, ()>(HttpMethod::Get, "/api/campaigns/active", None).await;

	assert!(envelope.success);

	campaign_mock.assert_calls_async(1).await;

	Ok(())
}

#[tokio::test]
async fn persisted_token_is_shared_between_clients() -> Result<()> {
	let server = MockServer::start_async().await;
	let storage = Arc::new(MemoryStorage::default());
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/public/auth/token");
			then.status(200).header("content-type", "application/json").body(token_body("shared"));
		})
		.await;
	let first = build_client(&server, storage.clone())?;

	assert!(first.ensure_valid_token().await);

	drop(first);

	let second = build_client(&server, storage)?;

	assert!(second.ensure_valid_token().await);

	token_mock.assert_calls_async(1).await;

	Ok(())
}
