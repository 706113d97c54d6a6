#![cfg(feature = "reqwest")]

// std
use std::{
	env, process,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
};
// crates.io
use httpmock::prelude::*;
use serde_json::json;
use time::OffsetDateTime;
use url::Url;
// self
use auth_gateway::{
	auth::CredentialPair,
	config::GatewayConfig,
	error::Error,
	gateway::{Gateway, LoginRequest, ReqwestGateway},
	http::ApiRequest,
	renewal::{RenewalFailure, RenewalPhase},
	store::{CredentialStore, FileStore, MemoryStore},
};

fn build_gateway(server: &MockServer, store: Arc<dyn CredentialStore>) -> ReqwestGateway {
	let base_url =
		Url::parse(&server.url("/api")).expect("Mock server base URL should parse successfully.");
	let config =
		GatewayConfig::builder(base_url).build().expect("Gateway configuration should build.");

	Gateway::new(config, store).expect("Reqwest gateway should build.")
}

#[tokio::test]
async fn login_then_renew_on_unauthorized() {
	let server = MockServer::start_async().await;
	let store = Arc::new(MemoryStore::default());
	let gateway = build_gateway(&server, store.clone());
	let login = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/auth/login")
				.json_body(json!({ "email": "ops@example.com", "password": "hunter2" }));
			then.status(201).header("content-type", "application/json").body(
				r#"{"accessToken":"access-1","refreshToken":"refresh-1","user":{"id":7}}"#,
			);
		})
		.await;
	let stale = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/orders").header("authorization", "Bearer access-1");
			then.status(401).body(r#"{"statusCode":401,"message":"Unauthorized"}"#);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/auth/refresh")
				.json_body(json!({ "refreshToken": "refresh-1" }));
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"accessToken":"access-2","refreshToken":"refresh-2"}"#);
		})
		.await;
	let fresh = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/orders")
				.query_param("page", "2")
				.header("authorization", "Bearer access-2");
			then.status(200).header("content-type", "application/json").body(r#"[{"id":1}]"#);
		})
		.await;
	let pair = gateway
		.login(&LoginRequest::new("ops@example.com", "hunter2"))
		.await
		.expect("Login should succeed.");

	assert_eq!(pair.access_token.expose(), "access-1");

	let orders = gateway
		.request_json::<serde_json::Value>(ApiRequest::get("/orders").query("page", 2))
		.await
		.expect("Request should succeed after renewal.");

	assert_eq!(orders, json!([{ "id": 1 }]));

	login.assert_async().await;
	stale.assert_async().await;
	refresh.assert_async().await;
	fresh.assert_async().await;

	assert_eq!(store.access_token().as_deref(), Some("access-2"));
	assert_eq!(gateway.renewal_metrics().attempts(), 1);
	assert_eq!(gateway.renewal_phase(), RenewalPhase::Idle);
}

#[tokio::test]
async fn concurrent_unauthorized_requests_refresh_once() {
	let server = MockServer::start_async().await;
	let pair = CredentialPair::new("access-old").with_refresh_token("refresh-old");
	let store = Arc::new(MemoryStore::with_pair(pair));
	let gateway = build_gateway(&server, store.clone());
	let stale = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/products").header("authorization", "Bearer access-old");
			then.status(401);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/refresh");
			then.status(200)
				.header("content-type", "application/json")
				.delay(std::time::Duration::from_millis(200))
				.body(r#"{"accessToken":"access-new"}"#);
		})
		.await;
	let fresh = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/products").header("authorization", "Bearer access-new");
			then.status(200).body(r#"{"ok":true}"#);
		})
		.await;
	let (first, second, third) = tokio::join!(
		gateway.request(ApiRequest::get("/products")),
		gateway.request(ApiRequest::get("/products")),
		gateway.request(ApiRequest::get("/products")),
	);

	for response in [first, second, third] {
		assert_eq!(response.expect("Every caller should succeed.").status, 200);
	}

	refresh.assert_calls_async(1).await;
	stale.assert_calls_async(3).await;
	fresh.assert_calls_async(3).await;

	let stored = store
		.get()
		.expect("Memory store reads succeed.")
		.expect("Renewed pair should be stored.");

	assert_eq!(stored.access_token.expose(), "access-new");
	assert_eq!(stored.refresh_token.as_ref().map(|secret| secret.expose()), Some("refresh-old"));
}

#[tokio::test]
async fn rejected_refresh_clears_persisted_session() {
	let server = MockServer::start_async().await;
	let path = env::temp_dir().join(format!(
		"auth_gateway_it_{}_{}.json",
		process::id(),
		OffsetDateTime::now_utc().unix_timestamp_nanos(),
	));
	let store = Arc::new(FileStore::open(&path).expect("File store should open."));

	store
		.set(CredentialPair::new("access-old").with_refresh_token("refresh-revoked"))
		.expect("Seeding the file store should succeed.");

	let invalidations = Arc::new(AtomicUsize::new(0));
	let seen = invalidations.clone();
	let gateway = build_gateway(&server, store.clone()).with_session_listener(Arc::new(
		move |failure: &RenewalFailure| {
			assert_eq!(failure, &RenewalFailure::Rejected { status: 401 });

			seen.fetch_add(1, Ordering::SeqCst);
		},
	));
	let stale = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/users/me");
			then.status(401);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/refresh");
			then.status(401).body(r#"{"message":"Invalid refresh token"}"#);
		})
		.await;
	let error = gateway
		.request(ApiRequest::get("/users/me"))
		.await
		.expect_err("Rejected refresh must fail the request.");

	assert!(matches!(error, Error::RenewalFailed(RenewalFailure::Rejected { status: 401 })));
	assert!(error.requires_login());

	stale.assert_calls_async(1).await;
	refresh.assert_calls_async(1).await;

	assert_eq!(invalidations.load(Ordering::SeqCst), 1);
	assert!(store.get().expect("File store reads succeed.").is_none());
	assert!(!path.exists());
}

#[tokio::test]
async fn login_with_wrong_password_is_invalid_credentials() {
	let server = MockServer::start_async().await;
	let store = Arc::new(MemoryStore::default());
	let gateway = build_gateway(&server, store.clone());
	let login = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/login");
			then.status(401).body(r#"{"message":"Invalid credentials"}"#);
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/refresh");
			then.status(200).body(r#"{"accessToken":"never"}"#);
		})
		.await;
	let error = gateway
		.login(&LoginRequest::new("ops@example.com", "wrong"))
		.await
		.expect_err("Wrong password must fail.");

	assert!(matches!(error, Error::InvalidCredentials));

	login.assert_async().await;
	refresh.assert_calls_async(0).await;

	assert!(store.access_token().is_none());
}

#[tokio::test]
async fn logout_is_idempotent_and_public_routes_stay_reachable() {
	let server = MockServer::start_async().await;
	let pair = CredentialPair::new("access-1").with_refresh_token("refresh-1");
	let store = Arc::new(MemoryStore::with_pair(pair));
	let gateway = build_gateway(&server, store.clone());
	let anonymous = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/catalog");
			then.status(200).body("[]");
		})
		.await;

	gateway.logout().expect("Logout should succeed.");
	gateway.logout().expect("Logout should be idempotent.");

	assert!(gateway.session().expect("Memory store reads succeed.").is_none());

	let response = gateway
		.request(ApiRequest::get("/catalog").skip_auth())
		.await
		.expect("Public catalog should be reachable.");

	assert_eq!(response.status, 200);

	anonymous.assert_async().await;
}
