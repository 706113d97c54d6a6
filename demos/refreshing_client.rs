//! Demonstrates logging in through the gateway with the default reqwest transport, then
//! letting it renew the access token transparently when the backend starts rejecting it.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use auth_gateway::{
	config::GatewayConfig,
	gateway::{Gateway, LoginRequest},
	http::ApiRequest,
	renewal::RenewalFailure,
	store::{CredentialStore, MemoryStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let login_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/login");
			then.status(201)
				.header("content-type", "application/json")
				.body(r#"{"accessToken":"demo-access-1","refreshToken":"demo-refresh-1"}"#);
		})
		.await;
	let expired_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/orders").header("authorization", "Bearer demo-access-1");
			then.status(401);
		})
		.await;
	let refresh_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/auth/refresh");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"accessToken":"demo-access-2","refreshToken":"demo-refresh-2"}"#);
		})
		.await;
	let orders_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/orders").header("authorization", "Bearer demo-access-2");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"[{"id":1,"total":4200}]"#);
		})
		.await;
	let store: Arc<dyn CredentialStore> = Arc::new(MemoryStore::default());
	let config = GatewayConfig::builder(Url::parse(&server.url("/api"))?).build()?;
	let gateway = Gateway::new(config, store)?.with_session_listener(Arc::new(
		|failure: &RenewalFailure| eprintln!("Session ended, redirecting to login: {failure}."),
	));

	gateway.login(&LoginRequest::new("demo@example.com", "demo-password")).await?;

	let orders = gateway
		.request_json::<serde_json::Value>(ApiRequest::get("/orders"))
		.await?;

	println!("Orders fetched after transparent renewal: {orders}.");
	println!("Renewal endpoint calls: {}.", gateway.renewal_metrics().attempts());

	login_mock.assert_async().await;
	expired_mock.assert_async().await;
	refresh_mock.assert_async().await;
	orders_mock.assert_async().await;

	Ok(())
}
