#![cfg(feature = "reqwest")]

mod common;

// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
use time::Duration;
use url::Url;
// self
use common::*;
use delegated_auth::{
	auth::TokenSecret,
	coordinator::SessionState,
	error::{Error, TransportError},
	http::ReqwestHttpClient,
	introspect::{TokenInfoClient, TokenInspector},
	store::TokenStore,
};

fn client(server: &MockServer) -> TokenInfoClient<ReqwestHttpClient> {
	let endpoint =
		Url::parse(&server.url("/tokeninfo")).expect("Mock tokeninfo endpoint should parse.");

	TokenInfoClient::new(ReqwestHttpClient::default(), endpoint)
}

#[tokio::test]
async fn tokeninfo_reports_scopes_and_string_lifetime() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/tokeninfo").query_param("access_token", "tok-1");
			then.status(200).header("content-type", "application/json").body(format!(
				r#"{{"aud":"client","scope":"openid {SHEETS}","expires_in":"3599"}}"#
			));
		})
		.await;
	let info = client(&server)
		.inspect(&TokenSecret::new("tok-1"))
		.await
		.expect("Tokeninfo lookup should succeed.");

	mock.assert_async().await;

	assert_eq!(info.expires_in, Some(Duration::seconds(3599)));
	assert!(info.scopes.contains(SHEETS));
	assert!(info.scopes.contains("openid"));
}

#[tokio::test]
async fn tokeninfo_rejections_and_outages_are_distinguished() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/tokeninfo").query_param("access_token", "tok-bad");
			then.status(400)
				.header("content-type", "application/json")
				.body(r#"{"error":"invalid_token","error_description":"Invalid Value"}"#);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/tokeninfo").query_param("access_token", "tok-busy");
			then.status(503).body("unavailable");
		})
		.await;

	let client = client(&server);
	let err = client
		.inspect(&TokenSecret::new("tok-bad"))
		.await
		.expect_err("A 400 response must reject the token.");

	assert!(matches!(err, Error::TokenRejected { ref reason } if reason == "Invalid Value"));

	let err = client
		.inspect(&TokenSecret::new("tok-busy"))
		.await
		.expect_err("A 503 response must fail.");

	assert!(matches!(err, Error::Network(TransportError::Upstream { status: Some(503), .. })));
}

#[tokio::test]
async fn coordinator_discards_tokens_missing_the_spreadsheet_scope() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/tokeninfo");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"scope":"openid email","expires_in":3599}"#);
		})
		.await;

	let provider = ScriptedProvider::new();
	let inspector = Arc::new(client(&server));
	let (coordinator, _timer, store) =
		coordinator_with(&provider, TokenStore::in_memory(), |builder| builder.inspector(inspector));

	boot_as(&coordinator, None).await;
	provider.push_popup(Ok(signed_in("alice", "tok-1", 3600)));

	let err = coordinator.sign_in(true).await.expect_err("Missing scopes must surface.");

	assert!(matches!(err, Error::ScopeInsufficient { .. }));
	assert_eq!(coordinator.state(), SessionState::TokenAbsent);
	assert_eq!(store.load().await, None);
}
