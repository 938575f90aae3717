//! Demonstrates a pop-up sign-in whose delegated token is introspected over HTTP, then used to
//! sign a spreadsheet API request, with the expiry timer driven by a manual clock.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use time::Duration;
use url::Url;
// self
use delegated_auth::{
	auth::{Identity, ScopeSet, UserId},
	coordinator::Coordinator,
	ext::{BearerSigner, RequestSignerExt},
	http::ReqwestHttpClient,
	introspect::TokenInfoClient,
	provider::{
		AuthDescriptor, IdentityProvider, ProviderCredential, ProviderError, ProviderFuture,
		ProviderSignIn, SPREADSHEETS_SCOPE,
	},
	reqwest::Client,
	schedule::ManualTimer,
};

struct DemoProvider;
impl IdentityProvider for DemoProvider {
	fn sign_in_with_popup<'a>(&'a self, _: &'a ScopeSet) -> ProviderFuture<'a, ProviderSignIn> {
		Box::pin(async {
			let user = UserId::new("demo-user")
				.map_err(|e| ProviderError::new("auth/invalid-user-token", e.to_string()))?;

			Ok(ProviderSignIn {
				identity: Identity::new(user, "demo@example.com").with_display_name("Demo"),
				credential: ProviderCredential::new("demo-access")
					.with_expires_in(Duration::hours(1)),
			})
		})
	}

	fn sign_in_with_redirect<'a>(&'a self, _: &'a ScopeSet) -> ProviderFuture<'a, ()> {
		Box::pin(async { Ok(()) })
	}

	fn pending_redirect_result(&self) -> ProviderFuture<'_, Option<ProviderSignIn>> {
		Box::pin(async { Ok(None) })
	}

	fn silent_credential<'a>(
		&'a self,
		_: &'a ScopeSet,
	) -> ProviderFuture<'a, Option<ProviderCredential>> {
		Box::pin(async { Ok(None) })
	}

	fn sign_out(&self) -> ProviderFuture<'_, ()> {
		Box::pin(async { Ok(()) })
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let tokeninfo_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/tokeninfo").query_param("access_token", "demo-access");
			then.status(200).header("content-type", "application/json").body(format!(
				"{{\"scope\":\"openid {SPREADSHEETS_SCOPE}\",\"expires_in\":\"1800\"}}"
			));
		})
		.await;
	let sheets_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v4/spreadsheets/demo").header("authorization", "Bearer demo-access");
			then.status(200).body("{\"spreadsheetId\":\"demo\"}");
		})
		.await;
	let descriptor = AuthDescriptor::builder().require_scope(SPREADSHEETS_SCOPE).build()?;
	let inspector = <TokenInfoClient<ReqwestHttpClient>>::new(
		ReqwestHttpClient::default(),
		Url::parse(&server.url("/tokeninfo"))?,
	);
	let timer = ManualTimer::default();
	let coordinator = Coordinator::builder(Arc::new(DemoProvider), Arc::new(timer.clone()))
		.descriptor(descriptor)
		.inspector(Arc::new(inspector))
		.build();

	coordinator.on_session_restored(None).await;
	coordinator.boot().await?;
	coordinator.wait_for_auth().await;

	println!("Ready; signed in: {}.", coordinator.is_authenticated());

	let outcome = coordinator.sign_in(true).await?;

	println!("Sign-in outcome: {outcome:?}.");
	println!("Refresh flag armed for {:?}.", coordinator.scheduled_refresh_in());
	tokeninfo_mock.assert_async().await;

	if let Some(token) = coordinator.access_token().await {
		let request =
			BearerSigner.attach_token(Client::new().get(server.url("/v4/spreadsheets/demo")), &token)?;
		let body = request.send().await?.text().await?;

		println!("Spreadsheet API answered: {body}.");
		sheets_mock.assert_async().await;
	}

	timer.advance(Duration::minutes(25));

	println!(
		"After 25 minutes: state = {:?}, refresh needed = {}.",
		coordinator.state(),
		coordinator.is_token_refresh_needed()
	);

	coordinator.sign_out().await;

	println!("Signed out: {:?}.", coordinator.state());

	Ok(())
}
