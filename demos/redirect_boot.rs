//! Demonstrates a redirect sign-in that completes on the "next page load": the preference and
//! token survive in a file-backed durable tier, and the result is replayed to a late listener.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use parking_lot::Mutex;
use time::Duration;
// self
use delegated_auth::{
	auth::{Identity, ScopeSet, UserId},
	coordinator::{Coordinator, SignInOutcome},
	flows::redirect_only,
	provider::{
		IdentityProvider, ProviderCredential, ProviderError, ProviderFuture, ProviderSignIn,
	},
	schedule::ManualTimer,
	store::{FileStorage, MemoryStorage, TokenStore},
};

/// Provider whose redirect result appears once the page is "reloaded".
#[derive(Default)]
struct RedirectProvider {
	navigated: Mutex<bool>,
}
impl IdentityProvider for RedirectProvider {
	fn sign_in_with_popup<'a>(&'a self, _: &'a ScopeSet) -> ProviderFuture<'a, ProviderSignIn> {
		Box::pin(async { Err(ProviderError::new("auth/popup-blocked", "No pop-ups here.")) })
	}

	fn sign_in_with_redirect<'a>(&'a self, _: &'a ScopeSet) -> ProviderFuture<'a, ()> {
		*self.navigated.lock() = true;

		Box::pin(async { Ok(()) })
	}

	fn pending_redirect_result(&self) -> ProviderFuture<'_, Option<ProviderSignIn>> {
		let navigated = std::mem::take(&mut *self.navigated.lock());

		Box::pin(async move {
			if !navigated {
				return Ok(None);
			}

			let user = UserId::new("redirect-user")
				.map_err(|e| ProviderError::new("auth/invalid-user-token", e.to_string()))?;

			Ok(Some(ProviderSignIn {
				identity: Identity::new(user, "redirect@example.com"),
				credential: ProviderCredential::new("redirect-access")
					.with_expires_in(Duration::minutes(45)),
			}))
		})
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

fn page_load(provider: &Arc<RedirectProvider>, store: &TokenStore) -> Coordinator {
	Coordinator::builder(provider.clone(), Arc::new(ManualTimer::default()))
		.store(store.clone())
		.capability(redirect_only())
		.build()
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let path = std::env::temp_dir().join("delegated-auth-redirect-demo.json");
	let store =
		TokenStore::new(Arc::new(FileStorage::open(&path)?), Arc::new(MemoryStorage::default()));
	let provider = Arc::new(RedirectProvider::default());
	let first = page_load(&provider, &store);

	first.on_session_restored(None).await;
	first.boot().await?;

	if let SignInOutcome::Redirecting = first.sign_in(true).await? {
		println!("Navigating to the provider.");
	}

	drop(first);

	// The browser comes back from the provider.
	let second = page_load(&provider, &store);
	let identity = second.boot().await?;

	println!("Redirect check returned {identity:?}.");

	second.on_session_restored(identity).await;
	second.wait_for_auth().await;
	second.on_redirect_sign_in(|identity| println!("Welcome back, {}.", identity.label()));

	println!("Token persisted in {}: {:?}.", path.display(), store.load().await.map(|p| p.tier));

	second.sign_out().await;

	Ok(())
}
