//! Shared fixtures for coordinator integration tests.

#![allow(dead_code)]

// std
use std::{
	collections::VecDeque,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration as StdDuration,
};
// crates.io
use parking_lot::Mutex;
use time::{Duration, OffsetDateTime};
// self
use delegated_auth::{
	auth::{Identity, ScopeSet, TokenSecret, UserId},
	coordinator::Coordinator,
	error::Result,
	introspect::{InspectFuture, TokenInfo, TokenInspector},
	provider::{
		AuthDescriptor, IdentityProvider, ProviderCredential, ProviderError, ProviderFuture,
		ProviderSignIn,
	},
	schedule::ManualTimer,
	store::{StorageTier, TokenStore},
};

pub const SHEETS: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Call counters for [`ScriptedProvider`].
#[derive(Debug, Default)]
pub struct Calls {
	pub popup: AtomicUsize,
	pub redirect: AtomicUsize,
	pub pending: AtomicUsize,
	pub silent: AtomicUsize,
	pub sign_out: AtomicUsize,
}
impl Calls {
	pub fn get(counter: &AtomicUsize) -> usize {
		counter.load(Ordering::SeqCst)
	}
}

/// Identity provider that replays queued responses.
///
/// Empty popup/silent queues answer with a network error so unexpected calls fail loudly.
#[derive(Default)]
pub struct ScriptedProvider {
	popup: Mutex<VecDeque<Result<ProviderSignIn, ProviderError>>>,
	redirect: Mutex<VecDeque<Result<(), ProviderError>>>,
	pending: Mutex<Option<Result<Option<ProviderSignIn>, ProviderError>>>,
	silent: Mutex<VecDeque<Result<Option<ProviderCredential>, ProviderError>>>,
	sign_out_error: Mutex<Option<ProviderError>>,
	delay: Mutex<Option<StdDuration>>,
	pub calls: Calls,
}
impl ScriptedProvider {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn push_popup(&self, result: Result<ProviderSignIn, ProviderError>) {
		self.popup.lock().push_back(result);
	}

	pub fn push_redirect(&self, result: Result<(), ProviderError>) {
		self.redirect.lock().push_back(result);
	}

	pub fn set_pending(&self, result: Result<Option<ProviderSignIn>, ProviderError>) {
		*self.pending.lock() = Some(result);
	}

	pub fn push_silent(&self, result: Result<Option<ProviderCredential>, ProviderError>) {
		self.silent.lock().push_back(result);
	}

	pub fn fail_sign_out(&self, error: ProviderError) {
		*self.sign_out_error.lock() = Some(error);
	}

	/// Makes every provider call sleep first, so callers overlap.
	pub fn set_delay(&self, delay: StdDuration) {
		*self.delay.lock() = Some(delay);
	}

	fn respond<'a, T>(&'a self, result: Result<T, ProviderError>) -> ProviderFuture<'a, T>
	where
		T: 'a + Send,
	{
		let delay = *self.delay.lock();

		Box::pin(async move {
			if let Some(delay) = delay {
				tokio::time::sleep(delay).await;
			}

			result
		})
	}
}
impl IdentityProvider for ScriptedProvider {
	fn sign_in_with_popup<'a>(&'a self, _: &'a ScopeSet) -> ProviderFuture<'a, ProviderSignIn> {
		self.calls.popup.fetch_add(1, Ordering::SeqCst);

		let next = self.popup.lock().pop_front();

		self.respond(next.unwrap_or_else(|| Err(unscripted())))
	}

	fn sign_in_with_redirect<'a>(&'a self, _: &'a ScopeSet) -> ProviderFuture<'a, ()> {
		self.calls.redirect.fetch_add(1, Ordering::SeqCst);

		let next = self.redirect.lock().pop_front();

		self.respond(next.unwrap_or(Ok(())))
	}

	fn pending_redirect_result(&self) -> ProviderFuture<'_, Option<ProviderSignIn>> {
		self.calls.pending.fetch_add(1, Ordering::SeqCst);

		let next = self.pending.lock().take();

		self.respond(next.unwrap_or(Ok(None)))
	}

	fn silent_credential<'a>(
		&'a self,
		_: &'a ScopeSet,
	) -> ProviderFuture<'a, Option<ProviderCredential>> {
		self.calls.silent.fetch_add(1, Ordering::SeqCst);

		let next = self.silent.lock().pop_front();

		self.respond(next.unwrap_or_else(|| Err(unscripted())))
	}

	fn sign_out(&self) -> ProviderFuture<'_, ()> {
		self.calls.sign_out.fetch_add(1, Ordering::SeqCst);

		let next = self.sign_out_error.lock().take();

		self.respond(next.map_or(Ok(()), Err))
	}
}

fn unscripted() -> ProviderError {
	ProviderError::new("auth/network-request-failed", "No scripted response.")
}

type InspectFn = dyn Fn(&TokenSecret) -> Result<TokenInfo> + Send + Sync;

/// Inspector backed by a closure.
pub struct FnInspector(Box<InspectFn>);
impl FnInspector {
	pub fn new(f: impl Fn(&TokenSecret) -> Result<TokenInfo> + Send + Sync + 'static) -> Arc<Self> {
		Arc::new(Self(Box::new(f)))
	}
}
impl TokenInspector for FnInspector {
	fn inspect<'a>(&'a self, token: &'a TokenSecret) -> InspectFuture<'a> {
		let result = (self.0)(token);

		Box::pin(async move { result })
	}
}

pub fn identity(id: &str) -> Identity {
	let user = UserId::new(id).expect("User identifier fixture should be valid.");

	Identity::new(user, format!("{id}@example.com"))
}

pub fn credential(token: &str, expires_in_secs: i64) -> ProviderCredential {
	ProviderCredential::new(token).with_expires_in(Duration::seconds(expires_in_secs))
}

pub fn signed_in(id: &str, token: &str, expires_in_secs: i64) -> ProviderSignIn {
	ProviderSignIn { identity: identity(id), credential: credential(token, expires_in_secs) }
}

pub fn scopes(values: &[&str]) -> ScopeSet {
	ScopeSet::new(values.iter().copied()).expect("Scope fixture should be valid.")
}

pub fn descriptor() -> AuthDescriptor {
	AuthDescriptor::builder()
		.require_scope(SHEETS)
		.build()
		.expect("Descriptor fixture should validate.")
}

/// Coordinator with in-memory tiers and a manual clock.
pub fn coordinator(provider: &Arc<ScriptedProvider>) -> (Coordinator, ManualTimer, TokenStore) {
	coordinator_with(provider, TokenStore::in_memory(), |builder| builder)
}

pub fn coordinator_with(
	provider: &Arc<ScriptedProvider>,
	store: TokenStore,
	customize: impl FnOnce(
		delegated_auth::coordinator::CoordinatorBuilder,
	) -> delegated_auth::coordinator::CoordinatorBuilder,
) -> (Coordinator, ManualTimer, TokenStore) {
	let timer = ManualTimer::default();
	let builder = Coordinator::builder(provider.clone(), Arc::new(timer.clone()))
		.descriptor(descriptor())
		.store(store.clone());
	let coordinator = customize(builder).build();

	(coordinator, timer, store)
}

/// Opens the gate with `identity` restored and no pending redirect.
pub async fn boot_as(coordinator: &Coordinator, identity: Option<Identity>) {
	coordinator.on_session_restored(identity).await;
	coordinator.boot().await.expect("Boot without a pending redirect should succeed.");
}

/// Persists a token that expired a minute ago.
pub async fn seed_expired(store: &TokenStore, token: &str, tier: StorageTier) {
	store
		.save(&TokenSecret::new(token), tier, OffsetDateTime::now_utc() - Duration::minutes(1))
		.await
		.expect("Seeding an expired token should succeed.");
}

pub fn expose(token: Option<TokenSecret>) -> Option<String> {
	token.map(|token| token.expose().to_owned())
}
