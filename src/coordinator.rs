//! Session coordinator.
//!
//! [`Coordinator`] owns the two credentials a signed-in user holds (the identity session and
//! the delegated token) and is the only writer of either. Every mutation (sign-in ingestion,
//! sign-out, boot reconciliation, silent refresh) serializes through one operation lock, and
//! every freshly acquired token reaches memory, storage, and the expiry scheduler through one
//! ingestion path, whichever flow produced it.
//!
//! Boot is driven by two host callbacks that feed the [`ReadinessGate`]:
//! [`Coordinator::on_session_restored`] and [`Coordinator::complete_redirect_check`] (or
//! [`Coordinator::boot`], which also restores the persisted token first).

mod boot;
mod metrics;
mod refresh;

pub use metrics::RefreshMetrics;

// std
use std::sync::atomic::{AtomicBool, Ordering};
// self
use crate::{
	_prelude::*,
	auth::{DelegatedToken, Identity, TokenSecret},
	error::ConfigError,
	ext::{AccessTokenSource, TokenSourceFuture},
	flows::{AcquiredSession, FlowCapability, FlowResult, SignInFlow},
	gate::{Delivery, Mailbox, ReadinessGate, ReadinessState, WaitForAuth},
	introspect::TokenInspector,
	obs::{self, AuthOp, OpOutcome, OpSpan},
	provider::{AuthDescriptor, IdentityProvider, ProviderStrategy},
	schedule::{ExpiryScheduler, TimerDriver},
	store::{StorageTier, TokenStore},
};

/// Coarse view of the session for rendering decisions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionState {
	/// No identity session.
	SignedOut,
	/// Signed in, but no delegated token is held.
	TokenAbsent,
	/// Signed in with a token that has expired or was flagged.
	RefreshNeeded,
	/// Signed in with a usable token.
	TokenValid,
}

/// Result of [`Coordinator::sign_in`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignInOutcome {
	/// Consent completed in-process and the session is live.
	SignedIn(Identity),
	/// The host is navigating to the provider; the result arrives on the next load.
	Redirecting,
}

#[derive(Debug, Default)]
struct Session {
	identity: Option<Identity>,
	token: Option<DelegatedToken>,
	tier: Option<StorageTier>,
	// Bumped on every sign-in and sign-out so in-flight refreshes can detect a stale session.
	epoch: u64,
}

/// Owns the session and coordinates sign-in, sign-out, boot, and silent refresh.
pub struct Coordinator {
	descriptor: AuthDescriptor,
	flow: SignInFlow,
	inspector: Option<Arc<dyn TokenInspector>>,
	store: TokenStore,
	scheduler: ExpiryScheduler,
	gate: ReadinessGate,
	redirect_mailbox: Mailbox<Identity>,
	session: RwLock<Session>,
	op_lock: AsyncMutex<()>,
	refresh_guard: AsyncMutex<()>,
	sign_in_in_flight: AtomicBool,
	refresh_metrics: Arc<RefreshMetrics>,
}
impl Coordinator {
	/// Starts building a coordinator around `provider`, using `timer` for expiry scheduling.
	pub fn builder(
		provider: Arc<dyn IdentityProvider>,
		timer: Arc<dyn TimerDriver>,
	) -> CoordinatorBuilder {
		CoordinatorBuilder::new(provider, timer)
	}

	/// Future resolving once both boot inputs have arrived. Never fails.
	pub fn wait_for_auth(&self) -> WaitForAuth {
		self.gate.wait()
	}

	/// Snapshot of the boot join.
	pub fn readiness(&self) -> ReadinessState {
		self.gate.state()
	}

	/// Returns true once both boot inputs have arrived.
	pub fn is_ready(&self) -> bool {
		self.gate.is_open()
	}

	/// Currently signed-in identity.
	pub fn identity(&self) -> Option<Identity> {
		self.session.read().identity.clone()
	}

	/// Returns true while an identity session exists.
	pub fn is_authenticated(&self) -> bool {
		self.session.read().identity.is_some()
	}

	/// Returns true when the flag is raised, the token has expired, or a signed-in user holds
	/// no token at all.
	pub fn is_token_refresh_needed(&self) -> bool {
		matches!(self.state(), SessionState::RefreshNeeded | SessionState::TokenAbsent)
	}

	/// Coarse session state.
	pub fn state(&self) -> SessionState {
		let session = self.session.read();

		if session.identity.is_none() {
			return SessionState::SignedOut;
		}

		match session.token.as_ref() {
			None => SessionState::TokenAbsent,
			Some(token)
				if self.scheduler.refresh_needed()
					|| token.is_expired_at(OffsetDateTime::now_utc()) =>
				SessionState::RefreshNeeded,
			Some(_) => SessionState::TokenValid,
		}
	}

	/// Raises the refresh flag, e.g. after the spreadsheet API rejected the current token.
	pub fn mark_refresh_needed(&self) {
		self.scheduler.mark_refresh_needed();
	}

	/// Delay the expiry timer is currently armed for.
	pub fn scheduled_refresh_in(&self) -> Option<Duration> {
		self.scheduler.armed_for()
	}

	/// Registers the consumer notified when a redirect sign-in completes.
	///
	/// A result that arrived before registration is delivered immediately.
	pub fn on_redirect_sign_in(
		&self,
		consumer: impl Fn(Identity) + Send + Sync + 'static,
	) -> Delivery {
		self.redirect_mailbox.register(consumer)
	}

	/// Removes the redirect consumer.
	pub fn clear_redirect_listener(&self) {
		self.redirect_mailbox.unregister();
	}

	/// Shared refresh counters.
	pub fn refresh_metrics(&self) -> Arc<RefreshMetrics> {
		self.refresh_metrics.clone()
	}

	/// Active configuration.
	pub fn descriptor(&self) -> &AuthDescriptor {
		&self.descriptor
	}

	/// Runs an interactive sign-in.
	///
	/// A second call while one is in flight fails with [`Error::SignInInProgress`]. An
	/// identity-level failure tears the whole session down before it is returned.
	pub async fn sign_in(&self, keep_signed_in: bool) -> Result<SignInOutcome> {
		const OP: AuthOp = AuthOp::SignIn;

		if self.sign_in_in_flight.swap(true, Ordering::SeqCst) {
			return Err(Error::SignInInProgress);
		}

		let _flight = FlightGuard(&self.sign_in_in_flight);
		let span = OpSpan::new(OP, "sign_in");

		obs::record_op_outcome(OP, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				let _op = self.op_lock.lock().await;

				match self.flow.run(keep_signed_in).await {
					Ok(FlowResult::Completed(acquired)) => self
						.ingest_locked(acquired, StorageTier::for_preference(keep_signed_in), OP)
						.await
						.map(SignInOutcome::SignedIn),
					Ok(FlowResult::Redirecting) => Ok(SignInOutcome::Redirecting),
					Err(e) => {
						if e.is_identity_level() {
							self.sign_out_locked().await;
						}

						Err(e)
					},
				}
			})
			.await;

		obs::record_op_outcome(OP, OpOutcome::of(&result));

		result
	}

	/// Re-runs sign-in with the remembered "keep me signed in" preference.
	pub async fn request_reauthentication(&self) -> Result<SignInOutcome> {
		let tier = self.session.read().tier;
		let keep_signed_in = match tier {
			Some(tier) => tier == StorageTier::Durable,
			None => self.store.load_preference().await,
		};

		self.sign_in(keep_signed_in).await
	}

	/// Ends the provider session and clears all local state, including both storage tiers.
	///
	/// Never fails: provider and storage errors are logged and local teardown proceeds.
	pub async fn sign_out(&self) {
		const OP: AuthOp = AuthOp::SignOut;

		let span = OpSpan::new(OP, "sign_out");

		obs::record_op_outcome(OP, OpOutcome::Attempt);
		span.instrument(async move {
			let _op = self.op_lock.lock().await;

			self.sign_out_locked().await;
		})
		.await;
		obs::record_op_outcome(OP, OpOutcome::Success);
	}

	async fn sign_out_locked(&self) {
		{
			let mut session = self.session.write();

			session.epoch += 1;
			session.identity = None;
			session.token = None;
			session.tier = None;
		}

		self.scheduler.disarm();
		self.scheduler.clear_refresh_flag();
		self.redirect_mailbox.discard();

		if let Err(e) = self.store.clear().await {
			obs::warn_swallowed(AuthOp::SignOut, &e);
		}
		if let Err(e) = self.flow.sign_out().await {
			obs::warn_swallowed(AuthOp::SignOut, &e);
		}
	}

	// Adopts a freshly signed-in identity and its token. Both flows land here.
	async fn ingest_locked(
		&self,
		acquired: AcquiredSession,
		tier: StorageTier,
		op: AuthOp,
	) -> Result<Identity> {
		let AcquiredSession { identity, token } = acquired;

		{
			let mut session = self.session.write();

			session.epoch += 1;
			session.identity = Some(identity.clone());
			session.token = None;
			session.tier = Some(tier);
		}

		self.install_token_locked(token, tier, op).await?;

		Ok(identity)
	}

	// The single path that stores a delegated token: introspect, persist, publish, arm.
	async fn install_token_locked(
		&self,
		token: DelegatedToken,
		tier: StorageTier,
		op: AuthOp,
	) -> Result<TokenSecret> {
		let token = match self.verify(token).await {
			Ok(token) => token,
			Err(e) => {
				self.discard_token_locked(op).await;

				return Err(e);
			},
		};
		let lifetime = token.expires_at - token.issued_at;
		let value = token.value.clone();

		if let Err(e) = self.store.save(&token.value, tier, token.expires_at).await {
			obs::warn_swallowed(op, &e);
		}

		{
			let mut session = self.session.write();

			session.token = Some(token);
			session.tier = Some(tier);
		}

		self.scheduler.arm(lifetime);
		self.scheduler.clear_refresh_flag();

		Ok(value)
	}

	// Refines lifetime and scopes through introspection and enforces the required scopes.
	async fn verify(&self, mut token: DelegatedToken) -> Result<DelegatedToken> {
		if let Some(inspector) = self.inspector.as_ref() {
			match inspector.inspect(&token.value).await {
				Ok(info) => {
					if let Some(lifetime) = info.expires_in {
						let now = OffsetDateTime::now_utc();

						match now.checked_add(lifetime) {
							Some(expires_at) => {
								token.issued_at = now;
								token.expires_at = expires_at;
							},
							None => obs::warn_swallowed(
								AuthOp::Introspect,
								&ConfigError::ExpiresInOutOfRange,
							),
						}
					}
					if !info.scopes.is_empty() {
						token.scopes = info.scopes;
					}
				},
				Err(e) if e.is_delegated_level() => return Err(e),
				Err(e) => obs::warn_swallowed(AuthOp::Introspect, &e),
			}
		}

		let required = &self.descriptor.required_scopes;

		if !required.is_empty() && !token.scopes.is_empty() && !token.scopes.satisfies(required) {
			let missing = token.scopes.missing(required).join(" ");

			obs::warn_scope_mismatch(AuthOp::Introspect, &token.scopes, required);

			return Err(Error::ScopeInsufficient { missing });
		}

		Ok(token)
	}

	// Drops only the delegated token; the identity session survives.
	async fn discard_token_locked(&self, op: AuthOp) {
		self.session.write().token = None;
		self.scheduler.disarm();
		self.scheduler.mark_refresh_needed();

		if let Err(e) = self.store.clear().await {
			obs::warn_swallowed(op, &e);
		}
	}
}
impl AccessTokenSource for Coordinator {
	fn access_token(&self) -> TokenSourceFuture<'_> {
		Box::pin(Coordinator::access_token(self))
	}

	fn report_rejected(&self) {
		self.mark_refresh_needed();
	}
}
impl Debug for Coordinator {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.debug_struct("Coordinator")
			.field("state", &self.state())
			.field("readiness", &self.readiness())
			.field("scheduler", &self.scheduler)
			.finish_non_exhaustive()
	}
}

/// Builder for [`Coordinator`].
pub struct CoordinatorBuilder {
	provider: Arc<dyn IdentityProvider>,
	timer: Arc<dyn TimerDriver>,
	descriptor: AuthDescriptor,
	store: Option<TokenStore>,
	strategy: Option<Arc<dyn ProviderStrategy>>,
	capability: Option<FlowCapability>,
	inspector: Option<Arc<dyn TokenInspector>>,
}
impl CoordinatorBuilder {
	fn new(provider: Arc<dyn IdentityProvider>, timer: Arc<dyn TimerDriver>) -> Self {
		Self {
			provider,
			timer,
			descriptor: AuthDescriptor::default(),
			store: None,
			strategy: None,
			capability: None,
			inspector: None,
		}
	}

	/// Uses `descriptor` instead of the defaults.
	pub fn descriptor(mut self, descriptor: AuthDescriptor) -> Self {
		self.descriptor = descriptor;

		self
	}

	/// Persists tokens in `store` (defaults to two in-memory tiers).
	pub fn store(mut self, store: TokenStore) -> Self {
		self.store = Some(store);

		self
	}

	/// Classifies provider failures with `strategy`.
	pub fn strategy(mut self, strategy: Arc<dyn ProviderStrategy>) -> Self {
		self.strategy = Some(strategy);

		self
	}

	/// Chooses the interaction mode with `capability` (defaults to pop-up).
	pub fn capability(mut self, capability: FlowCapability) -> Self {
		self.capability = Some(capability);

		self
	}

	/// Introspects every acquired token with `inspector`.
	pub fn inspector(mut self, inspector: Arc<dyn TokenInspector>) -> Self {
		self.inspector = Some(inspector);

		self
	}

	/// Assembles the coordinator.
	pub fn build(self) -> Coordinator {
		let Self { provider, timer, descriptor, store, strategy, capability, inspector } = self;
		let store = store.unwrap_or_else(TokenStore::in_memory);
		let mut flow = SignInFlow::new(provider, store.clone(), &descriptor);

		if let Some(strategy) = strategy {
			flow = flow.with_strategy(strategy);
		}
		if let Some(capability) = capability {
			flow = flow.with_capability(capability);
		}

		let scheduler = ExpiryScheduler::with_policy(
			timer,
			descriptor.refresh_buffer,
			descriptor.min_timer_delay,
		);

		Coordinator {
			descriptor,
			flow,
			inspector,
			store,
			scheduler,
			gate: ReadinessGate::new(),
			redirect_mailbox: Mailbox::new(),
			session: RwLock::new(Session::default()),
			op_lock: AsyncMutex::new(()),
			refresh_guard: AsyncMutex::new(()),
			sign_in_in_flight: AtomicBool::new(false),
			refresh_metrics: Default::default(),
		}
	}
}
impl Debug for CoordinatorBuilder {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.debug_struct("CoordinatorBuilder").field("descriptor", &self.descriptor).finish_non_exhaustive()
	}
}

struct FlightGuard<'a>(&'a AtomicBool);
impl Drop for FlightGuard<'_> {
	fn drop(&mut self) {
		self.0.store(false, Ordering::SeqCst);
	}
}
