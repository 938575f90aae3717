//! Boot-time inputs and reconciliation.
//!
//! Each handler applies its input under the operation lock, reconciles the session if it is
//! the second input to arrive, and only then completes its side of the gate. Waiters released
//! by the gate therefore always observe the settled session.

// self
use crate::{
	_prelude::*,
	auth::{DelegatedToken, Identity},
	coordinator::Coordinator,
	obs::{self, AuthOp, OpOutcome, OpSpan},
	store::{PersistedToken, StorageTier},
};

impl Coordinator {
	/// Restores the persisted token, then runs the pending-redirect check.
	pub async fn boot(&self) -> Result<Option<Identity>> {
		self.restore().await;
		self.complete_redirect_check().await
	}

	/// Loads the persisted token (durable tier first) and arms the expiry timer for it.
	///
	/// A token that already expired is kept and flagged so the next
	/// [`access_token`](Self::access_token) attempts a silent refresh. Does nothing when a token
	/// is already held.
	pub async fn restore(&self) {
		const OP: AuthOp = AuthOp::Restore;

		let _op = self.op_lock.lock().await;

		if self.session.read().token.is_some() {
			return;
		}

		let Some(PersistedToken { token, tier, expires_at }) = self.store.load().await else {
			return;
		};
		let now = OffsetDateTime::now_utc();
		let token = match DelegatedToken::builder()
			.value(token.expose())
			.issued_at(now)
			.expires_at(expires_at)
			.build()
		{
			Ok(token) => token,
			Err(e) => {
				obs::warn_swallowed(OP, &e);

				return;
			},
		};

		{
			let mut session = self.session.write();

			session.token = Some(token);
			session.tier = Some(tier);
		}

		let remaining = expires_at - now;

		self.scheduler.arm(remaining);

		if !remaining.is_positive() {
			self.scheduler.mark_refresh_needed();
		}

		obs::note(OP, "restored persisted token");
	}

	/// Feeds the provider's restored-session notification into the gate.
	///
	/// `Some(identity)` is adopted unless a redirect sign-in already set one; `None` never
	/// clears an identity. Only the first notification per coordinator is applied.
	pub async fn on_session_restored(&self, identity: Option<Identity>) {
		const OP: AuthOp = AuthOp::SessionRestore;

		let _op = self.op_lock.lock().await;

		if self.gate.state().identity_check_done {
			obs::note(OP, "ignoring repeated restored-session notification");

			return;
		}
		if let Some(identity) = identity {
			let mut session = self.session.write();

			if session.identity.is_none() {
				session.identity = Some(identity);
			}
		}
		if self.gate.state().redirect_check_done {
			self.settle_locked().await;
		}

		obs::record_op_outcome(OP, OpOutcome::Success);
		self.gate.identity_restored();
	}

	/// Collects a pending redirect result, ingests it, and feeds the gate.
	///
	/// The gate input is delivered even when the check fails. Runs at most once; later calls
	/// return `Ok(None)`.
	pub async fn complete_redirect_check(&self) -> Result<Option<Identity>> {
		const OP: AuthOp = AuthOp::RedirectCheck;

		let _op = self.op_lock.lock().await;

		if self.gate.state().redirect_check_done {
			return Ok(None);
		}

		let span = OpSpan::new(OP, "redirect_check");

		obs::record_op_outcome(OP, OpOutcome::Attempt);

		let result = span.instrument(self.ingest_pending_redirect_locked()).await;

		obs::record_op_outcome(OP, OpOutcome::of(&result));

		if self.gate.state().identity_check_done {
			self.settle_locked().await;
		}

		self.gate.redirect_checked();

		result
	}

	async fn ingest_pending_redirect_locked(&self) -> Result<Option<Identity>> {
		const OP: AuthOp = AuthOp::RedirectCheck;

		let acquired = match self.flow.pending_redirect().await {
			Ok(Some(acquired)) => acquired,
			Ok(None) => return Ok(None),
			Err(e) => {
				if e.is_identity_level() {
					self.sign_out_locked().await;
				}

				return Err(e);
			},
		};
		let keep_signed_in = self.store.load_preference().await;
		let identity =
			self.ingest_locked(acquired, StorageTier::for_preference(keep_signed_in), OP).await?;

		self.redirect_mailbox.post(identity.clone());

		Ok(Some(identity))
	}

	// Runs once both inputs are in: a token without an identity is an orphan and is removed.
	async fn settle_locked(&self) {
		let orphaned = {
			let mut session = self.session.write();

			if session.identity.is_some() {
				return;
			}

			session.tier = None;

			session.token.take().is_some()
		};

		if orphaned {
			obs::note(AuthOp::Restore, "discarding persisted token without an identity session");
		}

		self.scheduler.disarm();
		self.scheduler.clear_refresh_flag();

		if let Err(e) = self.store.clear().await {
			obs::warn_swallowed(AuthOp::Restore, &e);
		}
	}
}
