//! Token hand-out and the single-flight silent refresh.

// self
use crate::{
	_prelude::*,
	auth::{TokenSecret, TokenStatus},
	coordinator::Coordinator,
	obs::{self, AuthOp, OpOutcome, OpSpan},
	store::StorageTier,
};

impl Coordinator {
	/// Returns a usable delegated token, or `None` when the caller must prompt for sign-in.
	///
	/// - A valid token is returned as is.
	/// - An expiring token is still returned and the refresh flag is raised.
	/// - An expired token triggers exactly one silent refresh; concurrent callers share it.
	///
	/// Never fails: refresh errors degrade to `None`, and an identity-level failure signs the
	/// user out first.
	pub async fn access_token(&self) -> Option<TokenSecret> {
		let token = {
			let session = self.session.read();

			session.identity.as_ref()?;
			session.token.clone()?
		};

		match token.status_at(OffsetDateTime::now_utc(), self.scheduler.refresh_buffer()) {
			TokenStatus::Valid => Some(token.value),
			TokenStatus::Expiring => {
				self.scheduler.mark_refresh_needed();

				Some(token.value)
			},
			TokenStatus::Expired => self.refresh_expired().await,
		}
	}

	async fn refresh_expired(&self) -> Option<TokenSecret> {
		const OP: AuthOp = AuthOp::SilentRefresh;

		let _singleflight = self.refresh_guard.lock().await;
		// Re-read under the guard: the previous holder may have refreshed or dropped the token.
		let (epoch, tier) = {
			let session = self.session.read();

			session.identity.as_ref()?;

			let current = session.token.as_ref()?;

			if !current.is_expired_at(OffsetDateTime::now_utc()) {
				return Some(current.value.clone());
			}

			(session.epoch, session.tier.unwrap_or(StorageTier::Ephemeral))
		};
		let span = OpSpan::new(OP, "silent_refresh");

		self.refresh_metrics.record_attempt();
		obs::record_op_outcome(OP, OpOutcome::Attempt);

		let refreshed = span.instrument(self.flow.silent()).await;
		let _op = self.op_lock.lock().await;
		let outcome = if self.session.read().epoch != epoch {
			obs::note(OP, "session changed during silent refresh; dropping result");

			None
		} else {
			match refreshed {
				Ok(Some(token)) => match self.install_token_locked(token, tier, OP).await {
					Ok(value) => Some(value),
					Err(e) => {
						obs::warn_swallowed(OP, &e);

						None
					},
				},
				Ok(None) => {
					obs::note(OP, "no reusable identity session; token dropped");
					self.discard_token_locked(OP).await;

					None
				},
				Err(e) if e.is_identity_level() => {
					obs::warn_swallowed(OP, &e);
					self.sign_out_locked().await;

					None
				},
				Err(e) => {
					obs::warn_swallowed(OP, &e);
					self.discard_token_locked(OP).await;

					None
				},
			}
		};

		if outcome.is_some() {
			self.refresh_metrics.record_success();
			obs::record_op_outcome(OP, OpOutcome::Success);
		} else {
			self.refresh_metrics.record_failure();
			obs::record_op_outcome(OP, OpOutcome::Failure);
		}

		outcome
	}
}
