//! Pop-up and redirect consent driven through the identity provider.

// self
use crate::{
	_prelude::*,
	auth::{DelegatedToken, ScopeSet},
	error::ConfigError,
	flows::{AcquiredSession, FlowCapability, FlowMode, FlowResult, prefer_popup},
	obs::{self, AuthOp},
	provider::{
		AuthDescriptor, DefaultProviderStrategy, IdentityProvider, ProviderCredential,
		ProviderError, ProviderSignIn, ProviderStrategy,
	},
	store::TokenStore,
};

/// Drives the identity provider through pop-up or redirect consent.
#[derive(Clone)]
pub struct SignInFlow {
	provider: Arc<dyn IdentityProvider>,
	strategy: Arc<dyn ProviderStrategy>,
	capability: FlowCapability,
	store: TokenStore,
	required_scopes: ScopeSet,
	default_lifetime: Duration,
}
impl SignInFlow {
	/// Creates a flow with the default strategy and a pop-up preference.
	pub fn new(
		provider: Arc<dyn IdentityProvider>,
		store: TokenStore,
		descriptor: &AuthDescriptor,
	) -> Self {
		Self {
			provider,
			strategy: Arc::new(DefaultProviderStrategy),
			capability: prefer_popup(),
			store,
			required_scopes: descriptor.required_scopes.clone(),
			default_lifetime: descriptor.default_lifetime,
		}
	}

	/// Overrides the error-classification strategy.
	pub fn with_strategy(mut self, strategy: Arc<dyn ProviderStrategy>) -> Self {
		self.strategy = strategy;

		self
	}

	/// Overrides the capability probe.
	pub fn with_capability(mut self, capability: FlowCapability) -> Self {
		self.capability = capability;

		self
	}

	/// Scopes requested at consent time.
	pub fn required_scopes(&self) -> &ScopeSet {
		&self.required_scopes
	}

	/// Runs one interactive sign-in in the mode the capability probe selects.
	///
	/// A blocked pop-up falls back to the redirect flow once.
	pub async fn run(&self, keep_signed_in: bool) -> Result<FlowResult> {
		match (self.capability)() {
			FlowMode::Popup => match self.popup().await {
				Ok(session) => Ok(FlowResult::Completed(session)),
				Err(Error::PopupBlocked) => {
					obs::note(AuthOp::SignIn, "pop-up blocked; falling back to redirect");

					self.redirect(keep_signed_in).await
				},
				Err(e) => Err(e),
			},
			FlowMode::Redirect => self.redirect(keep_signed_in).await,
		}
	}

	/// Completes consent in a pop-up window.
	pub async fn popup(&self) -> Result<AcquiredSession> {
		let sign_in = self
			.provider
			.sign_in_with_popup(&self.required_scopes)
			.await
			.map_err(|e| self.classify(e))?;

		self.normalize(sign_in)
	}

	/// Starts redirect consent after persisting the preference so it survives navigation.
	pub async fn redirect(&self, keep_signed_in: bool) -> Result<FlowResult> {
		if let Err(e) = self.store.save_preference(keep_signed_in).await {
			obs::warn_swallowed(AuthOp::SignIn, &e);
		}

		self.provider
			.sign_in_with_redirect(&self.required_scopes)
			.await
			.map_err(|e| self.classify(e))?;

		Ok(FlowResult::Redirecting)
	}

	/// Collects the result of a redirect started on a previous load, if any.
	pub async fn pending_redirect(&self) -> Result<Option<AcquiredSession>> {
		let pending =
			self.provider.pending_redirect_result().await.map_err(|e| self.classify(e))?;

		pending.map(|sign_in| self.normalize(sign_in)).transpose()
	}

	/// Mints a new delegated token from the live identity session without UI.
	///
	/// `Ok(None)` means there is no session that can be reused silently.
	pub async fn silent(&self) -> Result<Option<DelegatedToken>> {
		let credential = self
			.provider
			.silent_credential(&self.required_scopes)
			.await
			.map_err(|e| self.classify(e))?;

		credential.map(|credential| self.token_from(credential)).transpose()
	}

	/// Ends the provider session.
	pub async fn sign_out(&self) -> Result<()> {
		self.provider.sign_out().await.map_err(|e| self.classify(e))
	}

	fn classify(&self, error: ProviderError) -> Error {
		self.strategy.to_error(error)
	}

	fn normalize(&self, sign_in: ProviderSignIn) -> Result<AcquiredSession> {
		let ProviderSignIn { identity, credential } = sign_in;

		Ok(AcquiredSession { identity, token: self.token_from(credential)? })
	}

	fn token_from(&self, credential: ProviderCredential) -> Result<DelegatedToken> {
		let ProviderCredential { access_token, expires_in, scopes } = credential;
		let now = OffsetDateTime::now_utc();
		let lifetime = match expires_in.filter(|lifetime| lifetime.is_positive()) {
			Some(lifetime) if now.checked_add(lifetime).is_some() => lifetime,
			Some(_) => {
				obs::warn_swallowed(AuthOp::SignIn, &ConfigError::ExpiresInOutOfRange);

				self.default_lifetime
			},
			None => self.default_lifetime,
		};
		let token = DelegatedToken::builder()
			.value(access_token.expose())
			.scopes(scopes.unwrap_or_default())
			.issued_at(now)
			.expires_in(lifetime)
			.build()
			.map_err(ConfigError::from)?;

		Ok(token)
	}
}
impl Debug for SignInFlow {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.debug_struct("SignInFlow")
			.field("required_scopes", &self.required_scopes)
			.field("default_lifetime", &self.default_lifetime)
			.finish_non_exhaustive()
	}
}
