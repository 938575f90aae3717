// self
use crate::{
	_prelude::*,
	auth::ScopeSet,
	error::ConfigError,
	provider::AuthDescriptor,
};

/// Errors raised while constructing or validating descriptors.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum AuthDescriptorError {
	/// Endpoints must use HTTPS.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// An endpoint string could not be parsed.
	#[error("The {endpoint} endpoint is not a valid URL: {url}.")]
	InvalidEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Raw value that failed to parse.
		url: String,
	},
	/// Durations must be positive.
	#[error("The {field} duration must be positive.")]
	NonPositiveDuration {
		/// Which duration failed validation.
		field: &'static str,
	},
	/// The timer floor cannot exceed the refresh buffer.
	#[error("The minimum timer delay must not exceed the refresh buffer.")]
	MinDelayExceedsBuffer,
}

/// Builder for [`AuthDescriptor`] values.
#[derive(Debug)]
pub struct AuthDescriptorBuilder {
	descriptor: AuthDescriptor,
	scopes: Vec<String>,
	deferred: Option<AuthDescriptorError>,
}
impl AuthDescriptorBuilder {
	/// Creates a builder seeded with the defaults.
	pub fn new() -> Self {
		Self { descriptor: AuthDescriptor::default(), scopes: Vec::new(), deferred: None }
	}

	/// Sets the introspection endpoint.
	pub fn tokeninfo_endpoint(mut self, url: Url) -> Self {
		self.descriptor.tokeninfo_endpoint = Some(url);

		self
	}

	/// Uses Google's public tokeninfo endpoint.
	pub fn google_tokeninfo(mut self) -> Self {
		match Url::parse(super::GOOGLE_TOKENINFO_ENDPOINT) {
			Ok(url) => self.descriptor.tokeninfo_endpoint = Some(url),
			Err(_) =>
				self.deferred = Some(AuthDescriptorError::InvalidEndpoint {
					endpoint: "tokeninfo",
					url: super::GOOGLE_TOKENINFO_ENDPOINT.into(),
				}),
		}

		self
	}

	/// Adds a scope the delegated token must carry.
	pub fn require_scope(mut self, scope: impl Into<String>) -> Self {
		self.scopes.push(scope.into());

		self
	}

	/// Adds several required scopes.
	pub fn require_scopes<I, S>(mut self, scopes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.scopes.extend(scopes.into_iter().map(Into::into));

		self
	}

	/// Overrides the refresh buffer (default 5 minutes).
	pub fn refresh_buffer(mut self, buffer: Duration) -> Self {
		self.descriptor.refresh_buffer = buffer;

		self
	}

	/// Overrides the timer floor (default 10 seconds).
	pub fn min_timer_delay(mut self, delay: Duration) -> Self {
		self.descriptor.min_timer_delay = delay;

		self
	}

	/// Overrides the fallback token lifetime (default 1 hour).
	pub fn default_lifetime(mut self, lifetime: Duration) -> Self {
		self.descriptor.default_lifetime = lifetime;

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<AuthDescriptor> {
		if let Some(err) = self.deferred {
			return Err(ConfigError::from(err).into());
		}

		let mut descriptor = self.descriptor;

		descriptor.required_scopes = ScopeSet::new(self.scopes).map_err(ConfigError::from)?;
		descriptor.validate().map_err(ConfigError::from)?;

		Ok(descriptor)
	}
}
impl Default for AuthDescriptorBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl AuthDescriptor {
	/// Validates invariants for the descriptor.
	pub fn validate(&self) -> Result<(), AuthDescriptorError> {
		if let Some(url) = self.tokeninfo_endpoint.as_ref() {
			validate_endpoint("tokeninfo", url)?;
		}

		validate_positive("refresh_buffer", self.refresh_buffer)?;
		validate_positive("min_timer_delay", self.min_timer_delay)?;
		validate_positive("default_lifetime", self.default_lifetime)?;

		if self.min_timer_delay > self.refresh_buffer {
			return Err(AuthDescriptorError::MinDelayExceedsBuffer);
		}

		Ok(())
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), AuthDescriptorError> {
	if url.scheme() != "https" {
		Err(AuthDescriptorError::InsecureEndpoint { endpoint: name, url: url.to_string() })
	} else {
		Ok(())
	}
}

fn validate_positive(field: &'static str, value: Duration) -> Result<(), AuthDescriptorError> {
	if value.is_positive() {
		Ok(())
	} else {
		Err(AuthDescriptorError::NonPositiveDuration { field })
	}
}
