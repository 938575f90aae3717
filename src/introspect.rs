//! Delegated-token introspection.
//!
//! A freshly acquired token is checked against the provider's tokeninfo endpoint to learn
//! its real lifetime and granted scopes before it is stored. [`TokenInspector`] is the seam;
//! [`TokenInfoClient`] is the HTTP-backed implementation.

// crates.io
use oauth2::{
	AsyncHttpClient, HttpClientError, HttpResponse,
	http::{
		Method, Request, StatusCode,
		header::{ACCEPT, HeaderValue},
	},
};
// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenSecret},
	error::{ConfigError, TransportError},
	http::TokenHttpClient,
	obs::{self, AuthOp, OpOutcome, OpSpan},
};

/// Boxed future returned by [`TokenInspector::inspect`].
pub type InspectFuture<'a> = Pin<Box<dyn Future<Output = Result<TokenInfo>> + 'a + Send>>;

/// Introspects delegated tokens.
pub trait TokenInspector
where
	Self: Send + Sync,
{
	/// Returns what the provider knows about `token`.
	///
	/// Rejections surface as [`Error::TokenRejected`]; transport or parsing trouble surfaces
	/// as [`Error::Network`].
	fn inspect<'a>(&'a self, token: &'a TokenSecret) -> InspectFuture<'a>;
}

/// Lifetime and scope information reported for a token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenInfo {
	/// Granted scopes.
	pub scopes: ScopeSet,
	/// Remaining lifetime, when reported.
	pub expires_in: Option<Duration>,
}

/// HTTP-backed [`TokenInspector`] speaking the tokeninfo protocol.
pub struct TokenInfoClient<C>
where
	C: ?Sized + TokenHttpClient,
{
	http_client: Arc<C>,
	endpoint: Url,
}
impl<C> TokenInfoClient<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Creates a client against `endpoint`.
	pub fn new(http_client: impl Into<Arc<C>>, endpoint: Url) -> Self {
		Self { http_client: http_client.into(), endpoint }
	}

	/// Returns the configured endpoint.
	pub fn endpoint(&self) -> &Url {
		&self.endpoint
	}

	async fn fetch(&self, token: &TokenSecret) -> Result<TokenInfo> {
		let mut url = self.endpoint.clone();

		url.query_pairs_mut().append_pair("access_token", token.expose());

		let request = Request::builder()
			.method(Method::GET)
			.uri(url.as_str())
			.header(ACCEPT, HeaderValue::from_static("application/json"))
			.body(Vec::new())
			.map_err(ConfigError::from)?;
		let handle = self.http_client.handle();
		let response = handle.call(request).await.map_err(map_http_error)?;

		parse_response(response)
	}
}
impl<C> TokenInspector for TokenInfoClient<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn inspect<'a>(&'a self, token: &'a TokenSecret) -> InspectFuture<'a> {
		Box::pin(async move {
			const OP: AuthOp = AuthOp::Introspect;

			let span = OpSpan::new(OP, "inspect");

			obs::record_op_outcome(OP, OpOutcome::Attempt);

			let result = span.instrument(self.fetch(token)).await;

			obs::record_op_outcome(OP, OpOutcome::of(&result));

			result
		})
	}
}
impl<C> Debug for TokenInfoClient<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.debug_struct("TokenInfoClient").field("endpoint", &self.endpoint.as_str()).finish()
	}
}

#[derive(Deserialize)]
struct RawTokenInfo {
	#[serde(default)]
	scope: Option<String>,
	#[serde(default)]
	expires_in: Option<RawExpiresIn>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawExpiresIn {
	Number(i64),
	Text(String),
}
impl RawExpiresIn {
	fn into_duration(self) -> Result<Duration, ConfigError> {
		let secs = match self {
			Self::Number(secs) => secs,
			Self::Text(raw) => raw.trim().parse::<i64>().map_err(|_| {
				if !raw.trim().is_empty() && raw.trim().bytes().all(|b| b.is_ascii_digit()) {
					ConfigError::ExpiresInOutOfRange
				} else {
					ConfigError::InvalidExpiresIn { raw: raw.clone() }
				}
			})?,
		};

		if secs <= 0 {
			return Err(ConfigError::NonPositiveExpiresIn);
		}

		Ok(Duration::seconds(secs))
	}
}

#[derive(Deserialize)]
struct RawErrorBody {
	#[serde(default)]
	error: Option<String>,
	#[serde(default)]
	error_description: Option<String>,
}

fn parse_response(response: HttpResponse) -> Result<TokenInfo> {
	let status = response.status();

	match status {
		s if s.is_success() => {
			let raw: RawTokenInfo = parse_json(response.body(), status)?;
			let scopes = match raw.scope {
				Some(scope) => scope.parse::<ScopeSet>().map_err(ConfigError::from)?,
				None => ScopeSet::default(),
			};
			let expires_in = match raw.expires_in {
				Some(raw) => Some(raw.into_duration().map_err(|e| {
					TransportError::network_message(format!("Tokeninfo lifetime unusable: {e}"))
				})?),
				None => None,
			};

			Ok(TokenInfo { scopes, expires_in })
		},
		StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
			let reason = serde_json::from_slice::<RawErrorBody>(response.body())
				.ok()
				.and_then(|body| body.error_description.or(body.error))
				.unwrap_or_else(|| "invalid_token".into());

			Err(Error::TokenRejected { reason })
		},
		s => Err(TransportError::Upstream {
			message: format!("tokeninfo answered {s}"),
			status: Some(s.as_u16()),
		}
		.into()),
	}
}

fn parse_json<T>(body: &[u8], status: StatusCode) -> Result<T, TransportError>
where
	T: for<'de> Deserialize<'de>,
{
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer).map_err(|source| {
		TransportError::MalformedResponse { source, status: Some(status.as_u16()) }
	})
}

fn map_http_error<E>(err: HttpClientError<E>) -> Error
where
	E: 'static + Send + Sync + StdError,
{
	match err {
		HttpClientError::Reqwest(inner) => TransportError::network(*inner).into(),
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(inner) => TransportError::Io(inner).into(),
		HttpClientError::Other(message) => TransportError::network_message(message).into(),
		_ => TransportError::network_message("Unknown transport failure.").into(),
	}
}
