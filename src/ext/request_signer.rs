//! Request signing contracts that attach delegated tokens to arbitrary HTTP clients.

// self
use crate::auth::TokenSecret;

/// Describes how to attach a [`TokenSecret`] to an outbound request without constraining the
/// HTTP client type.
pub trait RequestSignerExt<Request, Error>
where
	Self: Send + Sync,
{
	/// Consumes the request and injects authorization derived from `token`.
	fn attach_token(&self, request: Request, token: &TokenSecret) -> Result<Request, Error>;
}

/// Adds `Authorization: Bearer <token>` to reqwest requests.
#[cfg(feature = "reqwest")]
#[derive(Clone, Copy, Debug, Default)]
pub struct BearerSigner;
#[cfg(feature = "reqwest")]
impl RequestSignerExt<reqwest::RequestBuilder, std::convert::Infallible> for BearerSigner {
	fn attach_token(
		&self,
		request: reqwest::RequestBuilder,
		token: &TokenSecret,
	) -> Result<reqwest::RequestBuilder, std::convert::Infallible> {
		Ok(request.bearer_auth(token.expose()))
	}
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// self
	use super::*;
	use crate::_prelude::*;

	#[test]
	fn bearer_signer_sets_authorization_header() {
		let client = ReqwestClient::new();
		let request = BearerSigner
			.attach_token(client.get("https://sheets.example.com/v4"), &TokenSecret::new("tok-1"))
			.expect("Bearer signing is infallible.")
			.build()
			.expect("Request fixture should build.");

		assert_eq!(
			request.headers().get("authorization").and_then(|value| value.to_str().ok()),
			Some("Bearer tok-1")
		);
	}
}
