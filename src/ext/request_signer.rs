//! Request signing: how the access token lands on an outbound request.

// self
use crate::{_prelude::*, auth::TokenSecret, config::GatewayConfig};

/// Writes authorization state derived from the access token onto outbound headers.
pub trait RequestSigner
where
	Self: Send + Sync,
{
	/// Adds the credential to `headers`, replacing any existing value.
	fn attach_token(&self, headers: &mut BTreeMap<String, String>, token: &TokenSecret);
}

/// Writes `<header>: <scheme> <token>`; `authorization: Bearer <token>` by default.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderSigner {
	header: String,
	scheme: String,
}
impl HeaderSigner {
	/// Creates a signer for a header name and scheme.
	pub fn new(header: impl AsRef<str>, scheme: impl Into<String>) -> Self {
		Self { header: header.as_ref().to_ascii_lowercase(), scheme: scheme.into() }
	}

	/// Creates the signer described by a gateway configuration.
	pub fn from_config(config: &GatewayConfig) -> Self {
		Self::new(&config.auth_header, config.auth_scheme.clone())
	}
}
impl Default for HeaderSigner {
	fn default() -> Self {
		Self::new(GatewayConfig::DEFAULT_AUTH_HEADER, GatewayConfig::DEFAULT_AUTH_SCHEME)
	}
}
impl RequestSigner for HeaderSigner {
	fn attach_token(&self, headers: &mut BTreeMap<String, String>, token: &TokenSecret) {
		headers.insert(self.header.clone(), format!("{} {}", self.scheme, token.expose()));
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn default_signer_writes_bearer_authorization() {
		let mut headers = BTreeMap::new();

		headers.insert("authorization".to_owned(), "Bearer stale".to_owned());
		HeaderSigner::default().attach_token(&mut headers, &TokenSecret::new("fresh"));

		assert_eq!(headers.get("authorization").map(String::as_str), Some("Bearer fresh"));
		assert_eq!(headers.len(), 1);
	}

	#[test]
	fn custom_header_is_lowercased() {
		let mut headers = BTreeMap::new();

		HeaderSigner::new("X-Access-Token", "Token").attach_token(&mut headers, &"t".into());

		assert_eq!(headers.get("x-access-token").map(String::as_str), Some("Token t"));
	}
}
