//! The access/refresh credential pair held by a [`CredentialStore`](crate::store::CredentialStore).

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Access token plus the refresh token used to renew it.
///
/// Serialized with camelCase keys so the same shape is shared by the login response, the
/// renewal response, and the file store snapshot.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
	/// Bearer credential attached to authenticated requests.
	pub access_token: TokenSecret,
	/// Credential exchanged at the renewal endpoint; absent for access-only sessions.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<TokenSecret>,
	/// Instant the pair was obtained by this process.
	#[serde(default = "OffsetDateTime::now_utc", with = "time::serde::rfc3339")]
	pub issued_at: OffsetDateTime,
}
impl CredentialPair {
	/// Creates an access-only pair stamped with the current clock.
	pub fn new(access_token: impl Into<TokenSecret>) -> Self {
		Self {
			access_token: access_token.into(),
			refresh_token: None,
			issued_at: OffsetDateTime::now_utc(),
		}
	}

	/// Attaches a refresh token.
	pub fn with_refresh_token(mut self, refresh_token: impl Into<TokenSecret>) -> Self {
		self.refresh_token = Some(refresh_token.into());

		self
	}

	/// Overrides the issued-at instant.
	pub fn with_issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = instant;

		self
	}

	/// Returns `true` when the pair can be renewed.
	pub fn can_renew(&self) -> bool {
		self.refresh_token.as_ref().is_some_and(|secret| !secret.is_empty())
	}

	/// Builds the pair that replaces `self` after a renewal.
	///
	/// Endpoints that do not rotate refresh tokens omit the field; the previous refresh
	/// token stays in place in that case.
	pub fn rotate(&self, issued: TokenResponse) -> Self {
		let refresh_token = issued.refresh_token.or_else(|| self.refresh_token.clone());

		Self {
			access_token: issued.access_token,
			refresh_token,
			issued_at: OffsetDateTime::now_utc(),
		}
	}
}
impl From<TokenResponse> for CredentialPair {
	fn from(issued: TokenResponse) -> Self {
		Self {
			access_token: issued.access_token,
			refresh_token: issued.refresh_token,
			issued_at: OffsetDateTime::now_utc(),
		}
	}
}
impl Debug for CredentialPair {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialPair")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("issued_at", &self.issued_at)
			.finish()
	}
}

/// Token payload returned by the login and renewal endpoints.
///
/// Extra fields (for example the signed-in `user`) are ignored.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
	/// Newly issued access token.
	pub access_token: TokenSecret,
	/// Newly issued refresh token, if the endpoint rotates it.
	#[serde(default)]
	pub refresh_token: Option<TokenSecret>,
}
