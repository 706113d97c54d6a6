//! Redacting wrapper for bearer credentials.

// self
use crate::_prelude::*;

/// Access or refresh token value that never prints itself.
///
/// `Debug` and `Display` both render `<redacted>`; the only way to read the value is
/// [`TokenSecret::expose`], which call sites use right before writing a header or a
/// request body.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the raw token. Never log the result.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns `true` when the secret holds no characters.
	pub fn is_empty(&self) -> bool {
		self.0.trim().is_empty()
	}
}
impl From<&str> for TokenSecret {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}
impl From<String> for TokenSecret {
	fn from(value: String) -> Self {
		Self(value)
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn formatters_redact_the_value() {
		let secret = TokenSecret::new("eyJhbGciOiJIUzI1NiJ9.payload.sig");

		assert_eq!(format!("{secret:?}"), "TokenSecret(\"<redacted>\")");
		assert_eq!(format!("{secret}"), "<redacted>");
		assert_eq!(secret.expose(), "eyJhbGciOiJIUzI1NiJ9.payload.sig");
	}

	#[test]
	fn serializes_as_a_bare_string() {
		let secret = TokenSecret::from("abc");

		assert_eq!(serde_json::to_string(&secret).expect("Secret should serialize."), "\"abc\"");
		assert!(TokenSecret::new("  ").is_empty());
	}
}
