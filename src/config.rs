//! Gateway configuration: backend base URL, auth endpoint paths, and header layout.
//!
//! `GatewayConfig` is plain data so applications can embed it in their own configuration
//! files. Construct it with [`GatewayConfig::builder`] (validation happens in `build`) or
//! deserialize it and call [`GatewayConfig::validate`] before handing it to a gateway.

/// Builder API and validation errors.
pub mod builder;

pub use builder::*;

// self
use crate::{_prelude::*, error::ConfigError};

/// Validated gateway configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
	/// Base URL every request path is joined onto (e.g. `https://shop.example.com/api`).
	pub base_url: Url,
	/// Login endpoint path; requests to it bypass credential handling.
	#[serde(default = "GatewayConfig::default_login_path")]
	pub login_path: String,
	/// Renewal endpoint path; requests to it bypass credential handling.
	#[serde(default = "GatewayConfig::default_refresh_path")]
	pub refresh_path: String,
	/// Header carrying the access token.
	#[serde(default = "GatewayConfig::default_auth_header")]
	pub auth_header: String,
	/// Scheme prefix written before the access token.
	#[serde(default = "GatewayConfig::default_auth_scheme")]
	pub auth_scheme: String,
}
impl GatewayConfig {
	/// Default login endpoint path.
	pub const DEFAULT_LOGIN_PATH: &str = "/auth/login";
	/// Default renewal endpoint path.
	pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";
	/// Default authorization header name.
	pub const DEFAULT_AUTH_HEADER: &str = "authorization";
	/// Default authorization scheme.
	pub const DEFAULT_AUTH_SCHEME: &str = "Bearer";

	/// Creates a new builder rooted at `base_url`.
	pub fn builder(base_url: Url) -> GatewayConfigBuilder {
		GatewayConfigBuilder::new(base_url)
	}

	/// Returns `true` when `path` targets the login or renewal endpoint.
	///
	/// Such requests must never carry the access token nor trigger a renewal, otherwise a
	/// rejected renewal would wait on itself.
	pub fn is_auth_endpoint(&self, path: &str) -> bool {
		let path = path.split(['?', '#']).next().unwrap_or(path).trim_end_matches('/');

		path == self.login_path.trim_end_matches('/')
			|| path == self.refresh_path.trim_end_matches('/')
	}

	/// Resolves a request path against the base URL, preserving the base path prefix.
	///
	/// Paths that resolve to another scheme, host, or port (absolute or scheme-relative URLs)
	/// are rejected so the access token never leaves the configured backend.
	pub fn endpoint(&self, path: &str) -> Result<Url, ConfigError> {
		let mut base = self.base_url.clone();

		if !base.path().ends_with('/') {
			let with_slash = format!("{}/", base.path());

			base.set_path(&with_slash);
		}

		let joined = base.join(path.trim_start_matches('/')).map_err(|source| {
			ConfigError::InvalidPath { path: path.to_owned(), source: Some(source) }
		})?;

		if joined.origin() != self.base_url.origin() {
			return Err(ConfigError::InvalidPath { path: path.to_owned(), source: None });
		}

		Ok(joined)
	}

	fn default_login_path() -> String {
		Self::DEFAULT_LOGIN_PATH.into()
	}

	fn default_refresh_path() -> String {
		Self::DEFAULT_REFRESH_PATH.into()
	}

	fn default_auth_header() -> String {
		Self::DEFAULT_AUTH_HEADER.into()
	}

	fn default_auth_scheme() -> String {
		Self::DEFAULT_AUTH_SCHEME.into()
	}
}
