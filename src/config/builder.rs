// std
use std::net::IpAddr;
// self
use crate::{_prelude::*, config::GatewayConfig};

/// Errors raised while constructing or validating a [`GatewayConfig`].
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum GatewayConfigError {
	/// Base URL must use HTTP(S).
	#[error("Base URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// URL that failed validation.
		url: String,
	},
	/// Non-loopback base URLs must use HTTPS.
	#[error("Base URL must use HTTPS unless it targets a loopback host: {url}.")]
	InsecureBaseUrl {
		/// URL that failed validation.
		url: String,
	},
	/// Base URL must not carry a query or fragment.
	#[error("Base URL must not contain a query or fragment: {url}.")]
	BaseUrlHasQuery {
		/// URL that failed validation.
		url: String,
	},
	/// Endpoint paths must be absolute.
	#[error("The {endpoint} path must start with `/`: {path}.")]
	RelativePath {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Path that failed validation.
		path: String,
	},
	/// Login and renewal endpoints must differ.
	#[error("Login and refresh paths must differ.")]
	DuplicateAuthPath,
	/// Header name is not a valid HTTP token.
	#[error("Authorization header name is invalid: {name}.")]
	InvalidHeaderName {
		/// Header name that failed validation.
		name: String,
	},
	/// Scheme must be a single non-empty word.
	#[error("Authorization scheme must be a non-empty word without whitespace.")]
	InvalidScheme,
}

/// Builder for [`GatewayConfig`] values.
#[derive(Debug)]
pub struct GatewayConfigBuilder {
	/// Base URL every request path is joined onto.
	pub base_url: Url,
	/// Login endpoint path.
	pub login_path: String,
	/// Renewal endpoint path.
	pub refresh_path: String,
	/// Header carrying the access token.
	pub auth_header: String,
	/// Scheme prefix written before the access token.
	pub auth_scheme: String,
}
impl GatewayConfigBuilder {
	/// Creates a new builder with default endpoint paths and bearer authorization.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			login_path: GatewayConfig::DEFAULT_LOGIN_PATH.into(),
			refresh_path: GatewayConfig::DEFAULT_REFRESH_PATH.into(),
			auth_header: GatewayConfig::DEFAULT_AUTH_HEADER.into(),
			auth_scheme: GatewayConfig::DEFAULT_AUTH_SCHEME.into(),
		}
	}

	/// Overrides the login endpoint path.
	pub fn login_path(mut self, path: impl Into<String>) -> Self {
		self.login_path = path.into();

		self
	}

	/// Overrides the renewal endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Overrides the header that carries the access token.
	pub fn auth_header(mut self, name: impl Into<String>) -> Self {
		self.auth_header = name.into();

		self
	}

	/// Overrides the authorization scheme (defaults to `Bearer`).
	pub fn auth_scheme(mut self, scheme: impl Into<String>) -> Self {
		self.auth_scheme = scheme.into();

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<GatewayConfig, GatewayConfigError> {
		let config = GatewayConfig {
			base_url: self.base_url,
			login_path: self.login_path,
			refresh_path: self.refresh_path,
			auth_header: self.auth_header.to_ascii_lowercase(),
			auth_scheme: self.auth_scheme,
		};

		config.validate()?;

		Ok(config)
	}
}

impl GatewayConfig {
	/// Validates invariants for the configuration.
	pub fn validate(&self) -> Result<(), GatewayConfigError> {
		validate_base_url(&self.base_url)?;
		validate_path("login", &self.login_path)?;
		validate_path("refresh", &self.refresh_path)?;

		if self.login_path.trim_end_matches('/') == self.refresh_path.trim_end_matches('/') {
			return Err(GatewayConfigError::DuplicateAuthPath);
		}

		validate_header_name(&self.auth_header)?;

		if self.auth_scheme.is_empty() || self.auth_scheme.chars().any(char::is_whitespace) {
			return Err(GatewayConfigError::InvalidScheme);
		}

		Ok(())
	}
}

fn validate_base_url(url: &Url) -> Result<(), GatewayConfigError> {
	match url.scheme() {
		"https" => {},
		"http" if is_loopback(url) => {},
		"http" => return Err(GatewayConfigError::InsecureBaseUrl { url: url.to_string() }),
		_ => return Err(GatewayConfigError::UnsupportedScheme { url: url.to_string() }),
	}

	if url.query().is_some() || url.fragment().is_some() {
		return Err(GatewayConfigError::BaseUrlHasQuery { url: url.to_string() });
	}

	Ok(())
}

fn is_loopback(url: &Url) -> bool {
	match url.host_str() {
		Some("localhost") => true,
		Some(host) => host
			.trim_start_matches('[')
			.trim_end_matches(']')
			.parse::<IpAddr>()
			.is_ok_and(|ip| ip.is_loopback()),
		None => false,
	}
}

fn validate_path(endpoint: &'static str, path: &str) -> Result<(), GatewayConfigError> {
	if path.starts_with('/') {
		Ok(())
	} else {
		Err(GatewayConfigError::RelativePath { endpoint, path: path.to_owned() })
	}
}

// RFC 9110 token characters.
fn validate_header_name(name: &str) -> Result<(), GatewayConfigError> {
	let valid = !name.is_empty()
		&& name.bytes().all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b));

	if valid {
		Ok(())
	} else {
		Err(GatewayConfigError::InvalidHeaderName { name: name.to_owned() })
	}
}
