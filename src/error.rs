//! Gateway-level error types shared across requests, renewal, and stores.

// self
use crate::{_prelude::*, renewal::RenewalFailure};

/// Gateway-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical gateway error exposed by public APIs.
///
/// Callers branch on the variant (or the classification helpers) to tell "log in again" apart
/// from "transient network issue" and "you lack permission".
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary upstream failure; retry with backoff.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Credential renewal failed; the session is gone and the user must log in again.
	#[error(transparent)]
	RenewalFailed(#[from] RenewalFailure),

	/// The request was rejected again after one renewal and one retry.
	#[error("Request was rejected as unauthorized after the credential was renewed.")]
	RetryExhausted,
	/// The login endpoint rejected the supplied credentials.
	#[error("Login was rejected: invalid credentials.")]
	InvalidCredentials,
	/// Authenticated, but the backend denied access to the resource.
	#[error("Permission denied: {message}.")]
	PermissionDenied {
		/// Backend-supplied message or body preview.
		message: String,
	},
	/// Backend rejected the request with a non-retryable client error.
	#[error("Request was rejected with status {status}: {message}.")]
	Rejected {
		/// HTTP status code.
		status: u16,
		/// Backend-supplied message or body preview.
		message: String,
	},
}
impl Error {
	/// Returns `true` when the caller should send the user back to the login screen.
	///
	/// An abandoned renewal says nothing about the session itself, so it does not count.
	pub fn requires_login(&self) -> bool {
		match self {
			Self::RenewalFailed(RenewalFailure::Abandoned) => false,
			Self::RenewalFailed(_) | Self::RetryExhausted | Self::InvalidCredentials => true,
			_ => false,
		}
	}

	/// Returns `true` for failures that may succeed when retried later.
	pub fn is_transient(&self) -> bool {
		matches!(
			self,
			Self::Transport(_) | Self::Transient(TransientError::Upstream { .. })
		)
	}

	/// Returns `true` when the backend denied access to an authenticated caller.
	pub fn is_permission_denied(&self) -> bool {
		matches!(self, Self::PermissionDenied { .. })
	}
}

/// Configuration and validation failures raised by the gateway.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Gateway configuration failed validation.
	#[error(transparent)]
	InvalidConfig(#[from] crate::config::GatewayConfigError),
	/// Request path could not be joined onto the base URL, or resolved outside its origin.
	#[error("Request path `{path}` cannot be joined onto the base URL.")]
	InvalidPath {
		/// Offending request path.
		path: String,
		/// Underlying parsing failure; `None` when the path resolved to another origin.
		#[source]
		source: Option<url::ParseError>,
	},
	/// Request body could not be serialized.
	#[error("Request body could not be serialized.")]
	BodySerialization(#[source] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Temporary failure variants (safe to retry).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Backend returned a throttling or server-side failure.
	#[error("Backend returned status {status}: {message}.")]
	Upstream {
		/// Backend- or gateway-supplied message summarizing the failure.
		message: String,
		/// HTTP status code.
		status: u16,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Backend responded with JSON that does not match the expected shape.
	#[error("Backend returned malformed JSON.")]
	ResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code of the response that failed to parse.
		status: u16,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the backend.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the backend.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::StoreError;

	#[test]
	fn classification_helpers_partition_variants() {
		let renewal = Error::from(RenewalFailure::MissingRefreshToken);

		assert!(renewal.requires_login());
		assert!(!renewal.is_transient());
		assert!(Error::RetryExhausted.requires_login());
		assert!(!Error::from(RenewalFailure::Abandoned).requires_login());

		let denied = Error::PermissionDenied { message: "orders:write".into() };

		assert!(denied.is_permission_denied());
		assert!(!denied.requires_login());

		let throttled = Error::from(TransientError::Upstream {
			message: "slow down".into(),
			status: 429,
			retry_after: Some(Duration::seconds(3)),
		});

		assert!(throttled.is_transient());
		assert!(!throttled.requires_login());

		let io = Error::from(TransportError::Io(std::io::Error::other("reset")));

		assert!(io.is_transient());
	}

	#[test]
	fn store_error_keeps_source() {
		let store_error = StoreError::Backend { message: "disk full".into() };
		let error: Error = store_error.clone().into();

		assert!(error.to_string().contains("disk full"));

		let source =
			StdError::source(&error).expect("Gateway error should expose the store error source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}
}
