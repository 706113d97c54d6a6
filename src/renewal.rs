//! Credential renewal: the endpoint contract, the failure taxonomy, and the single-flight
//! state machine that makes sure only one renewal call is in flight per gateway.
//!
//! The first caller that sees a 401 while the gateway is idle becomes the *leader*: it flips
//! the phase to `Renewing`, calls the [`RenewalEndpoint`], and writes the new pair to the
//! store. Every caller that sees a 401 while the phase is `Renewing` parks on a one-shot
//! channel and is resumed with the leader's outcome. Success resumes everyone with the new
//! access token; failure clears the store, raises the session-invalidated signal, and
//! resumes everyone with the same [`RenewalFailure`].

mod metrics;
mod state;

pub use metrics::RenewalMetrics;
pub use state::RenewalPhase;

pub(crate) use state::{Leadership, RenewalCoordinator, Ticket};

// self
use crate::{
	_prelude::*,
	auth::{TokenResponse, TokenSecret},
	config::GatewayConfig,
	http::{ApiResponse, Attempt, Method, OutboundRequest, Transport},
};

/// Boxed future returned by [`RenewalEndpoint::renew`].
pub type RenewalFuture<'a> =
	Pin<Box<dyn Future<Output = Result<TokenResponse, RenewalFailure>> + 'a + Send>>;

/// Remote operation that exchanges a refresh token for a new credential pair.
pub trait RenewalEndpoint
where
	Self: Send + Sync,
{
	/// Exchanges `refresh_token` for new credentials.
	///
	/// Implementations must never retry a rejected exchange; every error is final for the
	/// current session.
	fn renew<'a>(&'a self, refresh_token: &'a TokenSecret) -> RenewalFuture<'a>;
}

/// Why a renewal could not produce a usable access token.
///
/// Cloned into every waiting caller, so variants carry rendered messages instead of error
/// sources.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum RenewalFailure {
	/// The store holds no refresh token; the endpoint was not called.
	#[error("No refresh token is available; the session must be re-established.")]
	MissingRefreshToken,
	/// The renewal endpoint refused the refresh token.
	#[error("Renewal endpoint rejected the refresh token with status {status}.")]
	Rejected {
		/// HTTP status returned by the renewal endpoint.
		status: u16,
	},
	/// The renewal call never produced a response.
	#[error("Renewal call failed in transport: {message}.")]
	Transport {
		/// Rendered transport error.
		message: String,
	},
	/// The renewal endpoint answered 2xx with an unusable body.
	#[error("Renewal endpoint returned a malformed response: {message}.")]
	MalformedResponse {
		/// Rendered parsing error.
		message: String,
	},
	/// The credential store failed while storing the renewed pair or clearing a dead session.
	#[error("Credential store failed during renewal: {message}.")]
	Storage {
		/// Rendered store error.
		message: String,
	},
	/// A login or logout happened while the renewal was in flight; its result was dropped.
	#[error("The session changed while credentials were being renewed.")]
	SessionChanged,
	/// The caller driving the renewal was dropped before it finished.
	#[error("Credential renewal was abandoned before it completed.")]
	Abandoned,
}

/// Default [`RenewalEndpoint`]: `POST {refresh_path}` with `{"refreshToken": ...}` through
/// the gateway's own transport, without an authorization header.
pub struct HttpRenewalEndpoint<T>
where
	T: ?Sized + Transport,
{
	transport: Arc<T>,
	config: Arc<GatewayConfig>,
}
impl<T> HttpRenewalEndpoint<T>
where
	T: ?Sized + Transport,
{
	/// Creates an endpoint that shares the gateway's transport and configuration.
	pub fn new(transport: Arc<T>, config: Arc<GatewayConfig>) -> Self {
		Self { transport, config }
	}

	fn outbound(&self, refresh_token: &TokenSecret) -> Result<OutboundRequest, RenewalFailure> {
		#[derive(Serialize)]
		#[serde(rename_all = "camelCase")]
		struct RenewalBody<'a> {
			refresh_token: &'a str,
		}

		let url = self.config.endpoint(&self.config.refresh_path).map_err(|e| {
			RenewalFailure::Transport { message: e.to_string() }
		})?;
		let body = serde_json::to_vec(&RenewalBody { refresh_token: refresh_token.expose() })
			.map_err(|e| RenewalFailure::Transport { message: e.to_string() })?;
		let mut headers = BTreeMap::new();

		headers.insert("content-type".to_owned(), "application/json".to_owned());
		headers.insert("accept".to_owned(), "application/json".to_owned());

		Ok(OutboundRequest {
			method: Method::Post,
			url,
			headers,
			body: Some(body),
			attempt: Attempt::Initial,
		})
	}
}
impl<T> RenewalEndpoint for HttpRenewalEndpoint<T>
where
	T: ?Sized + Transport,
{
	fn renew<'a>(&'a self, refresh_token: &'a TokenSecret) -> RenewalFuture<'a> {
		Box::pin(async move {
			let request = self.outbound(refresh_token)?;
			let response = self
				.transport
				.send(request)
				.await
				.map_err(|e| RenewalFailure::Transport { message: error_chain(&e) })?;

			parse_token_response(&response)
		})
	}
}
impl<T> Debug for HttpRenewalEndpoint<T>
where
	T: ?Sized + Transport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HttpRenewalEndpoint")
			.field("refresh_path", &self.config.refresh_path)
			.finish()
	}
}

/// Classifies a renewal (or login) response into issued tokens or a [`RenewalFailure`].
pub(crate) fn parse_token_response(
	response: &ApiResponse,
) -> Result<TokenResponse, RenewalFailure> {
	if !response.is_success() {
		return Err(RenewalFailure::Rejected { status: response.status });
	}

	let issued = response
		.json::<TokenResponse>()
		.map_err(|e| RenewalFailure::MalformedResponse { message: error_chain(&e) })?;

	if issued.access_token.is_empty() {
		return Err(RenewalFailure::MalformedResponse {
			message: "accessToken is empty".into(),
		});
	}

	Ok(issued)
}

fn error_chain(error: &dyn StdError) -> String {
	let mut rendered = error.to_string();
	let mut source = error.source();

	while let Some(cause) = source {
		rendered.push_str(": ");
		rendered.push_str(&cause.to_string());
		source = cause.source();
	}

	rendered
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn non_success_statuses_are_rejections() {
		for status in [400, 401, 403, 500] {
			let response = ApiResponse::with_status(status, r#"{"message":"nope"}"#);

			assert_eq!(parse_token_response(&response), Err(RenewalFailure::Rejected { status }));
		}
	}

	#[test]
	fn malformed_bodies_are_reported() {
		let missing = ApiResponse::with_status(201, r#"{"refreshToken":"r"}"#);

		assert!(matches!(
			parse_token_response(&missing),
			Err(RenewalFailure::MalformedResponse { .. })
		));

		let empty = ApiResponse::with_status(200, r#"{"accessToken":""}"#);

		assert!(matches!(
			parse_token_response(&empty),
			Err(RenewalFailure::MalformedResponse { .. })
		));
	}

	#[test]
	fn success_parses_camel_case_tokens() {
		let response =
			ApiResponse::with_status(200, r#"{"accessToken":"a2","refreshToken":"r2"}"#);
		let issued = parse_token_response(&response).expect("Valid body should parse.");

		assert_eq!(issued.access_token.expose(), "a2");
		assert_eq!(issued.refresh_token.as_ref().map(TokenSecret::expose), Some("r2"));
	}
}
