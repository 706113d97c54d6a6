//! Transport primitives for the gateway.
//!
//! [`Transport`] is the gateway's only dependency on an HTTP stack. The gateway builds a
//! fully resolved [`OutboundRequest`] (absolute URL, headers including the authorization
//! header, body bytes) and hands it to the transport, which answers with an
//! [`ApiResponse`] or a [`TransportError`]. Status codes are never errors at this layer;
//! classifying them is the gateway's job.

pub mod request;
pub mod response;

pub use request::*;
pub use response::*;

// self
use crate::{_prelude::*, error::TransportError};
#[cfg(feature = "reqwest")] use crate::error::ConfigError;

/// Boxed future returned by [`Transport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<ApiResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing gateway requests.
///
/// Implementations must be `Send + Sync + 'static` so one transport can be shared by every
/// clone of a gateway, and the returned future must be `Send` so callers can spawn gateway
/// calls onto multi-threaded executors.
pub trait Transport
where
	Self: 'static + Send + Sync,
{
	/// Performs the request and returns the raw response.
	fn send(&self, request: OutboundRequest) -> TransportFuture<'_>;
}
impl<T> Transport for Arc<T>
where
	T: ?Sized + Transport,
{
	fn send(&self, request: OutboundRequest) -> TransportFuture<'_> {
		(**self).send(request)
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// The client built by [`ReqwestTransport::new`] does not follow redirects: a redirect on
/// an authenticated call would forward the authorization header to whatever host the
/// backend points at. Configure any custom client passed to
/// [`ReqwestTransport::with_client`] the same way.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Builds a transport backed by a redirect-free reqwest client.
	pub fn new() -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder().redirect(reqwest::redirect::Policy::none()).build()?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Transport for ReqwestTransport {
	fn send(&self, request: OutboundRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let OutboundRequest { method, url, headers, body, .. } = request;
			let mut builder = self.0.request(method.into(), url);

			for (name, value) in &headers {
				builder = builder.header(name.as_str(), value.as_str());
			}
			if let Some(body) = body {
				builder = builder.body(body);
			}

			let response = builder.send().await?;
			let status = response.status().as_u16();
			let headers = collect_headers(response.headers());
			let body = response.bytes().await?.to_vec();

			Ok(ApiResponse::new(status, headers, body))
		})
	}
}

#[cfg(feature = "reqwest")]
impl From<Method> for reqwest::Method {
	fn from(method: Method) -> Self {
		match method {
			Method::Get => Self::GET,
			Method::Post => Self::POST,
			Method::Put => Self::PUT,
			Method::Patch => Self::PATCH,
			Method::Delete => Self::DELETE,
		}
	}
}

#[cfg(feature = "reqwest")]
fn collect_headers(map: &reqwest::header::HeaderMap) -> BTreeMap<String, String> {
	let mut headers = BTreeMap::<String, String>::new();

	for (name, value) in map {
		let Ok(value) = value.to_str() else {
			continue;
		};

		headers
			.entry(name.as_str().to_owned())
			.and_modify(|existing| {
				existing.push_str(", ");
				existing.push_str(value);
			})
			.or_insert_with(|| value.to_owned());
	}

	headers
}
