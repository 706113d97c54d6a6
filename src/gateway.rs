//! The authenticated request gateway.
//!
//! [`Gateway`] owns the transport, credential store, renewal endpoint, and the single-flight
//! renewal state for one backend. Clones share all of it, so hand a clone to every part of
//! the application that talks to the same backend; building two gateways over the same store
//! gives you two independent renewal flights.

mod request;
mod session;

pub use session::LoginRequest;

// self
use crate::{
	_prelude::*,
	config::GatewayConfig,
	ext::{HeaderSigner, NoopSessionListener, RequestSigner, SessionListener},
	http::Transport,
	renewal::{
		HttpRenewalEndpoint, RenewalCoordinator, RenewalEndpoint, RenewalMetrics, RenewalPhase,
	},
	store::CredentialStore,
};
#[cfg(feature = "reqwest")]
use crate::{error::ConfigError, http::ReqwestTransport};

#[cfg(feature = "reqwest")]
/// Gateway specialized for the crate's default reqwest transport.
pub type ReqwestGateway = Gateway<ReqwestTransport>;

/// Attaches credentials to outbound requests and coordinates their renewal.
pub struct Gateway<T>
where
	T: ?Sized + Transport,
{
	/// Transport used for every outbound request, including login and renewal.
	pub transport: Arc<T>,
	/// Store holding the current session's credential pair.
	pub store: Arc<dyn CredentialStore>,
	/// Validated backend configuration.
	pub config: Arc<GatewayConfig>,
	/// Endpoint that exchanges refresh tokens.
	pub renewal_endpoint: Arc<dyn RenewalEndpoint>,
	/// Writes the access token onto outbound requests.
	pub signer: Arc<dyn RequestSigner>,
	/// Receives the forced-logout signal after a failed renewal.
	pub session_listener: Arc<dyn SessionListener>,
	/// Shared counters for renewal activity.
	pub renewal_metrics: Arc<RenewalMetrics>,
	coordinator: Arc<RenewalCoordinator>,
}
impl<T> Gateway<T>
where
	T: ?Sized + Transport,
{
	/// Creates a gateway over a caller-provided transport.
	///
	/// Renewal goes through [`HttpRenewalEndpoint`] on the same transport, tokens are written
	/// by a [`HeaderSigner`] built from `config`, and invalidations are ignored until a
	/// listener is attached with [`Gateway::with_session_listener`].
	pub fn with_transport(
		config: GatewayConfig,
		store: Arc<dyn CredentialStore>,
		transport: impl Into<Arc<T>>,
	) -> Self {
		let transport = transport.into();
		let config = Arc::new(config);
		let renewal_endpoint =
			Arc::new(HttpRenewalEndpoint::new(transport.clone(), config.clone()));
		let signer = Arc::new(HeaderSigner::from_config(&config));

		Self {
			transport,
			store,
			config,
			renewal_endpoint,
			signer,
			session_listener: Arc::new(NoopSessionListener),
			renewal_metrics: Default::default(),
			coordinator: Default::default(),
		}
	}

	/// Replaces the renewal endpoint.
	pub fn with_renewal_endpoint(mut self, endpoint: Arc<dyn RenewalEndpoint>) -> Self {
		self.renewal_endpoint = endpoint;

		self
	}

	/// Replaces the request signer.
	pub fn with_signer(mut self, signer: Arc<dyn RequestSigner>) -> Self {
		self.signer = signer;

		self
	}

	/// Attaches the listener notified when a renewal fails and the session is gone.
	pub fn with_session_listener(mut self, listener: Arc<dyn SessionListener>) -> Self {
		self.session_listener = listener;

		self
	}

	/// Current phase of the renewal state machine.
	pub fn renewal_phase(&self) -> RenewalPhase {
		self.coordinator.phase()
	}

	/// Renewal counters shared by every clone of this gateway.
	pub fn renewal_metrics(&self) -> &RenewalMetrics {
		&self.renewal_metrics
	}
}
#[cfg(feature = "reqwest")]
impl Gateway<ReqwestTransport> {
	/// Creates a gateway backed by a redirect-free reqwest client.
	pub fn new(
		config: GatewayConfig,
		store: Arc<dyn CredentialStore>,
	) -> Result<Self, ConfigError> {
		Ok(Self::with_transport(config, store, ReqwestTransport::new()?))
	}
}
impl<T> Clone for Gateway<T>
where
	T: ?Sized + Transport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			store: self.store.clone(),
			config: self.config.clone(),
			renewal_endpoint: self.renewal_endpoint.clone(),
			signer: self.signer.clone(),
			session_listener: self.session_listener.clone(),
			renewal_metrics: self.renewal_metrics.clone(),
			coordinator: self.coordinator.clone(),
		}
	}
}
impl<T> Debug for Gateway<T>
where
	T: ?Sized + Transport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Gateway")
			.field("base_url", &self.config.base_url.as_str())
			.field("renewal_phase", &self.renewal_phase())
			.finish()
	}
}
