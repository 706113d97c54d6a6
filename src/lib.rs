//! Authenticated request gateway: attach the current access token to every outbound call,
//! renew it exactly once when the backend rejects it, and fan the result out to every caller
//! that was waiting on the renewal.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod error;
pub mod ext;
pub mod gateway;
pub mod http;
pub mod obs;
pub mod renewal;
pub mod store;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
	// crates.io
	use tokio::sync::Semaphore;
	// self
	use crate::{
		auth::{CredentialPair, TokenResponse, TokenSecret},
		config::GatewayConfig,
		error::TransportError,
		ext::SessionListener,
		http::{ApiResponse, OutboundRequest, Transport, TransportFuture},
		renewal::{RenewalEndpoint, RenewalFailure, RenewalFuture},
		store::MemoryStore,
	};

	/// Loopback base URL used by configuration fixtures.
	pub const TEST_BASE_URL: &str = "http://127.0.0.1:8080/api";

	/// Builds a validated configuration pointing at `base_url`.
	pub fn test_config(base_url: &str) -> GatewayConfig {
		let base_url = Url::parse(base_url).expect("Test base URL should parse.");

		GatewayConfig::builder(base_url).build().expect("Test gateway configuration should build.")
	}

	/// Builds a credential pair fixture with both tokens set.
	pub fn test_pair(access: &str, refresh: &str) -> CredentialPair {
		CredentialPair::new(access).with_refresh_token(refresh)
	}

	/// Returns a memory store seeded with the provided pair.
	pub fn seeded_store(pair: CredentialPair) -> Arc<MemoryStore> {
		Arc::new(MemoryStore::with_pair(pair))
	}

	/// Session listener that records every invalidation it receives.
	#[derive(Debug, Default)]
	pub struct RecordingListener {
		calls: AtomicUsize,
		failures: Mutex<Vec<RenewalFailure>>,
	}
	impl RecordingListener {
		/// Number of invalidation signals observed.
		pub fn calls(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}

		/// Failures passed to the listener, in arrival order.
		pub fn failures(&self) -> Vec<RenewalFailure> {
			self.failures.lock().clone()
		}
	}
	impl SessionListener for RecordingListener {
		fn session_invalidated(&self, failure: &RenewalFailure) {
			self.calls.fetch_add(1, Ordering::SeqCst);
			self.failures.lock().push(failure.clone());
		}
	}

	/// In-process backend that accepts exactly one access token.
	///
	/// Paths ending in `/public` answer 200 without credentials, paths ending in `/forbidden`
	/// answer 403, and every other path answers 200 only for `authorization: Bearer <accepted>`
	/// and 401 otherwise.
	#[derive(Debug, Default)]
	pub struct FakeBackend {
		accepted: RwLock<Option<String>>,
		offline: AtomicBool,
		seen: Mutex<Vec<OutboundRequest>>,
	}
	impl FakeBackend {
		/// Creates a backend that accepts `token`.
		pub fn accepting(token: &str) -> Self {
			let backend = Self::default();

			backend.accept(token);

			backend
		}

		/// Replaces the accepted token.
		pub fn accept(&self, token: &str) {
			*self.accepted.write() = Some(token.to_owned());
		}

		/// Makes every following call fail in transport.
		pub fn go_offline(&self) {
			self.offline.store(true, Ordering::SeqCst);
		}

		/// Requests received so far, in arrival order.
		pub fn requests(&self) -> Vec<OutboundRequest> {
			self.seen.lock().clone()
		}

		/// Authorization header of every received request, in arrival order.
		pub fn authorizations(&self) -> Vec<Option<String>> {
			self.seen.lock().iter().map(|r| r.header("authorization").map(str::to_owned)).collect()
		}
	}
	impl Transport for FakeBackend {
		fn send(&self, request: OutboundRequest) -> TransportFuture<'_> {
			Box::pin(async move {
				self.seen.lock().push(request.clone());

				if self.offline.load(Ordering::SeqCst) {
					return Err(TransportError::Io(std::io::Error::other("connection reset")));
				}

				let path = request.url.path();
				let status = if path.ends_with("/public") {
					200
				} else if path.ends_with("/forbidden") {
					403
				} else {
					let accepted =
						self.accepted.read().as_ref().map(|token| format!("Bearer {token}"));

					match (request.header("authorization"), accepted) {
						(Some(sent), Some(accepted)) if sent == accepted => 200,
						_ => 401,
					}
				};
				let body = match status {
					200 => r#"{"ok":true}"#,
					403 => r#"{"message":"Missing permission orders:write"}"#,
					_ => r#"{"message":"Unauthorized"}"#,
				};

				Ok(ApiResponse::with_status(status, body))
			})
		}
	}

	/// Renewal endpoint that parks every call until the test opens the gate.
	#[derive(Debug)]
	pub struct GatedRenewal {
		gate: Semaphore,
		calls: AtomicUsize,
		outcome: Result<TokenResponse, RenewalFailure>,
	}
	impl GatedRenewal {
		/// Endpoint that issues `access` (and `refresh`, when given) once released.
		pub fn issuing(access: &str, refresh: Option<&str>) -> Self {
			Self::with_outcome(Ok(TokenResponse {
				access_token: TokenSecret::new(access),
				refresh_token: refresh.map(TokenSecret::new),
			}))
		}

		/// Endpoint that fails with `failure` once released.
		pub fn failing(failure: RenewalFailure) -> Self {
			Self::with_outcome(Err(failure))
		}

		fn with_outcome(outcome: Result<TokenResponse, RenewalFailure>) -> Self {
			Self { gate: Semaphore::new(0), calls: AtomicUsize::new(0), outcome }
		}

		/// Lets one parked (or future) call complete.
		pub fn release(&self) {
			self.gate.add_permits(1);
		}

		/// Lets every call complete immediately from now on.
		pub fn open(&self) {
			self.gate.add_permits(Semaphore::MAX_PERMITS / 2);
		}

		/// Number of calls that reached the endpoint.
		pub fn calls(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}
	}
	impl RenewalEndpoint for GatedRenewal {
		fn renew<'a>(&'a self, _refresh_token: &'a TokenSecret) -> RenewalFuture<'a> {
			Box::pin(async move {
				self.calls.fetch_add(1, Ordering::SeqCst);

				let permit = self.gate.acquire().await.map_err(|_| RenewalFailure::Abandoned)?;

				permit.forget();

				self.outcome.clone()
			})
		}
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, VecDeque},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
