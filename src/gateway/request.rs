//! Request dispatch with 401 interception and single-flight renewal.

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	gateway::Gateway,
	http::{ApiRequest, ApiResponse, Attempt, OutboundRequest, Transport},
	obs::{self, OpKind, OpOutcome, OpSpan},
	renewal::{Leadership, RenewalFailure, Ticket},
};

impl<T> Gateway<T>
where
	T: ?Sized + Transport,
{
	/// Sends `request`, attaching the current access token and renewing it once on 401.
	///
	/// - Requests marked [`ApiRequest::skip_auth`], and requests to the login or refresh
	///   paths, go straight to the transport and come back untouched.
	/// - A 401 either starts a renewal or waits for the one in flight, then re-dispatches
	///   exactly once with the renewed token. A second 401 is [`Error::RetryExhausted`].
	/// - Every other status (403 included) is returned as `Ok`; use
	///   [`ApiResponse::error_for_status`] or [`Gateway::request_json`] to classify it.
	/// - Transport errors are returned unchanged and never retried.
	pub async fn request(&self, request: ApiRequest) -> Result<ApiResponse> {
		const KIND: OpKind = OpKind::Request;

		let span = OpSpan::new(KIND, "request");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span.instrument(self.authorized_dispatch(&request)).await;

		match &result {
			Ok(_) => obs::record_op_outcome(KIND, OpOutcome::Success),
			Err(_) => obs::record_op_outcome(KIND, OpOutcome::Failure),
		}

		result
	}

	/// Sends `request`, rejects non-success statuses, and parses the JSON body.
	pub async fn request_json<R>(&self, request: ApiRequest) -> Result<R>
	where
		R: DeserializeOwned,
	{
		self.request(request).await?.error_for_status()?.json()
	}

	async fn authorized_dispatch(&self, request: &ApiRequest) -> Result<ApiResponse> {
		if request.skip_auth || self.config.is_auth_endpoint(&request.path) {
			return self.dispatch(request, None, Attempt::Initial).await;
		}

		let sent_with = self.store.get()?.map(|pair| pair.access_token);
		let response = self.dispatch(request, sent_with.as_ref(), Attempt::Initial).await?;

		if !response.is_unauthorized() {
			return Ok(response);
		}

		let token = self.fresh_token(sent_with.as_ref()).await?;
		let retried = self.dispatch(request, Some(&token), Attempt::Retry).await?;

		if retried.is_unauthorized() {
			obs::record_event(OpKind::Request, "retry_exhausted");

			return Err(Error::RetryExhausted);
		}

		Ok(retried)
	}

	/// Resolves the token a rejected request should be retried with.
	///
	/// A waiter whose leader was dropped goes back to the coordinator and either leads the
	/// next renewal or reuses a token stored in the meantime.
	async fn fresh_token(&self, sent_with: Option<&TokenSecret>) -> Result<TokenSecret> {
		loop {
			let outcome = match self.coordinator.begin(self.store.as_ref(), sent_with)? {
				Ticket::Lead(leadership) => self.lead_renewal(leadership).await,
				Ticket::Wait(waiter) => {
					self.renewal_metrics.record_join();

					// A dropped sender means the coordinator went away mid-renewal.
					waiter.await.unwrap_or(Err(RenewalFailure::Abandoned))
				},
				Ticket::Reuse(token) => {
					self.renewal_metrics.record_reuse();

					return Ok(token);
				},
			};

			match outcome {
				Ok(token) => return Ok(token),
				Err(RenewalFailure::Abandoned) => {
					obs::record_event(OpKind::Renewal, "waiter_requeued");
				},
				Err(RenewalFailure::SessionChanged) =>
					return self.token_after_session_change(sent_with),
				Err(failure) => return Err(failure.into()),
			}
		}
	}

	/// A login during the renewal leaves a newer token in the store; a logout leaves none.
	fn token_after_session_change(&self, sent_with: Option<&TokenSecret>) -> Result<TokenSecret> {
		match self.store.get()? {
			Some(pair) if sent_with != Some(&pair.access_token) => {
				self.renewal_metrics.record_reuse();

				Ok(pair.access_token)
			},
			_ => Err(RenewalFailure::SessionChanged.into()),
		}
	}

	async fn lead_renewal(
		&self,
		leadership: Leadership<'_>,
	) -> Result<TokenSecret, RenewalFailure> {
		const KIND: OpKind = OpKind::Renewal;

		let span = OpSpan::new(KIND, "lead_renewal");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let outcome = match span.instrument(self.exchange_refresh_token(&leadership)).await {
			Ok(token) => {
				self.renewal_metrics.record_success();
				obs::record_event(KIND, "renewal_succeeded");

				Ok(token)
			},
			Err(failure) => {
				self.renewal_metrics.record_failure();

				let failure = match failure {
					RenewalFailure::SessionChanged => failure,
					failure => match leadership.invalidate(self.store.as_ref()) {
						Ok(false) => failure,
						Ok(true) => {
							obs::record_event(KIND, "session_invalidated");
							self.session_listener.session_invalidated(&failure);

							failure
						},
						Err(e) => {
							// The rejected pair may still be persisted; report that instead.
							let failure = RenewalFailure::Storage { message: e.to_string() };

							obs::record_event(KIND, "store_clear_failed");
							self.session_listener.session_invalidated(&failure);

							failure
						},
					},
				};

				Err(failure)
			},
		};

		match &outcome {
			Ok(_) => obs::record_op_outcome(KIND, OpOutcome::Success),
			Err(_) => obs::record_op_outcome(KIND, OpOutcome::Failure),
		}

		leadership.finish(&outcome);

		outcome
	}

	async fn exchange_refresh_token(
		&self,
		leadership: &Leadership<'_>,
	) -> Result<TokenSecret, RenewalFailure> {
		let current = leadership
			.current()
			.filter(|pair| pair.can_renew())
			.ok_or(RenewalFailure::MissingRefreshToken)?;
		let refresh_token =
			current.refresh_token.as_ref().ok_or(RenewalFailure::MissingRefreshToken)?;

		self.renewal_metrics.record_attempt();

		let issued = self.renewal_endpoint.renew(refresh_token).await?;
		let renewed = current.rotate(issued);
		let token = renewed.access_token.clone();

		leadership.commit(self.store.as_ref(), renewed)?;

		Ok(token)
	}

	async fn dispatch(
		&self,
		request: &ApiRequest,
		token: Option<&TokenSecret>,
		attempt: Attempt,
	) -> Result<ApiResponse> {
		let outbound = self.outbound(request, token, attempt)?;

		Ok(self.transport.send(outbound).await?)
	}

	fn outbound(
		&self,
		request: &ApiRequest,
		token: Option<&TokenSecret>,
		attempt: Attempt,
	) -> Result<OutboundRequest> {
		let mut url = self.config.endpoint(&request.path)?;

		if !request.query.is_empty() {
			url.query_pairs_mut().extend_pairs(&request.query);
		}

		let mut headers = request.headers.clone();

		if let Some(token) = token {
			self.signer.attach_token(&mut headers, token);
		}

		Ok(OutboundRequest {
			method: request.method,
			url,
			headers,
			body: request.body.clone(),
			attempt,
		})
	}
}
