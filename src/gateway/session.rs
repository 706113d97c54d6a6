//! Session lifecycle: login, externally supplied credentials, and logout.

// self
use crate::{
	_prelude::*,
	auth::CredentialPair,
	gateway::Gateway,
	http::{ApiRequest, Transport},
	obs::{self, OpKind, OpOutcome, OpSpan},
	renewal::{self, RenewalFailure},
};

/// Credentials posted to the login endpoint.
#[derive(Clone, Serialize)]
pub struct LoginRequest {
	/// Account e-mail address.
	pub email: String,
	/// Account password; never printed by `Debug`.
	pub password: String,
}
impl LoginRequest {
	/// Creates a login payload.
	pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
		Self { email: email.into(), password: password.into() }
	}
}
impl Debug for LoginRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LoginRequest")
			.field("email", &self.email)
			.field("password", &"<redacted>")
			.finish()
	}
}

impl<T> Gateway<T>
where
	T: ?Sized + Transport,
{
	/// Exchanges e-mail + password for a credential pair and stores it.
	///
	/// A 401 from the login endpoint is [`Error::InvalidCredentials`]; it never triggers a
	/// renewal. Any in-flight renewal started under the previous session is discarded.
	pub async fn login(&self, credentials: &LoginRequest) -> Result<CredentialPair> {
		const KIND: OpKind = OpKind::Login;

		let span = OpSpan::new(KIND, "login");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async move {
				let request = ApiRequest::post(self.config.login_path.clone())
					.json(credentials)?
					.skip_auth();
				let response = self.request(request).await?;

				if response.is_unauthorized() {
					return Err(Error::InvalidCredentials);
				}

				let response = response.error_for_status()?;
				let issued = renewal::parse_token_response(&response).map_err(|failure| {
					match failure {
						RenewalFailure::MalformedResponse { message } => Error::Rejected {
							status: response.status,
							message: format!("Login response is malformed: {message}"),
						},
						other => other.into(),
					}
				})?;
				let pair = CredentialPair::from(issued);

				self.sign_in(pair.clone())?;

				Ok(pair)
			})
			.await;

		match &result {
			Ok(_) => obs::record_op_outcome(KIND, OpOutcome::Success),
			Err(_) => obs::record_op_outcome(KIND, OpOutcome::Failure),
		}

		result
	}

	/// Installs a pair obtained elsewhere (another login flow, a restored session).
	pub fn sign_in(&self, pair: CredentialPair) -> Result<()> {
		self.coordinator.change_session(|| self.store.set(pair))?;

		obs::record_event(OpKind::Login, "session_started");

		Ok(())
	}

	/// Ends the session by clearing the store.
	///
	/// Safe to call at any time, including while a renewal is in flight: that renewal's
	/// result is discarded and every caller waiting on it is rejected.
	pub fn logout(&self) -> Result<()> {
		obs::record_op_outcome(OpKind::Logout, OpOutcome::Attempt);

		let result = self.coordinator.change_session(|| self.store.clear());

		match &result {
			Ok(()) => obs::record_op_outcome(OpKind::Logout, OpOutcome::Success),
			Err(_) => obs::record_op_outcome(OpKind::Logout, OpOutcome::Failure),
		}

		Ok(result?)
	}

	/// Returns the stored pair, if a session exists.
	pub fn session(&self) -> Result<Option<CredentialPair>> {
		Ok(self.store.get()?)
	}

	/// Returns `true` when a session is stored.
	pub fn is_signed_in(&self) -> Result<bool> {
		Ok(self.store.get()?.is_some())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn login_request_debug_redacts_password() {
		let request = LoginRequest::new("ops@example.com", "hunter2");
		let rendered = format!("{request:?}");

		assert!(rendered.contains("ops@example.com"));
		assert!(!rendered.contains("hunter2"));
		assert_eq!(
			serde_json::to_string(&request).expect("Login payload should serialize."),
			r#"{"email":"ops@example.com","password":"hunter2"}"#
		);
	}
}
