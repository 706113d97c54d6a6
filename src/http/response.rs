//! Response model plus status classification into the gateway error taxonomy.

// crates.io
use serde::de::DeserializeOwned;
use time::format_description::well_known::Rfc2822;
// self
use crate::{_prelude::*, error::TransientError};

const BODY_PREVIEW_LEN: usize = 256;

/// Raw response returned by a [`Transport`](crate::http::Transport).
#[derive(Clone, PartialEq, Eq)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers keyed by lower-case name.
	pub headers: BTreeMap<String, String>,
	/// Raw body bytes.
	pub body: Vec<u8>,
}
impl ApiResponse {
	/// Creates a response, normalizing header names to lower-case.
	pub fn new(status: u16, headers: BTreeMap<String, String>, body: impl Into<Vec<u8>>) -> Self {
		let headers =
			headers.into_iter().map(|(name, value)| (name.to_ascii_lowercase(), value)).collect();

		Self { status, headers, body: body.into() }
	}

	/// Creates a header-less response; handy for fakes.
	pub fn with_status(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self::new(status, BTreeMap::new(), body)
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Returns `true` for 401, the only status the gateway intercepts.
	pub fn is_unauthorized(&self) -> bool {
		self.status == 401
	}

	/// Returns `true` for 403.
	pub fn is_forbidden(&self) -> bool {
		self.status == 403
	}

	/// Returns a header value by (case-insensitive) name.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
	}

	/// Body decoded as UTF-8, replacing invalid sequences.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Parses the body as JSON, reporting the failing path on mismatch.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let mut deserializer = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut deserializer).map_err(|source| {
			TransientError::ResponseParse { source, status: self.status }.into()
		})
	}

	/// Parses the `Retry-After` header (delta seconds or an RFC 2822 date).
	pub fn retry_after(&self) -> Option<Duration> {
		let raw = self.header("retry-after")?.trim();

		if let Ok(secs) = raw.parse::<u32>() {
			return Some(Duration::seconds(secs.into()));
		}
		if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
			let delta = moment - OffsetDateTime::now_utc();

			if delta.is_positive() {
				return Some(delta);
			}
		}

		None
	}

	/// Converts non-success statuses into typed errors.
	///
	/// 403 maps to [`Error::PermissionDenied`], 429 and 5xx to [`TransientError::Upstream`],
	/// and any other non-2xx (401 included) to [`Error::Rejected`]. Authenticated requests
	/// never come back as 401 responses; only skip-auth and auth-path requests reach this
	/// point with one.
	pub fn error_for_status(self) -> Result<Self> {
		if self.is_success() || (300..400).contains(&self.status) {
			return Ok(self);
		}

		let message = self.message();

		Err(match self.status {
			403 => Error::PermissionDenied { message },
			429 | 500..=599 => TransientError::Upstream {
				message,
				status: self.status,
				retry_after: self.retry_after(),
			}
			.into(),
			status => Error::Rejected { status, message },
		})
	}

	/// Prefers the `message` field of a JSON error body, falling back to a text preview.
	fn message(&self) -> String {
		#[derive(Deserialize)]
		struct ErrorBody {
			message: serde_json::Value,
		}

		if let Ok(ErrorBody { message }) = serde_json::from_slice::<ErrorBody>(&self.body) {
			match message {
				serde_json::Value::String(text) => return text,
				serde_json::Value::Array(items) => {
					let joined = items
						.iter()
						.filter_map(serde_json::Value::as_str)
						.collect::<Vec<_>>()
						.join("; ");

					if !joined.is_empty() {
						return joined;
					}
				},
				_ => {},
			}
		}

		let text = self.text();
		let preview = text.trim();

		match preview.char_indices().nth(BODY_PREVIEW_LEN) {
			Some((idx, _)) => format!("{}...", &preview[..idx]),
			None if preview.is_empty() => format!("HTTP {}", self.status),
			None => preview.to_owned(),
		}
	}
}
impl Debug for ApiResponse {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiResponse")
			.field("status", &self.status)
			.field("headers", &self.headers)
			.field("body_len", &self.body.len())
			.finish()
	}
}
