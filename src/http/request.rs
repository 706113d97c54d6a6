//! Request model: what callers describe and what transports receive.

// self
use crate::{_prelude::*, error::ConfigError};

/// HTTP methods used by the storefront and back-office clients.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
	/// `GET`
	Get,
	/// `POST`
	Post,
	/// `PUT`
	Put,
	/// `PATCH`
	Patch,
	/// `DELETE`
	Delete,
}
impl Method {
	/// Returns the canonical upper-case method name.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Patch => "PATCH",
			Method::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Request described relative to the gateway's base URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Path joined onto the configured base URL.
	pub path: String,
	/// Query pairs appended in insertion order.
	pub query: Vec<(String, String)>,
	/// Extra headers; names are stored lower-case.
	pub headers: BTreeMap<String, String>,
	/// Raw body bytes.
	pub body: Option<Vec<u8>>,
	/// Bypasses credential handling entirely.
	pub skip_auth: bool,
}
impl ApiRequest {
	/// Creates a request for `method` + `path`.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			query: Vec::new(),
			headers: BTreeMap::new(),
			body: None,
			skip_auth: false,
		}
	}

	/// Shorthand for a `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::Get, path)
	}

	/// Shorthand for a `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::Post, path)
	}

	/// Shorthand for a `PUT` request.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::Put, path)
	}

	/// Shorthand for a `PATCH` request.
	pub fn patch(path: impl Into<String>) -> Self {
		Self::new(Method::Patch, path)
	}

	/// Shorthand for a `DELETE` request.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::Delete, path)
	}

	/// Adds (or replaces) a header.
	pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
		self.headers.insert(name.as_ref().to_ascii_lowercase(), value.into());

		self
	}

	/// Appends a query pair.
	pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
		self.query.push((key.into(), value.to_string()));

		self
	}

	/// Sets a raw body with its content type.
	pub fn body(mut self, bytes: impl Into<Vec<u8>>, content_type: &str) -> Self {
		self.body = Some(bytes.into());

		self.header("content-type", content_type)
	}

	/// Serializes `payload` as the JSON body.
	pub fn json<T>(self, payload: &T) -> Result<Self, ConfigError>
	where
		T: ?Sized + Serialize,
	{
		let bytes = serde_json::to_vec(payload).map_err(ConfigError::BodySerialization)?;

		Ok(self.body(bytes, "application/json"))
	}

	/// Marks the request as unauthenticated: no token is attached and a 401 is returned to
	/// the caller as-is.
	pub fn skip_auth(mut self) -> Self {
		self.skip_auth = true;

		self
	}
}

/// Which dispatch of a request is being sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Attempt {
	/// First dispatch.
	Initial,
	/// The single re-dispatch after a credential renewal.
	Retry,
}
impl Attempt {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Attempt::Initial => "initial",
			Attempt::Retry => "retry",
		}
	}
}

/// Fully resolved request handed to a [`Transport`](crate::http::Transport).
#[derive(Clone)]
pub struct OutboundRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute URL including the query string.
	pub url: Url,
	/// Headers to send, including the authorization header when one applies.
	pub headers: BTreeMap<String, String>,
	/// Raw body bytes.
	pub body: Option<Vec<u8>>,
	/// Whether this is the first dispatch or the post-renewal retry.
	pub attempt: Attempt,
}
impl OutboundRequest {
	/// Returns a header value by (case-insensitive) name.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
	}
}
impl Debug for OutboundRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		// Header values may carry credentials; only names are printed.
		f.debug_struct("OutboundRequest")
			.field("method", &self.method)
			.field("url", &self.url.as_str())
			.field("headers", &self.headers.keys().collect::<Vec<_>>())
			.field("body_len", &self.body.as_ref().map(Vec::len))
			.field("attempt", &self.attempt)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn json_body_sets_content_type() {
		#[derive(Serialize)]
		struct NewOrder<'a> {
			product_id: u32,
			note: &'a str,
		}

		let request = ApiRequest::post("/orders")
			.json(&NewOrder { product_id: 7, note: "gift" })
			.expect("Order payload should serialize.");

		assert_eq!(
			request.headers.get("content-type").map(String::as_str),
			Some("application/json")
		);
		assert_eq!(request.body.as_deref(), Some(br#"{"product_id":7,"note":"gift"}"#.as_slice()));
		assert!(!request.skip_auth);
	}

	#[test]
	fn outbound_debug_hides_header_values() {
		let mut headers = BTreeMap::new();

		headers.insert("authorization".to_owned(), "Bearer very-secret".to_owned());

		let outbound = OutboundRequest {
			method: Method::Get,
			url: Url::parse("https://shop.example.com/api/me").expect("Fixture URL should parse."),
			headers,
			body: None,
			attempt: Attempt::Initial,
		};
		let rendered = format!("{outbound:?}");

		assert!(rendered.contains("authorization"));
		assert!(!rendered.contains("very-secret"));
		assert_eq!(outbound.header("Authorization"), Some("Bearer very-secret"));
	}

	#[test]
	fn header_names_are_lowercased() {
		let request = ApiRequest::get("/products").header("X-Request-Id", "abc").query("page", 2);

		assert_eq!(request.headers.get("x-request-id").map(String::as_str), Some("abc"));
		assert_eq!(request.query, vec![("page".to_owned(), "2".to_owned())]);
	}
}
