//! Outbound request descriptors and their deduplication identity.

pub mod identity;

pub use identity::*;

// self
use crate::{_prelude::*, error::ConfigError};

/// HTTP methods exposed by the client facade.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
	/// `GET`
	Get,
	/// `POST`
	Post,
	/// `PUT`
	Put,
	/// `DELETE`
	Delete,
}
impl Method {
	/// Returns the canonical upper-case token.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Describes one outbound call before credentials are attached.
///
/// The facade owns the descriptor for the lifetime of a single call. The `retried` flag is flipped
/// the first time the call is replayed after an auth-expiry signal so a second signal surfaces
/// instead of triggering another refresh.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestDescriptor {
	/// HTTP method.
	pub method: Method,
	/// Path relative to the client's base URL.
	pub path: String,
	/// Query parameters; always a JSON object when present.
	pub params: Option<Value>,
	/// JSON body.
	pub body: Option<Value>,
	/// Extra headers layered over the configured defaults.
	pub headers: BTreeMap<String, String>,
	/// Whether the call has already been replayed after a refresh.
	pub retried: bool,
}
impl RequestDescriptor {
	/// Creates a descriptor without params, body, or extra headers.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			params: None,
			body: None,
			headers: BTreeMap::new(),
			retried: false,
		}
	}

	/// Serializes `params` into the query parameter object.
	///
	/// Unit values and `None` clear the params; anything else must serialize to a JSON object.
	pub fn with_params<P>(mut self, params: &P) -> Result<Self>
	where
		P: ?Sized + Serialize,
	{
		let value = to_json(params)?;

		self.params = match value {
			Value::Null => None,
			Value::Object(_) => Some(value),
			_ => return Err(ConfigError::InvalidQuery.into()),
		};

		Ok(self)
	}

	/// Serializes `body` into the JSON request body.
	pub fn with_body<B>(mut self, body: &B) -> Result<Self>
	where
		B: ?Sized + Serialize,
	{
		let value = to_json(body)?;

		self.body = if value.is_null() { None } else { Some(value) };

		Ok(self)
	}

	/// Adds or replaces an extra header.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name.into(), value.into());

		self
	}

	/// Identity used to detect duplicate in-flight requests.
	pub fn key(&self) -> RequestKey {
		RequestKey::of(self)
	}

	/// Builds the absolute URL for this descriptor under `base`.
	///
	/// The path is appended to the base path (a base of `https://host/admin` and a path of
	/// `/users` yield `https://host/admin/users`), then params are encoded as query pairs.
	pub fn url(&self, base: &Url) -> Result<Url> {
		let mut url = join_path(base, &self.path)?;

		if let Some(Value::Object(params)) = &self.params {
			let mut entries = params.iter().filter(|(_, value)| !value.is_null()).collect::<Vec<_>>();

			if entries.is_empty() {
				return Ok(url);
			}

			let mut pairs = url.query_pairs_mut();

			entries.sort_by(|(a, _), (b, _)| a.cmp(b));

			for (name, value) in entries {
				match value {
					Value::Array(items) => {
						for item in items {
							pairs.append_pair(name, &query_value(item));
						}
					},
					other => {
						pairs.append_pair(name, &query_value(other));
					},
				}
			}
		}

		Ok(url)
	}
}

/// Appends `path` to the path of `base`, keeping any base path prefix.
pub fn join_path(base: &Url, path: &str) -> Result<Url, ConfigError> {
	let joined = format!("{}/{}", base.as_str().trim_end_matches('/'), path.trim_start_matches('/'));

	Url::parse(&joined).map_err(|_| ConfigError::InvalidPath { path: path.into() })
}

fn to_json<T>(value: &T) -> Result<Value>
where
	T: ?Sized + Serialize,
{
	serde_json::to_value(value).map_err(|e| crate::error::DecodeError::Serialize(e).into())
}

fn query_value(value: &Value) -> String {
	match value {
		Value::String(s) => s.clone(),
		Value::Null => String::new(),
		other => other.to_string(),
	}
}
