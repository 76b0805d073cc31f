//! Client configuration: base URL, transport defaults, credential wiring, and envelope policy.
//!
//! [`ClientConfig`] is plain serde data so it can be loaded from JSON next to the rest of an
//! application's settings; [`ClientConfigBuilder`] is the programmatic entry point. Both paths run
//! the same validation before a client is constructed.

/// Builder API for client configurations.
pub mod builder;

pub use builder::*;

// std
use std::{fs, path::Path};
// self
use crate::{
	_prelude::*,
	auth::{CredentialKeys, TokenSecret},
	envelope::EnvelopePolicy,
	error::ConfigError,
	request,
};

const DEFAULT_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_REFRESH_PATH: &str = "/refresh_token";
const DEFAULT_LOGIN_ROUTE: &str = "/pages/login/login";
const DEFAULT_AUTH_HEADER: &str = "Authorization";

/// Settings for a single named client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
	/// Base URL every request path is appended to.
	pub base_url: Url,
	/// Per-request timeout in milliseconds; `0` disables the timeout.
	#[serde(default = "default_timeout_ms")]
	pub request_timeout_ms: u64,
	/// Headers sent with every request.
	#[serde(default = "default_headers")]
	pub default_headers: BTreeMap<String, String>,
	/// Refresh endpoint path, relative to `base_url`.
	#[serde(default = "default_refresh_path")]
	pub refresh_path: String,
	/// Route handed to the navigator after an unrecoverable auth failure.
	#[serde(default = "default_login_route")]
	pub login_route: String,
	/// Store keys for the access and refresh tokens.
	#[serde(default)]
	pub credential_keys: CredentialKeys,
	/// Header that carries the access token.
	#[serde(default = "default_auth_header")]
	pub auth_header: String,
	/// Optional scheme placed before the token (e.g. `Bearer`); the raw token is sent when unset.
	#[serde(default)]
	pub auth_scheme: Option<String>,
	/// Success and expiry codes recognized in response envelopes.
	#[serde(default)]
	pub envelope: EnvelopePolicy,
}
impl ClientConfig {
	/// Creates a configuration with default settings for `base_url`.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			request_timeout_ms: DEFAULT_TIMEOUT_MS,
			default_headers: default_headers(),
			refresh_path: DEFAULT_REFRESH_PATH.into(),
			login_route: DEFAULT_LOGIN_ROUTE.into(),
			credential_keys: CredentialKeys::default(),
			auth_header: DEFAULT_AUTH_HEADER.into(),
			auth_scheme: None,
			envelope: EnvelopePolicy::default(),
		}
	}

	/// Creates a builder seeded with defaults for `base_url`.
	pub fn builder(base_url: Url) -> ClientConfigBuilder {
		ClientConfigBuilder::new(base_url)
	}

	/// Absolute URL of the refresh endpoint.
	pub fn refresh_url(&self) -> Result<Url, ConfigError> {
		request::join_path(&self.base_url, &self.refresh_path)
	}

	/// Per-request timeout, if enabled.
	pub fn timeout(&self) -> Option<Duration> {
		(self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
	}

	/// Header value carrying `token`.
	pub fn authorization_value(&self, token: &TokenSecret) -> String {
		match self.auth_scheme.as_deref().filter(|scheme| !scheme.is_empty()) {
			Some(scheme) => format!("{scheme} {}", token.expose()),
			None => token.expose().to_owned(),
		}
	}

	/// Validates invariants for the configuration.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if !matches!(self.base_url.scheme(), "http" | "https") {
			return Err(ConfigError::UnsupportedScheme { url: self.base_url.to_string() });
		}
		if !self.refresh_path.starts_with('/') {
			return Err(ConfigError::InvalidRefreshPath { path: self.refresh_path.clone() });
		}

		self.refresh_url()?;

		if self.auth_header.trim().is_empty() {
			return Err(ConfigError::EmptyAuthHeader);
		}

		validate_header(&self.auth_header, "")?;

		for (name, value) in &self.default_headers {
			validate_header(name, value)?;
		}

		validate_envelope(&self.envelope)
	}
}

/// Configuration for the two named clients an application talks to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicesConfig {
	/// Client used by regular application calls.
	pub default: ClientConfig,
	/// Client used by administrative calls.
	pub admin: ClientConfig,
}
impl ServicesConfig {
	/// Parses and validates a JSON document.
	pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
		let mut deserializer = serde_json::Deserializer::from_str(json);
		let config: Self = serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
			ConfigError::Parse { path: e.path().to_string(), message: e.inner().to_string() }
		})?;

		config.validate()?;

		Ok(config)
	}

	/// Reads, parses, and validates a JSON file.
	pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let json = fs::read_to_string(path).map_err(|e| ConfigError::Read {
			path: path.display().to_string(),
			message: e.to_string(),
		})?;

		Self::from_json_str(&json)
	}

	/// Validates both client configurations.
	pub fn validate(&self) -> Result<(), ConfigError> {
		self.default.validate()?;
		self.admin.validate()
	}
}

fn default_timeout_ms() -> u64 {
	DEFAULT_TIMEOUT_MS
}

fn default_headers() -> BTreeMap<String, String> {
	BTreeMap::from([
		("Content-Type".to_owned(), "application/json".to_owned()),
		("platform".to_owned(), "H5".to_owned()),
	])
}

fn default_refresh_path() -> String {
	DEFAULT_REFRESH_PATH.into()
}

fn default_login_route() -> String {
	DEFAULT_LOGIN_ROUTE.into()
}

fn default_auth_header() -> String {
	DEFAULT_AUTH_HEADER.into()
}

fn validate_header(name: &str, value: &str) -> Result<(), ConfigError> {
	let name_ok = !name.is_empty()
		&& name.bytes().all(|b| b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?={}".contains(&b));
	let value_ok = value.bytes().all(|b| b == b'\t' || (b >= 0x20 && b != 0x7f));

	if name_ok && value_ok { Ok(()) } else { Err(ConfigError::InvalidHeader { name: name.into() }) }
}

fn validate_envelope(policy: &EnvelopePolicy) -> Result<(), ConfigError> {
	if policy.expiry_codes.is_empty() && policy.expiry_statuses.is_empty() {
		return Err(ConfigError::NoExpirySignals);
	}
	if let Some(code) = policy.expiry_codes.iter().find(|code| policy.success_codes.contains(code))
	{
		return Err(ConfigError::OverlappingCodes { code: *code });
	}

	Ok(())
}
