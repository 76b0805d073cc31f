// std
use std::iter::IntoIterator;
// self
use crate::{
	_prelude::*,
	auth::CredentialKeys,
	config::ClientConfig,
	envelope::EnvelopePolicy,
	error::ConfigError,
};

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	config: ClientConfig,
}
impl ClientConfigBuilder {
	/// Creates a builder seeded with defaults for `base_url`.
	pub fn new(base_url: Url) -> Self {
		Self { config: ClientConfig::new(base_url) }
	}

	/// Creates a builder from a textual base URL.
	pub fn parse(base_url: &str) -> Result<Self, ConfigError> {
		Url::parse(base_url)
			.map(Self::new)
			.map_err(|_| ConfigError::InvalidBaseUrl { url: base_url.into() })
	}

	/// Sets the per-request timeout; a zero duration disables it.
	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.config.request_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);

		self
	}

	/// Adds or replaces a default header.
	pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.config.default_headers.insert(name.into(), value.into());

		self
	}

	/// Removes every default header, including the built-in ones.
	pub fn clear_default_headers(mut self) -> Self {
		self.config.default_headers.clear();

		self
	}

	/// Overrides the refresh endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.config.refresh_path = path.into();

		self
	}

	/// Overrides the login route used after an unrecoverable auth failure.
	pub fn login_route(mut self, route: impl Into<String>) -> Self {
		self.config.login_route = route.into();

		self
	}

	/// Overrides the credential store keys.
	pub fn credential_keys(mut self, keys: CredentialKeys) -> Self {
		self.config.credential_keys = keys;

		self
	}

	/// Overrides the header that carries the access token.
	pub fn auth_header(mut self, name: impl Into<String>) -> Self {
		self.config.auth_header = name.into();

		self
	}

	/// Places `scheme` before the token in the auth header.
	pub fn auth_scheme(mut self, scheme: impl Into<String>) -> Self {
		self.config.auth_scheme = Some(scheme.into());

		self
	}

	/// Replaces the envelope policy wholesale.
	pub fn envelope(mut self, policy: EnvelopePolicy) -> Self {
		self.config.envelope = policy;

		self
	}

	/// Replaces the envelope codes that denote success.
	pub fn success_codes<I>(mut self, codes: I) -> Self
	where
		I: IntoIterator<Item = i64>,
	{
		self.config.envelope.success_codes = codes.into_iter().collect();

		self
	}

	/// Replaces the envelope codes that denote an expired credential.
	pub fn expiry_codes<I>(mut self, codes: I) -> Self
	where
		I: IntoIterator<Item = i64>,
	{
		self.config.envelope.expiry_codes = codes.into_iter().collect();

		self
	}

	/// Replaces the HTTP statuses that denote an expired credential.
	pub fn expiry_statuses<I>(mut self, statuses: I) -> Self
	where
		I: IntoIterator<Item = u16>,
	{
		self.config.envelope.expiry_statuses = statuses.into_iter().collect();

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		self.config.validate()?;

		Ok(self.config)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn builder_applies_overrides() {
		let config = ClientConfigBuilder::parse("https://admin.example.com/v1")
			.expect("Base URL should parse.")
			.request_timeout(Duration::from_millis(1_500))
			.default_header("X-Tenant", "acme")
			.refresh_path("/auth/refresh")
			.login_route("/login")
			.auth_scheme("Bearer")
			.expiry_codes([-101])
			.expiry_statuses([401, 419])
			.build()
			.expect("Config should build.");

		assert_eq!(config.timeout(), Some(Duration::from_millis(1_500)));
		assert_eq!(config.default_headers.get("X-Tenant").map(String::as_str), Some("acme"));
		assert_eq!(config.default_headers.len(), 3);
		assert_eq!(config.refresh_path, "/auth/refresh");
		assert_eq!(config.envelope.expiry_statuses, vec![401, 419]);
	}

	#[test]
	fn cleared_defaults_keep_only_later_headers() {
		let config = ClientConfigBuilder::parse("https://api.example.com")
			.expect("Base URL should parse.")
			.clear_default_headers()
			.default_header("Accept", "application/json")
			.build()
			.expect("Config should build.");

		assert_eq!(
			config.default_headers,
			BTreeMap::from([("Accept".to_owned(), "application/json".to_owned())])
		);
	}

	#[test]
	fn builder_rejects_invalid_envelope_policy() {
		let base = Url::parse("https://api.example.com").expect("Base URL fixture should parse.");

		assert_eq!(
			ClientConfig::builder(base.clone()).expiry_codes([]).expiry_statuses([]).build(),
			Err(ConfigError::NoExpirySignals)
		);
		assert_eq!(
			ClientConfig::builder(base).success_codes([0, -101]).build(),
			Err(ConfigError::OverlappingCodes { code: -101 })
		);
		assert!(matches!(
			ClientConfigBuilder::parse("not a url"),
			Err(ConfigError::InvalidBaseUrl { .. })
		));
	}
}
