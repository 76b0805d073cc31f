//! Client-level error types shared across the request pipeline, refresh coordinator, and stores.

// self
use crate::{_prelude::*, envelope::ExpirySignal, request::Method};

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// The request was superseded by an identical request issued while it was still pending.
	///
	/// Treat the original call as abandoned rather than failed; it must not be retried
	/// automatically.
	#[error("Request `{method} {path}` was superseded by an identical request.")]
	Cancelled {
		/// Method of the abandoned request.
		method: Method,
		/// Path of the abandoned request.
		path: String,
	},
	/// The credential could not be refreshed; stored credentials were cleared.
	#[error(transparent)]
	Refresh(#[from] RefreshError),
	/// The service reported an expired credential again after the one permitted retry.
	#[error("Credential still rejected for `{path}` after a refresh ({signal}).")]
	AuthExpired {
		/// Path of the rejected request.
		path: String,
		/// Signal reported by the service on the retried attempt.
		signal: ExpirySignal,
	},
	/// The service answered with a non-success application code.
	#[error("Service returned application error code {}.", display_code(.code))]
	Application {
		/// Application code, when the envelope carried one.
		code: Option<i64>,
		/// Raw response envelope.
		envelope: Value,
	},
	/// The service answered with a non-2xx HTTP status that is not an expiry signal.
	#[error("Service responded with HTTP status {status}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Lossy UTF-8 preview of the response body.
		body: String,
	},
	/// Request or response payload could not be (de)serialized.
	#[error(transparent)]
	Decode(#[from] DecodeError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Local configuration or request-shape problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Credential store failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
}
impl Error {
	/// Returns true when the request was preempted by a duplicate.
	pub fn is_cancelled(&self) -> bool {
		matches!(self, Self::Cancelled { .. })
	}

	/// Returns true when the failure means the user has to authenticate again.
	pub fn is_auth_failure(&self) -> bool {
		matches!(self, Self::Refresh(_) | Self::AuthExpired { .. })
	}
}

fn display_code(code: &Option<i64>) -> String {
	code.map_or_else(|| "<missing>".into(), |code| code.to_string())
}

/// Configuration and validation failures raised by the client.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum ConfigError {
	/// Base URL uses a scheme other than `http`/`https`.
	#[error("Base URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// Rejected base URL.
		url: String,
	},
	/// Base URL cannot be parsed.
	#[error("Base URL is invalid: {url}.")]
	InvalidBaseUrl {
		/// Rejected base URL.
		url: String,
	},
	/// Refresh path does not start with `/`.
	#[error("Refresh path must start with `/`: {path}.")]
	InvalidRefreshPath {
		/// Rejected path.
		path: String,
	},
	/// Authorization header name is empty.
	#[error("Authorization header name cannot be empty.")]
	EmptyAuthHeader,
	/// No expiry code or HTTP status is configured.
	#[error("At least one expiry signal must be configured.")]
	NoExpirySignals,
	/// A code is listed both as success and as expiry.
	#[error("Code {code} cannot denote both success and expiry.")]
	OverlappingCodes {
		/// Offending code.
		code: i64,
	},
	/// Request path could not be joined onto the base URL.
	#[error("Request path `{path}` does not form a valid URL.")]
	InvalidPath {
		/// Rejected path.
		path: String,
	},
	/// Query parameters must serialize to a JSON object (or nothing).
	#[error("Query parameters must serialize to a JSON object.")]
	InvalidQuery,
	/// A header name or value is not valid for HTTP.
	#[error("Header `{name}` is invalid.")]
	InvalidHeader {
		/// Offending header name.
		name: String,
	},
	/// Configuration file could not be read.
	#[error("Configuration file {path} could not be read: {message}.")]
	Read {
		/// File path.
		path: String,
		/// I/O failure message.
		message: String,
	},
	/// Configuration document could not be parsed.
	#[error("Configuration could not be parsed at `{path}`: {message}.")]
	Parse {
		/// JSON path of the failing field.
		path: String,
		/// Parser message.
		message: String,
	},
	/// Service name does not match a configured client.
	#[error("Unknown service `{name}`; expected `default` or `admin`.")]
	UnknownService {
		/// Rejected name.
		name: String,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed: {message}.")]
	HttpClientBuild {
		/// Builder failure message.
		message: String,
	},
}

/// Serialization failures for outbound requests and inbound responses.
#[derive(Debug, ThisError)]
pub enum DecodeError {
	/// Outbound params/body could not be serialized to JSON.
	#[error("Request payload could not be serialized.")]
	Serialize(#[source] serde_json::Error),
	/// Response body is not valid JSON.
	#[error("Response body (HTTP {status}) is not valid JSON.")]
	Body {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the response.
		status: u16,
	},
	/// Success payload does not match the requested type.
	#[error("Response payload does not match the expected shape.")]
	Payload(#[source] serde_path_to_error::Error<serde_json::Error>),
}

/// Transport-level failures.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the service.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The call exceeded the configured timeout.
	#[error("Request timed out.")]
	Timeout,
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::Timeout } else { Self::network(e) }
	}
}

/// Reasons a refresh cycle failed.
///
/// The value is cloned to every request queued behind the failed refresh, so it only carries
/// owned, printable data.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RefreshError {
	/// Refresh endpoint answered with a non-success application code or HTTP status.
	#[error("Refresh endpoint rejected the request (status {status}, code {}).", display_code(.code))]
	Rejected {
		/// HTTP status code.
		status: u16,
		/// Application code, when present.
		code: Option<i64>,
	},
	/// Refresh endpoint itself reported an expired credential.
	#[error("Refresh endpoint reported an expired credential ({signal}).")]
	Expired {
		/// Signal returned by the refresh endpoint.
		signal: ExpirySignal,
	},
	/// Success envelope did not contain a new access token.
	#[error("Refresh response did not include a new access token.")]
	MissingToken,
	/// Network failure while calling the refresh endpoint.
	#[error("Refresh call failed: {message}.")]
	Transport {
		/// Printable transport failure.
		message: String,
	},
	/// Refresh response could not be decoded.
	#[error("Refresh response could not be decoded: {message}.")]
	Decode {
		/// Printable decode failure.
		message: String,
	},
	/// New credentials could not be persisted.
	#[error("Refreshed credentials could not be stored: {message}.")]
	Storage {
		/// Printable storage failure.
		message: String,
	},
	/// The task driving the refresh was dropped before it settled.
	#[error("Refresh was abandoned before it completed.")]
	Abandoned,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::StoreError;

	#[test]
	fn store_error_converts_into_client_error_with_source() {
		let store_error = StoreError::Backend { message: "disk unavailable".into() };
		let client_error: Error = store_error.clone().into();

		assert!(matches!(client_error, Error::Storage(_)));
		assert!(client_error.to_string().contains("disk unavailable"));

		let source = StdError::source(&client_error)
			.expect("Client error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn classification_helpers_cover_variants() {
		let cancelled = Error::Cancelled { method: Method::Get, path: "/profile".into() };
		let refresh = Error::from(RefreshError::MissingToken);
		let expired =
			Error::AuthExpired { path: "/orders".into(), signal: ExpirySignal::Code(-101) };
		let application = Error::Application { code: Some(-5), envelope: Value::Null };

		assert!(cancelled.is_cancelled());
		assert!(!cancelled.is_auth_failure());
		assert!(refresh.is_auth_failure());
		assert!(expired.is_auth_failure());
		assert!(!application.is_cancelled());
		assert!(!application.is_auth_failure());
		assert_eq!(
			cancelled.to_string(),
			"Request `GET /profile` was superseded by an identical request."
		);
		assert_eq!(application.to_string(), "Service returned application error code -5.");
	}

	#[test]
	fn missing_application_code_is_printable() {
		let err = Error::Application { code: None, envelope: Value::Null };

		assert_eq!(err.to_string(), "Service returned application error code <missing>.");
	}
}
