//! Response envelope decoding.
//!
//! Services wrap payloads as `{ "code": <number|string>, "data": <payload>, ... }`. The envelope is
//! decoded once at the boundary into a [`ResponseOutcome`] so the rest of the pipeline never looks
//! at magic codes again.

// self
use crate::{_prelude::*, error::DecodeError, http::TransportResponse};

const BODY_PREVIEW_LIMIT: usize = 256;

/// Indicator that the credential attached to a request is no longer valid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpirySignal {
	/// Application-level envelope code (e.g. `-101`).
	Code(i64),
	/// Protocol-level HTTP status (e.g. `401`).
	HttpStatus(u16),
}
impl Display for ExpirySignal {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Code(code) => write!(f, "code {code}"),
			Self::HttpStatus(status) => write!(f, "HTTP {status}"),
		}
	}
}

/// Which codes and statuses the client recognizes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvelopePolicy {
	/// Envelope codes that denote success.
	pub success_codes: Vec<i64>,
	/// Envelope codes that denote an expired credential.
	pub expiry_codes: Vec<i64>,
	/// HTTP statuses that denote an expired credential.
	pub expiry_statuses: Vec<u16>,
}
impl Default for EnvelopePolicy {
	fn default() -> Self {
		Self {
			success_codes: vec![0, 200],
			expiry_codes: vec![-103, -101],
			expiry_statuses: vec![401],
		}
	}
}
impl EnvelopePolicy {
	/// Classifies a transport response.
	///
	/// Expiry statuses win over everything else, then non-2xx statuses surface as
	/// [`ResponseOutcome::Status`]. For 2xx responses the body must be a JSON envelope; a missing or
	/// unrecognized `code` is an application error.
	pub fn classify(&self, response: &TransportResponse) -> Result<ResponseOutcome, DecodeError> {
		if self.expiry_statuses.contains(&response.status) {
			return Ok(ResponseOutcome::AuthExpired(ExpirySignal::HttpStatus(response.status)));
		}
		if !(200..300).contains(&response.status) {
			return Ok(ResponseOutcome::Status {
				status: response.status,
				body: body_preview(&response.body),
			});
		}

		let mut envelope = decode_body(response)?;
		let code = envelope.get("code").and_then(parse_code);

		match code {
			Some(code) if self.success_codes.contains(&code) => {
				let data = envelope.as_object_mut().and_then(|map| map.remove("data"));

				Ok(ResponseOutcome::Success(data.unwrap_or(Value::Null)))
			},
			Some(code) if self.expiry_codes.contains(&code) =>
				Ok(ResponseOutcome::AuthExpired(ExpirySignal::Code(code))),
			code => Ok(ResponseOutcome::Application { code, envelope }),
		}
	}
}

/// Tagged result of a single response.
#[derive(Clone, Debug, PartialEq)]
pub enum ResponseOutcome {
	/// Success code; carries the envelope's `data` field (or `null`).
	Success(Value),
	/// The credential expired and must be refreshed.
	AuthExpired(ExpirySignal),
	/// Non-success application code; carries the full envelope.
	Application {
		/// Parsed code, when the envelope carried one.
		code: Option<i64>,
		/// Raw envelope.
		envelope: Value,
	},
	/// Non-2xx HTTP status that is not an expiry signal.
	Status {
		/// HTTP status.
		status: u16,
		/// Lossy body preview.
		body: String,
	},
}

fn decode_body(response: &TransportResponse) -> Result<Value, DecodeError> {
	let mut deserializer = serde_json::Deserializer::from_slice(&response.body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| DecodeError::Body { source, status: response.status })
}

/// Decodes a success payload into `T`, reporting the failing JSON path.
pub fn decode_payload<T>(payload: Value) -> Result<T, DecodeError>
where
	T: DeserializeOwned,
{
	serde_path_to_error::deserialize(payload).map_err(DecodeError::Payload)
}

fn parse_code(value: &Value) -> Option<i64> {
	match value {
		Value::Number(number) => number.as_i64(),
		Value::String(text) => text.trim().parse().ok(),
		_ => None,
	}
}

fn body_preview(body: &[u8]) -> String {
	let text = String::from_utf8_lossy(body);

	match text.char_indices().nth(BODY_PREVIEW_LIMIT) {
		Some((idx, _)) => format!("{}…", &text[..idx]),
		None => text.into_owned(),
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	fn response(status: u16, body: Value) -> TransportResponse {
		TransportResponse { status, body: body.to_string().into_bytes() }
	}

	#[test]
	fn success_codes_unwrap_data() {
		let policy = EnvelopePolicy::default();
		let outcome = policy
			.classify(&response(200, json!({ "code": 0, "data": { "id": 1 }, "msg": "ok" })))
			.expect("Success envelope should classify.");

		assert_eq!(outcome, ResponseOutcome::Success(json!({ "id": 1 })));

		let outcome = policy
			.classify(&response(200, json!({ "code": "200" })))
			.expect("String codes should classify.");

		assert_eq!(outcome, ResponseOutcome::Success(Value::Null));
	}

	#[test]
	fn expiry_codes_and_statuses_are_recognized() {
		let policy = EnvelopePolicy::default();

		for code in [-101, -103] {
			let outcome = policy
				.classify(&response(200, json!({ "code": code })))
				.expect("Expiry envelope should classify.");

			assert_eq!(outcome, ResponseOutcome::AuthExpired(ExpirySignal::Code(code)));
		}

		let outcome = policy
			.classify(&TransportResponse { status: 401, body: b"<html>".to_vec() })
			.expect("Expiry status should classify without decoding the body.");

		assert_eq!(outcome, ResponseOutcome::AuthExpired(ExpirySignal::HttpStatus(401)));
	}

	#[test]
	fn other_codes_surface_the_envelope() {
		let policy = EnvelopePolicy::default();
		let envelope = json!({ "code": -7, "msg": "quota exceeded" });
		let outcome =
			policy.classify(&response(200, envelope.clone())).expect("Envelope should classify.");

		assert_eq!(outcome, ResponseOutcome::Application { code: Some(-7), envelope });

		let envelope = json!({ "msg": "no code" });
		let outcome =
			policy.classify(&response(200, envelope.clone())).expect("Envelope should classify.");

		assert_eq!(outcome, ResponseOutcome::Application { code: None, envelope });
	}

	#[test]
	fn non_success_status_is_reported_with_preview() {
		let policy = EnvelopePolicy { expiry_statuses: vec![], ..EnvelopePolicy::default() };
		let outcome = policy
			.classify(&TransportResponse { status: 401, body: b"denied".to_vec() })
			.expect("Status responses should classify.");

		assert_eq!(outcome, ResponseOutcome::Status { status: 401, body: "denied".into() });
	}

	#[test]
	fn malformed_body_reports_decode_error() {
		let err = EnvelopePolicy::default()
			.classify(&TransportResponse { status: 200, body: b"{\"code\":".to_vec() })
			.expect_err("Truncated JSON should fail to decode.");

		assert!(matches!(err, DecodeError::Body { status: 200, .. }));
	}

	#[test]
	fn payload_errors_carry_json_path() {
		#[derive(Debug, Deserialize)]
		struct Order {
			#[allow(dead_code)]
			items: Vec<u32>,
		}

		let err = decode_payload::<Order>(json!({ "items": [1, "two"] }))
			.expect_err("Mismatched payload should fail.");

		match err {
			DecodeError::Payload(inner) => assert_eq!(inner.path().to_string(), "items[1]"),
			other => panic!("Unexpected error: {other:?}"),
		}
	}
}
