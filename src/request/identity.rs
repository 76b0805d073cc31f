//! Deterministic request fingerprints used for duplicate suppression.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, request::RequestDescriptor};

/// Fingerprint of a request's method, path, params, and body.
///
/// Two descriptors with equal keys are duplicates. The key is the unpadded base64 SHA-256 digest
/// of a canonical rendering in which every JSON object has its keys sorted, so it does not depend
/// on field order inside params or body. Headers and the retry flag are not part of the identity.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestKey(String);
impl RequestKey {
	/// Computes the key for `descriptor`.
	pub fn of(descriptor: &RequestDescriptor) -> Self {
		let mut canonical = String::new();

		canonical.push_str(descriptor.method.as_str());
		canonical.push('\n');
		canonical.push_str(&descriptor.path);
		canonical.push('\n');
		write_canonical(&query_params(descriptor.params.as_ref()), &mut canonical);
		canonical.push('\n');
		write_canonical(descriptor.body.as_ref().unwrap_or(&Value::Null), &mut canonical);

		let mut hasher = Sha256::new();

		hasher.update(canonical.as_bytes());

		Self(STANDARD_NO_PAD.encode(hasher.finalize()))
	}

	/// Returns the encoded fingerprint.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Debug for RequestKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("RequestKey").field(&self.0).finish()
	}
}
impl Display for RequestKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

// Top-level `null` params never reach the query string, so they do not count toward identity.
fn query_params(params: Option<&Value>) -> Value {
	match params {
		Some(Value::Object(map)) => Value::Object(
			map.iter()
				.filter(|(_, value)| !value.is_null())
				.map(|(name, value)| (name.clone(), value.clone()))
				.collect(),
		),
		Some(other) => other.clone(),
		None => Value::Object(Default::default()),
	}
}

fn write_canonical(value: &Value, buf: &mut String) {
	match value {
		Value::Object(map) => {
			let mut entries = map.iter().collect::<Vec<_>>();

			entries.sort_by(|(a, _), (b, _)| a.cmp(b));
			buf.push('{');

			for (idx, (name, value)) in entries.into_iter().enumerate() {
				if idx > 0 {
					buf.push(',');
				}

				buf.push_str(&Value::String(name.clone()).to_string());
				buf.push(':');
				write_canonical(value, buf);
			}

			buf.push('}');
		},
		Value::Array(items) => {
			buf.push('[');

			for (idx, item) in items.iter().enumerate() {
				if idx > 0 {
					buf.push(',');
				}

				write_canonical(item, buf);
			}

			buf.push(']');
		},
		scalar => buf.push_str(&scalar.to_string()),
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;
	use crate::request::Method;

	fn descriptor(params: Value, body: Value) -> RequestDescriptor {
		let mut descriptor = RequestDescriptor::new(Method::Post, "/orders");

		descriptor.params = Some(params);
		descriptor.body = Some(body);

		descriptor
	}

	#[test]
	fn key_ignores_object_field_order() {
		let a = descriptor(
			json!({ "page": 1, "filter": { "state": "open", "owner": "me" } }),
			json!({ "b": [1, 2], "a": true }),
		);
		let b = descriptor(
			json!({ "filter": { "owner": "me", "state": "open" }, "page": 1 }),
			json!({ "a": true, "b": [1, 2] }),
		);

		assert_eq!(a.key(), b.key());
	}

	#[test]
	fn key_distinguishes_method_path_params_and_body() {
		let base = descriptor(json!({ "page": 1 }), json!({ "id": 7 }));
		let mut other_method = base.clone();
		let mut other_path = base.clone();
		let other_params = descriptor(json!({ "page": 2 }), json!({ "id": 7 }));
		let other_body = descriptor(json!({ "page": 1 }), json!({ "id": 8 }));

		other_method.method = Method::Put;
		other_path.path = "/orders/7".into();

		for other in [other_method, other_path, other_params, other_body] {
			assert_ne!(base.key(), other.key());
		}
	}

	#[test]
	fn key_ignores_headers_and_retry_flag() {
		let base = descriptor(json!({}), json!(null));
		let mut decorated = base.clone().with_header("X-Trace", "abc");

		decorated.retried = true;

		assert_eq!(base.key(), decorated.key());
	}

	#[test]
	fn null_params_match_missing_params() {
		let mut bare = RequestDescriptor::new(Method::Get, "/orders");
		let with_null = bare
			.clone()
			.with_params(&json!({ "cursor": null }))
			.expect("Params should encode.");
		let base = Url::parse("https://api.example.com").expect("Base URL fixture should parse.");

		assert_eq!(bare.url(&base).ok(), with_null.url(&base).ok());
		assert_eq!(bare.key(), with_null.key());

		bare = bare.with_params(&json!({})).expect("Params should encode.");

		assert_eq!(bare.key(), with_null.key());
	}

	#[test]
	fn array_order_is_significant() {
		let a = descriptor(json!({ "ids": [1, 2] }), json!(null));
		let b = descriptor(json!({ "ids": [2, 1] }), json!(null));

		assert_ne!(a.key(), b.key());
	}
}
