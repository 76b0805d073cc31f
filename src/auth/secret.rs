//! Access and refresh token values that stay out of logs.

// self
use crate::_prelude::*;

/// Token string that renders as `<redacted>` in `Debug` and `Display`.
///
/// The client never treats an empty string as a credential; use [`TokenSecret::non_empty`] when
/// reading values from storage or responses.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps `value` as-is.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Wraps `value` unless it is empty.
	pub fn non_empty(value: impl Into<String>) -> Option<Self> {
		Some(Self(value.into())).filter(|secret| !secret.is_empty())
	}

	/// Raw token. Only header construction and persistence should call this.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns true for an empty token.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "TokenSecret({self})")
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn formatting_never_reveals_the_token() {
		let secret = TokenSecret::new("tok-8f2a");

		assert_eq!(format!("{secret:?}"), "TokenSecret(<redacted>)");
		assert_eq!(secret.to_string(), "<redacted>");
		assert_eq!(secret.expose(), "tok-8f2a");
	}

	#[test]
	fn empty_values_are_not_credentials() {
		assert_eq!(TokenSecret::non_empty(""), None);
		assert_eq!(TokenSecret::non_empty("x").map(|s| s.expose().to_owned()), Some("x".into()));
		assert_eq!(
			serde_json::to_value(TokenSecret::new("abc")).expect("Token should serialize."),
			serde_json::json!("abc")
		);
	}
}
