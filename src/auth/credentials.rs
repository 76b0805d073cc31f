//! Credential pair persisted in the credential store.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	store::{CredentialStore, StoreError},
};

/// Store keys under which the access and refresh tokens live.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialKeys {
	/// Key holding the access token.
	pub access: String,
	/// Key holding the refresh token.
	pub refresh: String,
}
impl Default for CredentialKeys {
	fn default() -> Self {
		Self { access: "token".into(), refresh: "refresh_token".into() }
	}
}

/// Access token plus optional refresh token.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Credentials {
	/// Token attached to every outbound request.
	pub access: Option<TokenSecret>,
	/// Token sent to the refresh endpoint.
	pub refresh: Option<TokenSecret>,
}
impl Credentials {
	/// Reads both tokens; empty values count as absent.
	pub fn load(store: &dyn CredentialStore, keys: &CredentialKeys) -> Result<Self, StoreError> {
		Ok(Self {
			access: read_secret(store, &keys.access)?,
			refresh: read_secret(store, &keys.refresh)?,
		})
	}

	/// Reads only the access token.
	pub fn load_access(
		store: &dyn CredentialStore,
		keys: &CredentialKeys,
	) -> Result<Option<TokenSecret>, StoreError> {
		read_secret(store, &keys.access)
	}

	/// Writes the access token and, when present, the refresh token.
	///
	/// A missing refresh token leaves the stored one untouched so services that only rotate the
	/// access token keep working.
	pub fn persist(
		&self,
		store: &dyn CredentialStore,
		keys: &CredentialKeys,
	) -> Result<(), StoreError> {
		if let Some(access) = &self.access {
			store.set(&keys.access, access.expose())?;
		}
		if let Some(refresh) = &self.refresh {
			store.set(&keys.refresh, refresh.expose())?;
		}

		Ok(())
	}

	/// Removes both tokens from the store.
	pub fn clear(store: &dyn CredentialStore, keys: &CredentialKeys) -> Result<(), StoreError> {
		store.remove(&keys.access)?;
		store.remove(&keys.refresh)
	}
}

fn read_secret(store: &dyn CredentialStore, key: &str) -> Result<Option<TokenSecret>, StoreError> {
	Ok(store.get(key)?.and_then(TokenSecret::non_empty))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::MemoryStore;

	#[test]
	fn persist_keeps_refresh_token_when_not_rotated() {
		let store = MemoryStore::default();
		let keys = CredentialKeys::default();

		store.set("refresh_token", "refresh-1").expect("Seeding should succeed.");

		Credentials { access: Some(TokenSecret::new("access-2")), refresh: None }
			.persist(&store, &keys)
			.expect("Persisting credentials should succeed.");

		let loaded = Credentials::load(&store, &keys).expect("Loading credentials should succeed.");

		assert_eq!(loaded.access.as_ref().map(TokenSecret::expose), Some("access-2"));
		assert_eq!(loaded.refresh.as_ref().map(TokenSecret::expose), Some("refresh-1"));
	}

	#[test]
	fn empty_values_are_treated_as_absent() {
		let store = MemoryStore::default();
		let keys = CredentialKeys::default();

		store.set("token", "").expect("Seeding should succeed.");

		assert_eq!(Credentials::load_access(&store, &keys).expect("Load should succeed."), None);
	}

	#[test]
	fn clear_removes_both_tokens() {
		let store = MemoryStore::default();
		let keys = CredentialKeys { access: "a".into(), refresh: "r".into() };

		store.set("a", "1").expect("Seeding should succeed.");
		store.set("r", "2").expect("Seeding should succeed.");
		Credentials::clear(&store, &keys).expect("Clearing should succeed.");

		assert_eq!(
			Credentials::load(&store, &keys).expect("Load should succeed."),
			Credentials::default()
		);
	}
}
