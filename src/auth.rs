//! Credential models: redacted token secrets, store key names, and the credential pair held by
//! the [`CredentialStore`](crate::store::CredentialStore).

pub mod credentials;
pub mod secret;

pub use credentials::*;
pub use secret::*;
