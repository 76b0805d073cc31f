//! Authenticated HTTP client with single-flight token refresh and duplicate-request suppression.
//!
//! Every call goes through the same pipeline: compute a [`request::RequestKey`], register it in
//! the [`dedup::InFlightRegistry`] (aborting an identical call still in flight), dispatch over an
//! [`http::HttpTransport`], classify the response envelope, and, on an auth-expiry signal, wait on
//! the [`refresh::RefreshCoordinator`] before retrying once with the new credential.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]
// Unit tests also link the self dev-dependency that turns on `test` for integration tests.
#![cfg_attr(test, allow(unused_crate_dependencies))]

pub mod auth;
pub mod client;
pub mod config;
pub mod dedup;
pub mod envelope;
pub mod error;
pub mod http;
pub mod navigate;
pub mod obs;
pub mod refresh;
pub mod request;
pub mod store;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;
	use crate::{
		client::Client,
		config::ClientConfig,
		error::TransportError,
		http::{HttpTransport, TransportFuture, TransportRequest, TransportResponse},
		navigate::Navigator,
		store::{CredentialStore, MemoryStore},
	};

	/// Navigator that records every redirect so tests can assert on them.
	#[derive(Debug, Default)]
	pub struct RecordingNavigator(Mutex<Vec<String>>);
	impl RecordingNavigator {
		/// Routes recorded so far, oldest first.
		pub fn routes(&self) -> Vec<String> {
			self.0.lock().clone()
		}

		/// Number of redirects observed.
		pub fn count(&self) -> usize {
			self.0.lock().len()
		}
	}
	impl Navigator for RecordingNavigator {
		fn redirect_to_login(&self, route: &str) {
			self.0.lock().push(route.to_owned());
		}
	}

	type Responder = Box<dyn Fn(&TransportRequest) -> TransportResponse + Send + Sync>;

	/// In-process transport that answers every request through a closure and keeps a log.
	pub struct ScriptedTransport {
		responder: Responder,
		log: Mutex<Vec<TransportRequest>>,
	}
	impl ScriptedTransport {
		/// Builds a transport that answers with `responder`.
		pub fn new(
			responder: impl 'static + Fn(&TransportRequest) -> TransportResponse + Send + Sync,
		) -> Self {
			Self { responder: Box::new(responder), log: Mutex::new(Vec::new()) }
		}

		/// Requests observed so far, oldest first.
		pub fn requests(&self) -> Vec<TransportRequest> {
			self.log.lock().clone()
		}

		/// Requests whose URL path equals `path`.
		pub fn requests_to(&self, path: &str) -> Vec<TransportRequest> {
			self.log.lock().iter().filter(|request| request.url.path() == path).cloned().collect()
		}
	}
	impl HttpTransport for ScriptedTransport {
		fn send(&self, request: TransportRequest) -> TransportFuture<'_> {
			let response = (self.responder)(&request);

			self.log.lock().push(request);

			Box::pin(async move { Ok::<_, TransportError>(response) })
		}
	}

	/// JSON envelope response with the provided HTTP status.
	pub fn envelope_response(status: u16, envelope: serde_json::Value) -> TransportResponse {
		TransportResponse { status, body: envelope.to_string().into_bytes() }
	}

	/// Builds a reqwest transport that accepts the self-signed certificates produced by `httpmock`
	/// during tests.
	#[cfg(feature = "reqwest")]
	pub fn test_reqwest_transport() -> ReqwestTransport {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure reqwest client for tests.");

		ReqwestTransport::with_client(client)
	}

	/// Builds a client over `transport`, an in-memory store seeded with `access`, and a recording
	/// navigator.
	pub fn build_test_client<T>(
		config: ClientConfig,
		transport: Arc<T>,
		access: Option<&str>,
	) -> (Client<T>, Arc<MemoryStore>, Arc<RecordingNavigator>)
	where
		T: HttpTransport,
	{
		let store_backend = Arc::new(MemoryStore::default());

		if let Some(token) = access {
			store_backend
				.set(config.credential_keys.access.as_str(), token)
				.expect("Seeding the in-memory store should never fail.");
		}

		let store: Arc<dyn CredentialStore> = store_backend.clone();
		let navigator = Arc::new(RecordingNavigator::default());
		let client = Client::with_transport(config, transport, store, navigator.clone())
			.expect("Test client configuration should be valid.");

		(client, store_backend, navigator)
	}

	/// Parses a URL fixture.
	pub fn url(value: &str) -> Url {
		Url::parse(value).expect("URL fixture should parse.")
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
		time::Duration,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
