//! Client facade that ties identity, dedup, transport, envelope decoding, and refresh together.

/// Named client group (`default` and `admin`).
pub mod services;

pub use services::*;

// crates.io
use futures::future::{Abortable, Aborted};
// self
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;
use crate::{
	_prelude::*,
	auth::{Credentials, TokenSecret},
	config::ClientConfig,
	dedup::InFlightRegistry,
	envelope::{self, ResponseOutcome},
	error::{ConfigError, DecodeError, RefreshError},
	http::{HttpTransport, TransportRequest, TransportResponse},
	navigate::Navigator,
	obs::{self, Operation, OperationSpan, Outcome},
	refresh::{RefreshCoordinator, RefreshMetrics},
	request::{Method, RequestDescriptor, RequestKey},
	store::CredentialStore,
};

/// Client specialized for the default reqwest transport.
#[cfg(feature = "reqwest")]
pub type ReqwestApiClient = Client<ReqwestTransport>;

/// Authenticated HTTP client.
///
/// Cloning is cheap; clones share the transport, credential store, in-flight registry, and refresh
/// coordinator, so duplicate suppression and single-flight refresh span every clone.
pub struct Client<T>
where
	T: ?Sized + HttpTransport,
{
	transport: Arc<T>,
	store: Arc<dyn CredentialStore>,
	navigator: Arc<dyn Navigator>,
	config: Arc<ClientConfig>,
	in_flight: Arc<InFlightRegistry>,
	coordinator: Arc<RefreshCoordinator>,
}
impl<T> Client<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a client over a caller-provided transport.
	pub fn with_transport(
		config: ClientConfig,
		transport: Arc<T>,
		store: Arc<dyn CredentialStore>,
		navigator: Arc<dyn Navigator>,
	) -> Result<Self, ConfigError> {
		config.validate()?;

		Ok(Self {
			transport,
			store,
			navigator,
			config: Arc::new(config),
			in_flight: Arc::new(InFlightRegistry::default()),
			coordinator: Arc::new(RefreshCoordinator::default()),
		})
	}

	/// Validated configuration.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Transport used for every call.
	pub fn transport(&self) -> &Arc<T> {
		&self.transport
	}

	/// Registry of requests currently in flight.
	pub fn in_flight(&self) -> &InFlightRegistry {
		&self.in_flight
	}

	/// Refresh state machine shared by every clone of this client.
	pub fn coordinator(&self) -> &RefreshCoordinator {
		&self.coordinator
	}

	/// Refresh counters for this client.
	pub fn refresh_metrics(&self) -> &Arc<RefreshMetrics> {
		self.coordinator.metrics()
	}

	/// Issues `GET path` with `params` encoded as the query string.
	pub async fn get<R, P>(&self, path: impl Into<String>, params: &P) -> Result<R>
	where
		R: DeserializeOwned,
		P: ?Sized + Serialize,
	{
		self.request(RequestDescriptor::new(Method::Get, path).with_params(params)?).await
	}

	/// Issues `DELETE path` with `params` encoded as the query string.
	pub async fn delete<R, P>(&self, path: impl Into<String>, params: &P) -> Result<R>
	where
		R: DeserializeOwned,
		P: ?Sized + Serialize,
	{
		self.request(RequestDescriptor::new(Method::Delete, path).with_params(params)?).await
	}

	/// Issues `POST path` with `body` serialized as JSON.
	pub async fn post<R, B>(&self, path: impl Into<String>, body: &B) -> Result<R>
	where
		R: DeserializeOwned,
		B: ?Sized + Serialize,
	{
		self.request(RequestDescriptor::new(Method::Post, path).with_body(body)?).await
	}

	/// Issues `PUT path` with `body` serialized as JSON.
	pub async fn put<R, B>(&self, path: impl Into<String>, body: &B) -> Result<R>
	where
		R: DeserializeOwned,
		B: ?Sized + Serialize,
	{
		self.request(RequestDescriptor::new(Method::Put, path).with_body(body)?).await
	}

	/// Executes `descriptor` and decodes the success payload into `R`.
	///
	/// An identical request issued while this one is pending makes this call fail with
	/// [`Error::Cancelled`]. An auth-expiry signal waits for a single shared refresh and replays the
	/// call once with the new credential.
	pub async fn request<R>(&self, descriptor: RequestDescriptor) -> Result<R>
	where
		R: DeserializeOwned,
	{
		let span = OperationSpan::new(Operation::Request, "request");

		obs::record_outcome(Operation::Request, Outcome::Attempt);

		let result = span.instrument(self.execute(descriptor)).await;
		let outcome = match &result {
			Ok(_) => Outcome::Success,
			Err(e) if e.is_cancelled() => Outcome::Cancelled,
			Err(_) => Outcome::Failure,
		};

		obs::record_outcome(Operation::Request, outcome);

		Ok(envelope::decode_payload(result?)?)
	}

	/// Runs the single-flight refresh directly.
	///
	/// If a refresh is already in flight this waits for it instead of starting another one. On
	/// failure the stored credentials are cleared and the navigator is sent to the login route.
	pub async fn refresh_credentials(&self) -> Result<TokenSecret> {
		Ok(self.coordinator.refresh_or_wait(|| self.run_refresh()).await?)
	}

	async fn execute(&self, mut descriptor: RequestDescriptor) -> Result<Value> {
		let key = descriptor.key();
		let url = descriptor.url(&self.config.base_url)?;
		let body = descriptor
			.body
			.as_ref()
			.map(serde_json::to_vec)
			.transpose()
			.map_err(DecodeError::Serialize)?;

		loop {
			let sent_with = Credentials::load_access(&*self.store, &self.config.credential_keys)?;
			let outcome =
				self.dispatch(&descriptor, &key, &url, body.clone(), sent_with.as_ref()).await?;

			match outcome {
				ResponseOutcome::Success(data) => return Ok(data),
				ResponseOutcome::Application { code, envelope } =>
					return Err(Error::Application { code, envelope }),
				ResponseOutcome::Status { status, body } => return Err(Error::Status { status, body }),
				ResponseOutcome::AuthExpired(signal) => {
					obs::log_expired(&descriptor.path, signal, !descriptor.retried);

					if descriptor.retried {
						return Err(Error::AuthExpired { path: descriptor.path, signal });
					}

					descriptor.retried = true;

					let current =
						Credentials::load_access(&*self.store, &self.config.credential_keys)?;

					match (&sent_with, &current) {
						// A failed refresh cleared the session while this request was on the wire.
						(Some(_), None) =>
							return Err(Error::AuthExpired { path: descriptor.path, signal }),
						(None, None) => {
							self.refresh_credentials().await?;
						},
						(Some(sent), Some(current)) if sent == current => {
							self.refresh_credentials().await?;
						},
						// A refresh that settled after this request was sent already rotated the
						// token.
						_ => {},
					}

					obs::record_outcome(Operation::Request, Outcome::Retried);
				},
			}
		}
	}

	async fn dispatch(
		&self,
		descriptor: &RequestDescriptor,
		key: &RequestKey,
		url: &Url,
		body: Option<Vec<u8>>,
		token: Option<&TokenSecret>,
	) -> Result<ResponseOutcome> {
		let request =
			self.transport_request(descriptor.method, url.clone(), &descriptor.headers, body, token);
		let (guard, registration) = self.in_flight.register(key.clone());

		obs::log_dispatch(descriptor.method.as_str(), url, descriptor.retried);

		let response = Abortable::new(self.transport.send(request), registration).await;

		drop(guard);

		match response {
			Ok(response) => Ok(self.config.envelope.classify(&response?)?),
			Err(Aborted) =>
				Err(Error::Cancelled { method: descriptor.method, path: descriptor.path.clone() }),
		}
	}

	fn transport_request(
		&self,
		method: Method,
		url: Url,
		headers: &BTreeMap<String, String>,
		body: Option<Vec<u8>>,
		token: Option<&TokenSecret>,
	) -> TransportRequest {
		let mut merged = self.config.default_headers.clone();

		for (name, value) in headers {
			merged.retain(|existing, _| !existing.eq_ignore_ascii_case(name));
			merged.insert(name.clone(), value.clone());
		}
		if let Some(token) = token {
			merged.retain(|existing, _| !existing.eq_ignore_ascii_case(&self.config.auth_header));
			merged.insert(self.config.auth_header.clone(), self.config.authorization_value(token));
		}

		TransportRequest { method, url, headers: merged, body, timeout: self.config.timeout() }
	}

	async fn run_refresh(&self) -> Result<TokenSecret, RefreshError> {
		let result = self.request_new_credentials().await;

		if result.is_err() {
			if let Err(e) = Credentials::clear(&*self.store, &self.config.credential_keys) {
				obs::log_clear_failed(&e);
			}

			self.navigator.redirect_to_login(&self.config.login_route);
		}

		result
	}

	async fn request_new_credentials(&self) -> Result<TokenSecret, RefreshError> {
		let keys = &self.config.credential_keys;
		let current = Credentials::load(&*self.store, keys)
			.map_err(|e| RefreshError::Storage { message: e.to_string() })?;
		let url = self
			.config
			.refresh_url()
			.map_err(|e| RefreshError::Transport { message: e.to_string() })?;
		let body = current
			.refresh
			.as_ref()
			.map(|refresh| serde_json::to_vec(&RefreshRequest { refresh_token: refresh.expose() }))
			.transpose()
			.map_err(|e| RefreshError::Decode { message: e.to_string() })?;
		let request =
			self.transport_request(Method::Post, url, &BTreeMap::new(), body, current.access.as_ref());

		obs::log_dispatch(Method::Post.as_str(), &request.url, false);

		let response = self
			.transport
			.send(request)
			.await
			.map_err(|e| RefreshError::Transport { message: e.to_string() })?;
		let token = self.parse_refresh_response(&response)?;
		let rotated = Credentials { access: Some(token.access.clone()), refresh: token.refresh };

		rotated
			.persist(&*self.store, keys)
			.map_err(|e| RefreshError::Storage { message: e.to_string() })?;

		Ok(token.access)
	}

	fn parse_refresh_response(
		&self,
		response: &TransportResponse,
	) -> Result<RefreshedToken, RefreshError> {
		let outcome = self
			.config
			.envelope
			.classify(response)
			.map_err(|e| RefreshError::Decode { message: e.to_string() })?;
		let data = match outcome {
			ResponseOutcome::Success(data) => data,
			ResponseOutcome::AuthExpired(signal) => return Err(RefreshError::Expired { signal }),
			ResponseOutcome::Application { code, .. } =>
				return Err(RefreshError::Rejected { status: response.status, code }),
			ResponseOutcome::Status { status, .. } =>
				return Err(RefreshError::Rejected { status, code: None }),
		};

		if data.is_null() {
			return Err(RefreshError::MissingToken);
		}

		let payload = envelope::decode_payload::<RefreshPayload>(data)
			.map_err(|e| RefreshError::Decode { message: e.to_string() })?;
		let access =
			payload.token.and_then(TokenSecret::non_empty).ok_or(RefreshError::MissingToken)?;
		let refresh = payload.refresh_token.and_then(TokenSecret::non_empty);

		Ok(RefreshedToken { access, refresh })
	}
}
#[cfg(feature = "reqwest")]
impl Client<ReqwestTransport> {
	/// Creates a client over a fresh reqwest transport.
	pub fn new(
		config: ClientConfig,
		store: Arc<dyn CredentialStore>,
		navigator: Arc<dyn Navigator>,
	) -> Result<Self, ConfigError> {
		let transport = ReqwestTransport::build(config.timeout())?;

		Self::with_transport(config, Arc::new(transport), store, navigator)
	}
}
impl<T> Clone for Client<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: Arc::clone(&self.transport),
			store: Arc::clone(&self.store),
			navigator: Arc::clone(&self.navigator),
			config: Arc::clone(&self.config),
			in_flight: Arc::clone(&self.in_flight),
			coordinator: Arc::clone(&self.coordinator),
		}
	}
}
impl<T> Debug for Client<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Client")
			.field("base_url", &self.config.base_url.as_str())
			.field("in_flight", &self.in_flight.len())
			.field("refreshing", &self.coordinator.is_refreshing())
			.finish()
	}
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
	refresh_token: &'a str,
}

#[derive(Deserialize)]
struct RefreshPayload {
	#[serde(default, alias = "access_token")]
	token: Option<String>,
	#[serde(default)]
	refresh_token: Option<String>,
}

struct RefreshedToken {
	access: TokenSecret,
	refresh: Option<TokenSecret>,
}
