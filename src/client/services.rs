// self
#[cfg(feature = "reqwest")] use crate::{config::ServicesConfig, http::ReqwestTransport};
use crate::{
	_prelude::*,
	client::Client,
	config::ClientConfig,
	error::ConfigError,
	http::HttpTransport,
	navigate::Navigator,
	store::CredentialStore,
};

/// Selects one of the clients held by [`Services`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceName {
	/// Regular application endpoints.
	Default,
	/// Administrative endpoints.
	Admin,
}
impl ServiceName {
	/// Returns the configuration key for this service.
	pub const fn as_str(self) -> &'static str {
		match self {
			ServiceName::Default => "default",
			ServiceName::Admin => "admin",
		}
	}
}
impl Display for ServiceName {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for ServiceName {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"default" => Ok(Self::Default),
			"admin" => Ok(Self::Admin),
			other => Err(ConfigError::UnknownService { name: other.into() }),
		}
	}
}

/// The two clients an application talks to.
///
/// Each client owns its registry and refresh coordinator; both read and write the same credential
/// store and report to the same navigator.
pub struct Services<T>
where
	T: ?Sized + HttpTransport,
{
	default: Client<T>,
	admin: Client<T>,
}
impl<T> Services<T>
where
	T: ?Sized + HttpTransport,
{
	/// Builds both clients over the same transport, store, and navigator.
	pub fn with_transport(
		default: ClientConfig,
		admin: ClientConfig,
		transport: Arc<T>,
		store: Arc<dyn CredentialStore>,
		navigator: Arc<dyn Navigator>,
	) -> Result<Self, ConfigError> {
		Ok(Self {
			default: Client::with_transport(
				default,
				Arc::clone(&transport),
				Arc::clone(&store),
				Arc::clone(&navigator),
			)?,
			admin: Client::with_transport(admin, transport, store, navigator)?,
		})
	}

	/// Client selected by `name`.
	pub fn client(&self, name: ServiceName) -> &Client<T> {
		match name {
			ServiceName::Default => &self.default,
			ServiceName::Admin => &self.admin,
		}
	}

	/// Client for regular application endpoints.
	pub fn default_client(&self) -> &Client<T> {
		&self.default
	}

	/// Client for administrative endpoints.
	pub fn admin(&self) -> &Client<T> {
		&self.admin
	}
}
#[cfg(feature = "reqwest")]
impl Services<ReqwestTransport> {
	/// Builds both clients from `config`, each over its own reqwest transport.
	pub fn from_config(
		config: ServicesConfig,
		store: Arc<dyn CredentialStore>,
		navigator: Arc<dyn Navigator>,
	) -> Result<Self, ConfigError> {
		Ok(Self {
			default: Client::new(config.default, Arc::clone(&store), Arc::clone(&navigator))?,
			admin: Client::new(config.admin, store, navigator)?,
		})
	}
}
impl<T> Clone for Services<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self { default: self.default.clone(), admin: self.admin.clone() }
	}
}
impl<T> Debug for Services<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Services").field("default", &self.default).field("admin", &self.admin).finish()
	}
}
