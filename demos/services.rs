//! Drives the `default`/`admin` client pair against an in-process service that rotates tokens.
//!
//! 1. Load a [`ServicesConfig`] from JSON.
//! 2. Implement [`HttpTransport`] so no network is needed; the fake service rejects stale tokens
//!    with code `-101` and issues a new one from `/refresh_token`.
//! 3. Fire several requests at once and watch a single refresh unblock all of them.
//! 4. Revoke the refresh token and observe the navigator being sent to the login route.

// std
use std::{
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};
// crates.io
use color_eyre::Result;
use parking_lot::Mutex;
use serde_json::{Value, json};
// self
use retoken::{
	client::{ServiceName, Services},
	config::ServicesConfig,
	error::{Error, TransportError},
	http::{HttpTransport, TransportFuture, TransportRequest, TransportResponse},
	navigate::FnNavigator,
	store::{CredentialStore, MemoryStore},
};

const CONFIG: &str = r#"{
	"default": { "base_url": "https://api.example.com" },
	"admin": { "base_url": "https://api.example.com/admin", "auth_scheme": "Bearer" }
}"#;

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let service = Arc::new(FakeService::default());
	let store = Arc::new(MemoryStore::with_entries([("token", "t-0"), ("refresh_token", "r-0")]));
	let navigator = FnNavigator(|route: &str| println!("Navigator asked to open {route}."));
	let config = ServicesConfig::from_json_str(CONFIG)?;
	let services = Services::with_transport(
		config.default,
		config.admin,
		Arc::clone(&service),
		store.clone(),
		Arc::new(navigator),
	)?;
	let client = services.client(ServiceName::Default);

	service.rotate();

	let first_page = json!({ "page": 1 });
	let (orders, cart, profile) = tokio::join!(
		client.get::<Value, _>("/orders", &first_page),
		client.get::<Value, _>("/cart", &()),
		client.get::<Value, _>("/profile", &()),
	);

	println!("Orders: {}.", orders?);
	println!("Cart: {}.", cart?);
	println!("Profile: {}.", profile?);
	println!(
		"Refresh calls: {}; queued behind the leader: {}.",
		service.refreshes.load(Ordering::SeqCst),
		client.refresh_metrics().waiters()
	);

	let admin = services.client(ServiceName::Admin);
	let users: Value = admin.get("/users", &()).await?;

	println!("Admin users: {users}.");

	service.revoke_refresh();
	service.rotate();

	match client.get::<Value, _>("/orders", &()).await {
		Ok(value) => println!("Unexpected success: {value}."),
		Err(e @ Error::Refresh(_)) => println!("Session ended: {e}."),
		Err(e) => return Err(e.into()),
	}

	println!("Stored access token after failure: {:?}.", store.get("token")?);

	Ok(())
}

/// Service that accepts exactly one access token at a time.
#[derive(Default)]
struct FakeService {
	generation: AtomicUsize,
	refreshes: AtomicUsize,
	revoked: Mutex<bool>,
}
impl FakeService {
	fn current(&self) -> String {
		format!("t-{}", self.generation.load(Ordering::SeqCst))
	}

	/// Invalidates the current access token without telling the client.
	fn rotate(&self) {
		self.generation.fetch_add(1, Ordering::SeqCst);
	}

	fn revoke_refresh(&self) {
		*self.revoked.lock() = true;
	}

	fn respond(&self, request: &TransportRequest) -> TransportResponse {
		let presented =
			request.header("Authorization").map(|value| value.trim_start_matches("Bearer "));

		if request.url.path() == "/refresh_token" {
			self.refreshes.fetch_add(1, Ordering::SeqCst);

			if *self.revoked.lock() {
				return envelope(json!({ "code": -1, "msg": "refresh token revoked" }));
			}

			return envelope(json!({ "code": 0, "data": { "token": self.current() } }));
		}
		if presented != Some(self.current().as_str()) {
			return envelope(json!({ "code": -101, "msg": "token expired" }));
		}

		envelope(json!({ "code": 0, "data": { "path": request.url.path() } }))
	}
}
impl HttpTransport for FakeService {
	fn send(&self, request: TransportRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			tokio::time::sleep(Duration::from_millis(20)).await;

			Ok::<_, TransportError>(self.respond(&request))
		})
	}
}

fn envelope(body: Value) -> TransportResponse {
	TransportResponse { status: 200, body: body.to_string().into_bytes() }
}
